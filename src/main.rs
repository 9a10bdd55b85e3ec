//! Breath Monitor - wearable IMU breathing monitor
//!
//! Streams sensor bridge lines through the breathing pipeline, logs the
//! smoothed waveform and reports a live breath rate.
//!
//! # Usage
//!
//! ```bash
//! # Live session from a serial bridge on stdin
//! ./sensor_bridge | ./breath-monitor --stdin
//!
//! # Synthetic input with the display API
//! ./simulation --seconds 120 | ./breath-monitor --stdin --serve
//!
//! # One-shot estimate over a recorded session
//! ./breath-monitor estimate breathing_data_1712345678.csv
//! ```
//!
//! # Environment Variables
//!
//! - `BREATH_MONITOR_CONFIG`: Path to monitor_config.toml
//! - `BREATH_MONITOR_CORS_ORIGINS`: Allowed origins for the display API
//! - `RUST_LOG`: Logging level (default: info)

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use breath_monitor::api::{create_app, DashboardState};
use breath_monitor::config::{InputFormat, MonitorConfig, TimeBase};
use breath_monitor::pipeline::{acquire_source, spawn_reader, InputChannel};
use breath_monitor::types::{LiveSnapshot, RateEstimate};
use breath_monitor::{load_series, BreathRateEstimator, MonitorSession, ProcessingLoop};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "breath-monitor")]
#[command(about = "Wearable IMU breathing monitor")]
#[command(version)]
struct CliArgs {
    /// Path to monitor_config.toml (overrides the normal search; errors are fatal)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Read sensor lines from stdin
    #[arg(long, conflicts_with_all = ["device", "tcp"])]
    stdin: bool,

    /// Read sensor lines from a device or capture file (e.g. /dev/ttyUSB0)
    #[arg(long, value_name = "PATH", conflicts_with = "tcp")]
    device: Option<PathBuf>,

    /// Read sensor lines from a TCP bridge
    #[arg(long, value_name = "HOST:PORT")]
    tcp: Option<String>,

    /// Input line shape: imu or legacy_accel
    #[arg(long)]
    format: Option<InputFormat>,

    /// Directory for the session log
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Seconds of input kept off the display while the projection settles
    #[arg(long, value_name = "SECONDS")]
    ignore_initial: Option<f64>,

    /// Use the host clock instead of device timestamps
    #[arg(long)]
    wall_clock: bool,

    /// Serve the display API
    #[arg(long)]
    serve: bool,

    /// Override the display API address
    #[arg(short, long)]
    addr: Option<String>,

    #[command(subcommand)]
    command: Option<SubCommand>,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Estimate the breath rate of a recorded session log
    Estimate {
        /// Session log (elapsed_time_s,ema_value)
        file: PathBuf,
        /// Minimum spacing between breaths (samples)
        #[arg(long)]
        min_distance: Option<usize>,
        /// Minimum peak prominence
        #[arg(long)]
        min_prominence: Option<f64>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

// ============================================================================
// Configuration
// ============================================================================

fn load_config(args: &CliArgs) -> Result<MonitorConfig> {
    let mut config = match args.config {
        Some(ref path) => MonitorConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => MonitorConfig::load(),
    };

    if let Some(format) = args.format {
        config.sensor.input_format = format;
    }
    if let Some(ref dir) = args.log_dir {
        config.session.log_dir = dir.clone();
    }
    if let Some(ignore) = args.ignore_initial {
        config.window.ignore_initial_s = ignore;
    }
    if args.wall_clock {
        config.session.time_base = TimeBase::WallClock;
    }
    if args.serve {
        config.server.enabled = true;
    }
    if let Some(ref addr) = args.addr {
        config.server.addr = addr.clone();
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Stdin unless a device or TCP bridge is named.
fn input_channel(args: &CliArgs) -> InputChannel {
    if args.stdin {
        InputChannel::Stdin
    } else if let Some(ref path) = args.device {
        InputChannel::Device(path.clone())
    } else if let Some(ref addr) = args.tcp {
        InputChannel::Tcp(addr.clone())
    } else {
        InputChannel::Stdin
    }
}

// ============================================================================
// Offline Estimate
// ============================================================================

#[derive(Serialize)]
struct EstimateReport<'a> {
    file: &'a Path,
    points: usize,
    breaths_per_minute: Option<f64>,
    peak_count: usize,
    peak_times: Vec<f64>,
    duration_s: Option<f64>,
    reason: Option<String>,
}

fn run_estimate(
    config: &MonitorConfig,
    file: &Path,
    min_distance: Option<usize>,
    min_prominence: Option<f64>,
    json: bool,
) -> Result<()> {
    let series = load_series(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let estimator = BreathRateEstimator::new(
        min_distance.unwrap_or(config.rate.min_distance_samples),
        min_prominence.unwrap_or(config.rate.min_prominence),
    );

    let result = estimator.estimate(&series);
    let report = match result {
        Ok(RateEstimate {
            breaths_per_minute,
            ref peaks,
            duration_s,
        }) => EstimateReport {
            file,
            points: series.len(),
            breaths_per_minute: Some(breaths_per_minute),
            peak_count: peaks.len(),
            peak_times: peaks.iter().map(|p| p.time_s).collect(),
            duration_s: Some(duration_s),
            reason: None,
        },
        Err(ref reason) => EstimateReport {
            file,
            points: series.len(),
            breaths_per_minute: None,
            peak_count: 0,
            peak_times: Vec::new(),
            duration_s: None,
            reason: Some(reason.to_string()),
        },
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("File:         {}", file.display());
    println!("Points:       {}", report.points);
    match (report.breaths_per_minute, report.duration_s) {
        (Some(bpm), Some(duration)) => {
            println!("Duration:     {:.1} s", duration);
            println!("Breaths:      {}", report.peak_count);
            println!("Breath rate:  {:.2} bpm", bpm);
            let times: Vec<String> = report.peak_times.iter().map(|t| format!("{t:.2}")).collect();
            println!("Peak times:   {}", times.join(", "));
        }
        _ => {
            println!(
                "Breath rate:  undefined ({})",
                report.reason.as_deref().unwrap_or("degenerate series")
            );
        }
    }
    Ok(())
}

// ============================================================================
// Live Session
// ============================================================================

async fn run_session(config: MonitorConfig, channel: InputChannel, cancel_token: CancellationToken) -> Result<()> {
    info!("📥 Input: {} ({:?} lines)", channel, config.sensor.input_format);

    // Resource acquisition is fatal before the tick loop starts
    let source = acquire_source(
        &channel,
        config.session.connect_attempts,
        Duration::from_millis(config.session.connect_retry_delay_ms),
    )
    .await?;
    let session = MonitorSession::start(&config).context("Failed to create session log")?;

    let (line_tx, line_rx) = mpsc::channel(config.session.line_channel_capacity);
    let reader = spawn_reader(source, line_tx, cancel_token.clone());

    let mut processing = ProcessingLoop::new(
        session,
        line_rx,
        cancel_token.clone(),
        Duration::from_millis(config.session.tick_period_ms),
        config.session.max_lines_per_tick,
    );

    let server = if config.server.enabled {
        let (snap_tx, snap_rx) = watch::channel(LiveSnapshot::default());
        processing = processing.with_publisher(snap_tx);

        let state = DashboardState::new(snap_rx, config.clip_range(), config.rate.live_window_s);
        let listener = tokio::net::TcpListener::bind(&config.server.addr)
            .await
            .with_context(|| format!("Failed to bind to {}", config.server.addr))?;
        info!("🌐 Display API listening on http://{}", config.server.addr);

        let shutdown = cancel_token.clone();
        Some(tokio::spawn(async move {
            let result = axum::serve(listener, create_app(state))
                .with_graceful_shutdown(async move {
                    shutdown.cancelled().await;
                    info!("[HttpServer] Received shutdown signal");
                })
                .await;
            if let Err(e) = result {
                error!("[HttpServer] Server error: {}", e);
            }
        }))
    } else {
        None
    };

    let _stats = processing.run().await;

    // Input ended on its own: stop the reader and the server too
    cancel_token.cancel();
    let _ = reader.await;
    if let Some(server) = server {
        let _ = server.await;
    }
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    let config = load_config(&args)?;

    // Subcommand dispatch
    match args.command {
        Some(SubCommand::Estimate {
            ref file,
            min_distance,
            min_prominence,
            json,
        }) => return run_estimate(&config, file, min_distance, min_prominence, json),
        Some(SubCommand::Config) => {
            print!("{}", config.to_toml()?);
            return Ok(());
        }
        None => {}
    }

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Breath Monitor");
    info!("  Wearable IMU respiration waveform and breath rate");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    let caps = config.capabilities();
    info!(
        "   Gyro: {} | Gravity cancellation: {} | Warm-up: {:.1} s | Window: {:.0} s",
        if caps.has_gyro { "yes" } else { "no" },
        if caps.cancel_gravity { "on" } else { "off" },
        config.window.ignore_initial_s,
        config.window.max_window_s
    );
    info!("");

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    let channel = input_channel(&args);
    run_session(config, channel, cancel_token).await?;

    info!("");
    info!("✓ Breath Monitor shutdown complete");
    Ok(())
}
