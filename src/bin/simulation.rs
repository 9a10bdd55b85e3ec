//! Breathing Sensor Simulation
//!
//! Generates sensor bridge lines for a wearer at rest so the monitor can be
//! exercised without hardware. Streams at the sensor rate by default, or
//! faster with `--speed`.
//!
//! # Usage
//! ```bash
//! ./simulation --seconds 120 --breath-bpm 15 | ./breath-monitor --stdin
//! ./simulation --seconds 60 --speed 0 --format legacy_accel > capture.jsonl
//! ```

use clap::Parser;
use std::io::{self, Write};
use std::time::{Duration, Instant};

use breath_monitor::acquisition::encode_line;
use breath_monitor::simulation::{Axis, SyntheticBreather};
use breath_monitor::InputFormat;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "breath-simulation")]
#[command(about = "Synthetic IMU breathing stream for breath-monitor testing")]
#[command(version = "1.0")]
struct Args {
    /// Duration of generated signal in seconds
    #[arg(short = 'S', long, default_value = "120")]
    seconds: f64,

    /// Time compression factor (1 = real-time, 0 = as fast as possible)
    #[arg(short, long, default_value = "1")]
    speed: f64,

    /// Sensor sample rate in Hz
    #[arg(long, default_value = "20")]
    rate_hz: f64,

    /// Breathing rate in breaths per minute
    #[arg(short, long, default_value = "15")]
    breath_bpm: f64,

    /// Chest-motion amplitude (m/s²)
    #[arg(long, default_value = "0.2")]
    amplitude: f64,

    /// Per-axis Gaussian noise (m/s² standard deviation)
    #[arg(long, default_value = "0.02")]
    noise: f64,

    /// Sensor axis carrying the breathing motion: x, y or z
    #[arg(long, default_value = "y")]
    axis: Axis,

    /// Static mounting tilt in degrees (roll)
    #[arg(long, default_value = "0")]
    roll_deg: f64,

    /// Static mounting tilt in degrees (pitch)
    #[arg(long, default_value = "0")]
    pitch_deg: f64,

    /// Output line shape: imu or legacy_accel
    #[arg(short, long, default_value = "imu")]
    format: InputFormat,

    /// Emit a malformed line every N samples (0 disables)
    #[arg(long, default_value = "0")]
    corrupt_every: u64,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Suppress mission log (only output sensor data)
    #[arg(short, long)]
    quiet: bool,
}

// ============================================================================
// Mission Log
// ============================================================================

fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

fn log_mission(time: f64, message: &str, quiet: bool) {
    if !quiet {
        eprintln!("[{}] {}", format_time(time), message);
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if !(args.rate_hz > 0.0 && args.rate_hz.is_finite()) {
        return Err(format!("--rate-hz must be positive, got {}", args.rate_hz).into());
    }
    if !(args.speed >= 0.0 && args.speed.is_finite()) {
        return Err(format!("--speed must be non-negative, got {}", args.speed).into());
    }

    let breather = SyntheticBreather::new(args.rate_hz)
        .breaths_per_minute(args.breath_bpm)
        .amplitude(args.amplitude)
        .noise(args.noise)
        .axis(args.axis)
        .tilt(args.roll_deg.to_radians(), args.pitch_deg.to_radians())
        .start_timestamp_ms(chrono::Utc::now().timestamp_millis())
        .duration(args.seconds);
    let breather = match args.seed {
        Some(seed) => breather.seed(seed),
        None => breather.unseeded(),
    };

    let total_samples = (args.seconds * args.rate_hz).round().max(0.0) as u64;
    let sample_interval_sim = 1.0 / args.rate_hz;
    let sample_interval_real = if args.speed > 0.0 {
        Some(Duration::from_secs_f64(sample_interval_sim / args.speed))
    } else {
        None
    };

    // Mission briefing
    log_mission(0.0, &"=".repeat(70), args.quiet);
    log_mission(0.0, "BREATHING SENSOR SIMULATION v1.0", args.quiet);
    log_mission(0.0, &"=".repeat(70), args.quiet);
    log_mission(0.0, &format!("  Duration: {:.0} s ({} samples at {} Hz)", args.seconds, total_samples, args.rate_hz), args.quiet);
    log_mission(0.0, &format!("  Breathing: {:.1} bpm, {:.2} m/s² on {:?}", args.breath_bpm, args.amplitude, args.axis), args.quiet);
    log_mission(0.0, &format!("  Noise: {:.3} m/s²", args.noise), args.quiet);
    log_mission(0.0, &format!("  Tilt: roll {:.1}°, pitch {:.1}°", args.roll_deg, args.pitch_deg), args.quiet);
    log_mission(0.0, &format!("  Format: {:?}", args.format), args.quiet);
    match sample_interval_real {
        Some(_) => log_mission(0.0, &format!("  Speed: {}x", args.speed), args.quiet),
        None => log_mission(0.0, "  Speed: unthrottled", args.quiet),
    }
    if let Some(seed) = args.seed {
        log_mission(0.0, &format!("  Random seed: {}", seed), args.quiet);
    }
    if args.corrupt_every > 0 {
        log_mission(0.0, &format!("  Corrupt line every {} samples", args.corrupt_every), args.quiet);
    }
    log_mission(0.0, &"=".repeat(70), args.quiet);

    let start_time = Instant::now();
    let mut last_log_percent = 0;
    let mut emitted = 0u64;
    let mut corrupted = 0u64;

    let stdout = io::stdout();
    let mut stdout_lock = stdout.lock();

    for sample in breather {
        let loop_start = Instant::now();
        let sim_time = emitted as f64 * sample_interval_sim;

        // Progress logging (every 10%)
        if total_samples > 0 {
            let current_percent = (emitted * 100 / total_samples) as u32 / 10 * 10;
            if current_percent > last_log_percent {
                log_mission(sim_time, &format!("Progress: {}% | {} samples", current_percent, emitted), args.quiet);
                last_log_percent = current_percent;
            }
        }

        let line = encode_line(&sample, args.format)?;
        if args.corrupt_every > 0 && (emitted + 1) % args.corrupt_every == 0 {
            // Truncated mid-object, as a dropped serial byte would leave it
            writeln!(stdout_lock, "{}", &line[..line.len() / 2])?;
            corrupted += 1;
        } else {
            writeln!(stdout_lock, "{}", line)?;
        }
        stdout_lock.flush()?;
        emitted += 1;

        if let Some(interval) = sample_interval_real {
            let elapsed = loop_start.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
        }
    }

    stdout_lock.flush()?;
    drop(stdout_lock);

    // Mission debrief
    let end_time = emitted as f64 * sample_interval_sim;
    log_mission(end_time, &"=".repeat(70), args.quiet);
    log_mission(end_time, "SIMULATION COMPLETE", args.quiet);
    log_mission(end_time, &format!("Total lines: {}", emitted), args.quiet);
    log_mission(end_time, &format!("Corrupted lines: {}", corrupted), args.quiet);
    log_mission(end_time, &format!("Expected rate: {:.1} bpm", args.breath_bpm), args.quiet);
    log_mission(end_time, &format!("Real time: {:.1}s", start_time.elapsed().as_secs_f64()), args.quiet);
    log_mission(end_time, &"=".repeat(70), args.quiet);

    Ok(())
}
