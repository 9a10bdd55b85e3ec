//! Monitor Configuration - every sensor constant and filter parameter as a TOML value
//!
//! Each struct implements `Default` with the documented constants from
//! [`super::defaults`], so a missing config file behaves exactly like the
//! stock device setup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;
use crate::types::SensorScale;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "BREATH_MONITOR_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "monitor_config.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a monitoring deployment.
///
/// Load with `MonitorConfig::load()` which searches:
/// 1. `$BREATH_MONITOR_CONFIG`
/// 2. `./monitor_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Input line shape and sensor sensitivities
    #[serde(default)]
    pub sensor: SensorConfig,

    /// Orientation and smoothing filter parameters
    #[serde(default)]
    pub filter: FilterConfig,

    /// Live display window
    #[serde(default)]
    pub window: WindowConfig,

    /// Peak detection and continuous rate estimation
    #[serde(default)]
    pub rate: RateConfig,

    /// Tick loop, time base, log output and input acquisition
    #[serde(default)]
    pub session: SessionConfig,

    /// Display API server
    #[serde(default)]
    pub server: ServerConfig,
}

impl MonitorConfig {
    /// Load configuration using the standard search order:
    /// 1. `$BREATH_MONITOR_CONFIG` environment variable
    /// 2. `./monitor_config.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded monitor config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        // 2. Check ./monitor_config.toml
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded monitor config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        // 3. Defaults
        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    ///
    /// Unknown keys and suspicious values are logged as warnings; they never fail.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(PathBuf::from("<inline>"), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the effective configuration as pretty TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate every value, collecting all errors rather than stopping at the first.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (mut errors, range_warnings) = super::validation::validate_physical_ranges(self);
        for w in &range_warnings {
            warn!("{}", w);
        }

        Self::check_fraction(self.filter.ema_alpha, "filter.ema_alpha", &mut errors);
        Self::check_fraction(
            self.filter.complementary_alpha,
            "filter.complementary_alpha",
            &mut errors,
        );

        if !(self.window.clip_min < self.window.clip_max) {
            errors.push(format!(
                "window.clip_min ({}) must be less than window.clip_max ({})",
                self.window.clip_min, self.window.clip_max
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_fraction(value: f64, name: &str, errors: &mut Vec<String>) {
        if !value.is_finite() || value <= 0.0 || value > 1.0 {
            errors.push(format!("{name} = {value} must be in (0, 1]"));
        }
    }

    /// Sensitivity constants for raw -> SI conversion.
    pub fn sensor_scale(&self) -> SensorScale {
        SensorScale {
            accel_lsb_per_g: self.sensor.accel_lsb_per_g,
            gyro_lsb_per_dps: self.sensor.gyro_lsb_per_dps,
            standard_gravity: self.sensor.standard_gravity,
        }
    }

    /// Capability flags selecting the pipeline variant.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            has_gyro: self.sensor.input_format.has_gyro(),
            cancel_gravity: self.sensor.gravity_cancellation(),
        }
    }

    pub fn clip_range(&self) -> ClipRange {
        ClipRange {
            min: self.window.clip_min,
            max: self.window.clip_max,
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Shared enums / derived views
// ============================================================================

/// Shape of the JSON line produced by the sensor decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputFormat {
    /// `{"timestamp", "sensor3": {"accel": {x,y,z}, "gyro": {x,y,z}}}`
    #[default]
    Imu,
    /// `{"timestamp", "sensor3": {x,y,z}}`, accelerometer only
    LegacyAccel,
}

impl InputFormat {
    pub const fn has_gyro(self) -> bool {
        matches!(self, InputFormat::Imu)
    }
}

impl std::str::FromStr for InputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "imu" => Ok(InputFormat::Imu),
            "legacy" | "legacy_accel" => Ok(InputFormat::LegacyAccel),
            other => Err(format!("unknown input format '{other}' (expected imu or legacy_accel)")),
        }
    }
}

/// Where elapsed time comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBase {
    /// Device timestamps relative to the first decoded sample
    #[default]
    SampleTimestamp,
    /// Host monotonic clock relative to session start
    WallClock,
}

/// Pipeline variant flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub has_gyro: bool,
    pub cancel_gravity: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            has_gyro: true,
            cancel_gravity: true,
        }
    }
}

/// Display clamp range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipRange {
    pub min: f64,
    pub max: f64,
}

impl Default for ClipRange {
    fn default() -> Self {
        Self {
            min: defaults::CLIP_MIN,
            max: defaults::CLIP_MAX,
        }
    }
}

// ============================================================================
// Sensor
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Line shape emitted by the decoder
    #[serde(default)]
    pub input_format: InputFormat,

    /// Accelerometer sensitivity (LSB/g)
    #[serde(default = "default_accel_lsb_per_g")]
    pub accel_lsb_per_g: f64,

    /// Gyroscope sensitivity (LSB per °/s)
    #[serde(default = "default_gyro_lsb_per_dps")]
    pub gyro_lsb_per_dps: f64,

    /// Standard gravity (m/s²)
    #[serde(default = "default_standard_gravity")]
    pub standard_gravity: f64,

    /// Subtract the orientation-implied gravity vector before projection.
    /// Unset follows the input format: on with a gyro, off without.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_gravity: Option<bool>,
}

impl SensorConfig {
    /// Effective gravity cancellation flag.
    pub fn gravity_cancellation(&self) -> bool {
        self.cancel_gravity.unwrap_or_else(|| self.input_format.has_gyro())
    }
}

fn default_accel_lsb_per_g() -> f64 { defaults::ACCEL_LSB_PER_G }
fn default_gyro_lsb_per_dps() -> f64 { defaults::GYRO_LSB_PER_DPS }
fn default_standard_gravity() -> f64 { defaults::STANDARD_GRAVITY }

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            input_format: InputFormat::default(),
            accel_lsb_per_g: default_accel_lsb_per_g(),
            gyro_lsb_per_dps: default_gyro_lsb_per_dps(),
            standard_gravity: default_standard_gravity(),
            cancel_gravity: None,
        }
    }
}

// ============================================================================
// Filters
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// EMA smoothing factor
    #[serde(default = "default_ema_alpha")]
    pub ema_alpha: f64,

    /// Complementary filter gyro weight
    #[serde(default = "default_complementary_alpha")]
    pub complementary_alpha: f64,

    /// Fixed integration step of the orientation filter (seconds)
    #[serde(default = "default_nominal_dt")]
    pub nominal_dt_s: f64,
}

fn default_ema_alpha() -> f64 { defaults::EMA_ALPHA }
fn default_complementary_alpha() -> f64 { defaults::COMPLEMENTARY_ALPHA }
fn default_nominal_dt() -> f64 { defaults::NOMINAL_DT_S }

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            ema_alpha: default_ema_alpha(),
            complementary_alpha: default_complementary_alpha(),
            nominal_dt_s: default_nominal_dt(),
        }
    }
}

// ============================================================================
// Window
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Maximum span of the live window (seconds)
    #[serde(default = "default_max_window")]
    pub max_window_s: f64,

    /// Warm-up period excluded from display (seconds)
    #[serde(default = "default_ignore_initial")]
    pub ignore_initial_s: f64,

    /// Display clamp lower bound
    #[serde(default = "default_clip_min")]
    pub clip_min: f64,

    /// Display clamp upper bound
    #[serde(default = "default_clip_max")]
    pub clip_max: f64,
}

fn default_max_window() -> f64 { defaults::MAX_WINDOW_S }
fn default_ignore_initial() -> f64 { defaults::IGNORE_INITIAL_S }
fn default_clip_min() -> f64 { defaults::CLIP_MIN }
fn default_clip_max() -> f64 { defaults::CLIP_MAX }

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            max_window_s: default_max_window(),
            ignore_initial_s: default_ignore_initial(),
            clip_min: default_clip_min(),
            clip_max: default_clip_max(),
        }
    }
}

// ============================================================================
// Rate
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateConfig {
    /// Minimum spacing between accepted peaks (samples)
    #[serde(default = "default_min_distance")]
    pub min_distance_samples: usize,

    /// Minimum peak prominence
    #[serde(default = "default_min_prominence")]
    pub min_prominence: f64,

    /// Trailing span of the live window used for the continuous estimate (seconds)
    #[serde(default = "default_live_window")]
    pub live_window_s: f64,

    /// Interval between continuous estimates (seconds)
    #[serde(default = "default_recompute_interval")]
    pub recompute_interval_s: f64,
}

fn default_min_distance() -> usize { defaults::MIN_PEAK_DISTANCE_SAMPLES }
fn default_min_prominence() -> f64 { defaults::MIN_PEAK_PROMINENCE }
fn default_live_window() -> f64 { defaults::LIVE_RATE_WINDOW_S }
fn default_recompute_interval() -> f64 { defaults::RATE_RECOMPUTE_INTERVAL_S }

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            min_distance_samples: default_min_distance(),
            min_prominence: default_min_prominence(),
            live_window_s: default_live_window(),
            recompute_interval_s: default_recompute_interval(),
        }
    }
}

// ============================================================================
// Session
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Processing loop tick period (ms)
    #[serde(default = "default_tick_period")]
    pub tick_period_ms: u64,

    /// Maximum input lines consumed per tick
    #[serde(default = "default_max_lines_per_tick")]
    pub max_lines_per_tick: usize,

    /// Reader -> tick loop channel capacity
    #[serde(default = "default_line_channel_capacity")]
    pub line_channel_capacity: usize,

    /// Elapsed-time source
    #[serde(default)]
    pub time_base: TimeBase,

    /// Directory receiving the session log
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Log file name prefix
    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,

    /// Input acquisition attempts at startup
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,

    /// Initial delay between acquisition attempts (ms, doubles each attempt)
    #[serde(default = "default_connect_retry_delay")]
    pub connect_retry_delay_ms: u64,
}

fn default_tick_period() -> u64 { defaults::TICK_PERIOD_MS }
fn default_max_lines_per_tick() -> usize { defaults::MAX_LINES_PER_TICK }
fn default_line_channel_capacity() -> usize { defaults::LINE_CHANNEL_CAPACITY }
fn default_log_dir() -> PathBuf { PathBuf::from(".") }
fn default_log_prefix() -> String { defaults::LOG_PREFIX.to_string() }
fn default_connect_attempts() -> u32 { defaults::CONNECT_ATTEMPTS }
fn default_connect_retry_delay() -> u64 { defaults::CONNECT_RETRY_DELAY_MS }

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: default_tick_period(),
            max_lines_per_tick: default_max_lines_per_tick(),
            line_channel_capacity: default_line_channel_capacity(),
            time_base: TimeBase::default(),
            log_dir: default_log_dir(),
            log_prefix: default_log_prefix(),
            connect_attempts: default_connect_attempts(),
            connect_retry_delay_ms: default_connect_retry_delay(),
        }
    }
}

// ============================================================================
// Server
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Serve the display API
    #[serde(default)]
    pub enabled: bool,

    /// Bind address
    #[serde(default = "default_server_addr")]
    pub addr: String,
}

fn default_server_addr() -> String { defaults::SERVER_ADDR.to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: default_server_addr(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_constants() {
        let c = MonitorConfig::default();
        assert_eq!(c.sensor.accel_lsb_per_g, 16384.0);
        assert_eq!(c.sensor.gyro_lsb_per_dps, 131.0);
        assert_eq!(c.sensor.standard_gravity, 9.80665);
        assert_eq!(c.filter.ema_alpha, 0.1);
        assert_eq!(c.filter.complementary_alpha, 0.98);
        assert_eq!(c.filter.nominal_dt_s, 0.05);
        assert_eq!(c.session.tick_period_ms, 50);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_yields_defaults() {
        let c = MonitorConfig::from_toml_str("").unwrap();
        assert_eq!(c.sensor.input_format, InputFormat::Imu);
        assert_eq!(c.window.ignore_initial_s, 5.0);
        assert_eq!(c.rate.min_distance_samples, 20);
    }

    #[test]
    fn test_legacy_format_disables_gyro() {
        let c = MonitorConfig::from_toml_str(
            r#"
[sensor]
input_format = "legacy_accel"
cancel_gravity = false
"#,
        )
        .unwrap();
        let caps = c.capabilities();
        assert!(!caps.has_gyro);
        assert!(!caps.cancel_gravity);
    }

    #[test]
    fn test_legacy_format_alone_turns_cancellation_off() {
        let c = MonitorConfig::from_toml_str("[sensor]\ninput_format = \"legacy_accel\"\n").unwrap();
        assert_eq!(c.sensor.cancel_gravity, None);
        let caps = c.capabilities();
        assert!(!caps.has_gyro);
        assert!(!caps.cancel_gravity);

        let imu = MonitorConfig::from_toml_str("[sensor]\ninput_format = \"imu\"\n").unwrap();
        assert!(imu.capabilities().cancel_gravity);
    }

    #[test]
    fn test_explicit_cancellation_overrides_format() {
        let c = MonitorConfig::from_toml_str(
            "[sensor]\ninput_format = \"legacy_accel\"\ncancel_gravity = true\n",
        )
        .unwrap();
        assert!(c.capabilities().cancel_gravity);

        let off = MonitorConfig::from_toml_str("[sensor]\ncancel_gravity = false\n").unwrap();
        assert!(off.capabilities().has_gyro);
        assert!(!off.capabilities().cancel_gravity);
    }

    #[test]
    fn test_format_override_after_load_follows_format() {
        // What `--format legacy_accel` does on top of a default config
        let mut c = MonitorConfig::default();
        c.sensor.input_format = InputFormat::LegacyAccel;
        assert!(!c.capabilities().cancel_gravity);
        let back = MonitorConfig::from_toml_str(&c.to_toml().unwrap()).unwrap();
        assert!(!back.capabilities().cancel_gravity);
    }

    #[test]
    fn test_alpha_out_of_range_rejected() {
        let mut c = MonitorConfig::default();
        c.filter.ema_alpha = 0.0;
        c.filter.complementary_alpha = 1.5;
        match c.validate() {
            Err(ConfigError::Validation(errors)) => {
                assert!(errors.iter().any(|e| e.contains("filter.ema_alpha")));
                assert!(errors.iter().any(|e| e.contains("filter.complementary_alpha")));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_inverted_clip_range_rejected() {
        let mut c = MonitorConfig::default();
        c.window.clip_min = 3.0;
        c.window.clip_max = -3.0;
        assert!(matches!(c.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_to_toml_round_trip() {
        let mut c = MonitorConfig::default();
        c.rate.min_prominence = 0.08;
        c.session.time_base = TimeBase::WallClock;
        let text = c.to_toml().unwrap();
        let back = MonitorConfig::from_toml_str(&text).unwrap();
        assert_eq!(back.rate.min_prominence, 0.08);
        assert_eq!(back.session.time_base, TimeBase::WallClock);
    }

    #[test]
    fn test_input_format_from_str() {
        assert_eq!("IMU".parse::<InputFormat>(), Ok(InputFormat::Imu));
        assert_eq!("legacy".parse::<InputFormat>(), Ok(InputFormat::LegacyAccel));
        assert!("csv".parse::<InputFormat>().is_err());
    }
}
