//! System-wide default constants.
//!
//! Every value here is the default of a `monitor_config.toml` field.
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Sensor
// ============================================================================

/// Accelerometer sensitivity at ±2 g full scale (LSB/g).
pub const ACCEL_LSB_PER_G: f64 = 16_384.0;

/// Gyroscope sensitivity at ±250 °/s full scale (LSB per °/s).
pub const GYRO_LSB_PER_DPS: f64 = 131.0;

/// Standard gravity (m/s²).
pub const STANDARD_GRAVITY: f64 = 9.806_65;

// ============================================================================
// Filters
// ============================================================================

/// EMA smoothing factor applied to the projected signal.
pub const EMA_ALPHA: f64 = 0.1;

/// Complementary filter weight given to the gyro-integrated estimate.
pub const COMPLEMENTARY_ALPHA: f64 = 0.98;

/// Nominal sample period assumed by the orientation filter (seconds).
///
/// The filter integrates with this constant rather than measured
/// inter-sample time. Irregular input timing biases the gravity estimate.
pub const NOMINAL_DT_S: f64 = 0.05;

// ============================================================================
// Windowing
// ============================================================================

/// Live display window span (seconds).
pub const MAX_WINDOW_S: f64 = 600.0;

/// Initial period excluded from display while the projection settles (seconds).
pub const IGNORE_INITIAL_S: f64 = 5.0;

/// Display clip range.
pub const CLIP_MIN: f64 = -2.0;
pub const CLIP_MAX: f64 = 2.0;

// ============================================================================
// Breath-rate estimation
// ============================================================================

/// Minimum spacing between accepted peaks (samples). 20 samples = 1 s at 20 Hz.
pub const MIN_PEAK_DISTANCE_SAMPLES: usize = 20;

/// Minimum topographic prominence of an accepted peak.
pub const MIN_PEAK_PROMINENCE: f64 = 0.05;

/// Trailing span of the live window used for the continuous estimate (seconds).
pub const LIVE_RATE_WINDOW_S: f64 = 60.0;

/// Interval between continuous estimates (seconds of displayed time).
pub const RATE_RECOMPUTE_INTERVAL_S: f64 = 5.0;

// ============================================================================
// Session
// ============================================================================

/// Tick period of the processing loop (milliseconds).
pub const TICK_PERIOD_MS: u64 = 50;

/// Upper bound on input lines consumed per tick.
pub const MAX_LINES_PER_TICK: usize = 64;

/// Capacity of the reader -> tick loop line channel.
pub const LINE_CHANNEL_CAPACITY: usize = 1_024;

/// Input channel acquisition attempts before giving up.
pub const CONNECT_ATTEMPTS: u32 = 3;

/// Initial delay between acquisition attempts (milliseconds, doubles each attempt).
pub const CONNECT_RETRY_DELAY_MS: u64 = 1_000;

/// Log file name prefix (`<prefix>_<unix_secs>.csv`).
pub const LOG_PREFIX: &str = "breathing_data";

/// Processed-sample interval between progress log lines.
pub const PROGRESS_LOG_INTERVAL: u64 = 200;

// ============================================================================
// Server
// ============================================================================

/// Default bind address of the display API.
pub const SERVER_ADDR: &str = "127.0.0.1:8080";
