//! Session Log Storage
//!
//! Flat two-column CSV of every processed sample (`elapsed_time_s,ema_value`),
//! written row by row and flushed after each row so a crash loses at most
//! the sample in flight. The same format feeds the offline estimate.

mod series_log;

pub use series_log::{load_series, parse_series, LogError, SeriesLog, LOG_HEADER};
