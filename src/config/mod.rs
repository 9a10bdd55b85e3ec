//! Monitor Configuration Module
//!
//! Provides session configuration loaded from TOML files, replacing every
//! sensor constant and filter parameter with an operator-tunable value.
//!
//! ## Loading Order
//!
//! 1. `BREATH_MONITOR_CONFIG` environment variable (path to TOML file)
//! 2. `monitor_config.toml` in the current working directory
//! 3. Built-in defaults (the documented sensor and filter constants)
//!
//! Configuration is passed explicitly to the session; there is no global.

mod monitor_config;
pub mod defaults;
pub mod validation;

pub use monitor_config::*;
