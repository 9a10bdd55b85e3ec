//! Config validation: unknown-key detection with Levenshtein suggestions
//! and physical range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

use super::MonitorConfig;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for MonitorConfig.
///
/// Maintained by hand to match the struct hierarchy in monitor_config.rs.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [sensor]
        "sensor",
        "sensor.input_format",
        "sensor.accel_lsb_per_g",
        "sensor.gyro_lsb_per_dps",
        "sensor.standard_gravity",
        "sensor.cancel_gravity",
        // [filter]
        "filter",
        "filter.ema_alpha",
        "filter.complementary_alpha",
        "filter.nominal_dt_s",
        // [window]
        "window",
        "window.max_window_s",
        "window.ignore_initial_s",
        "window.clip_min",
        "window.clip_max",
        // [rate]
        "rate",
        "rate.min_distance_samples",
        "rate.min_prominence",
        "rate.live_window_s",
        "rate.recompute_interval_s",
        // [session]
        "session",
        "session.tick_period_ms",
        "session.max_lines_per_tick",
        "session.line_channel_capacity",
        "session.time_base",
        "session.log_dir",
        "session.log_prefix",
        "session.connect_attempts",
        "session.connect_retry_delay_ms",
        // [server]
        "server",
        "server.enabled",
        "server.addr",
    ];
    keys.iter().copied().collect()
}

/// Recursively collect dotted key paths from a TOML value.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
///
/// Ties go to the lexicographically smallest key so the suggestion is stable.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for &k in known {
        let dist = levenshtein(unknown, k);
        if dist > 3 {
            continue;
        }
        best = match best {
            Some((bk, bd)) if bd < dist || (bd == dist && bk < k) => Some((bk, bd)),
            _ => Some((k, dist)),
        };
    }
    best.map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// Unknown keys never fail; they only warn.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    let mut warnings = Vec::new();

    for key in walk_toml_keys(&value, "") {
        if !known.contains(key.as_str()) {
            let suggestion = suggest_correction(&key, &known);
            let message = format!("Unknown config key '{key}'");
            warnings.push(ValidationWarning {
                field: key,
                message,
                suggestion,
            });
        }
    }

    warnings
}

// ============================================================================
// Physical Range Validation
// ============================================================================

/// Check values against their physically meaningful ranges.
///
/// Returns `(errors, warnings)`; errors make the config unusable, warnings
/// flag legal but suspicious combinations.
pub fn validate_physical_ranges(config: &MonitorConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let positive = [
        ("sensor.accel_lsb_per_g", config.sensor.accel_lsb_per_g),
        ("sensor.gyro_lsb_per_dps", config.sensor.gyro_lsb_per_dps),
        ("sensor.standard_gravity", config.sensor.standard_gravity),
        ("filter.nominal_dt_s", config.filter.nominal_dt_s),
        ("window.max_window_s", config.window.max_window_s),
        ("rate.live_window_s", config.rate.live_window_s),
    ];
    for (name, value) in positive {
        if !value.is_finite() || value <= 0.0 {
            errors.push(format!("{name} = {value} must be a finite number > 0"));
        }
    }

    let non_negative = [
        ("window.ignore_initial_s", config.window.ignore_initial_s),
        ("rate.min_prominence", config.rate.min_prominence),
        ("rate.recompute_interval_s", config.rate.recompute_interval_s),
    ];
    for (name, value) in non_negative {
        if !value.is_finite() || value < 0.0 {
            errors.push(format!("{name} = {value} must be a finite number >= 0"));
        }
    }

    for (name, value) in [
        ("window.clip_min", config.window.clip_min),
        ("window.clip_max", config.window.clip_max),
    ] {
        if !value.is_finite() {
            errors.push(format!("{name} = {value} must be finite"));
        }
    }

    if config.session.tick_period_ms == 0 {
        errors.push("session.tick_period_ms must be > 0".to_string());
    }
    if config.session.max_lines_per_tick == 0 {
        errors.push("session.max_lines_per_tick must be > 0".to_string());
    }
    if config.session.line_channel_capacity == 0 {
        errors.push("session.line_channel_capacity must be > 0".to_string());
    }
    if config.session.connect_attempts == 0 {
        errors.push("session.connect_attempts must be >= 1".to_string());
    }
    if config.session.log_prefix.trim().is_empty() {
        errors.push("session.log_prefix must not be empty".to_string());
    }

    // Gravity: anything outside 9.7-9.9 m/s² is almost certainly a unit mistake
    let g = config.sensor.standard_gravity;
    if g.is_finite() && !(9.7..=9.9).contains(&g) {
        warnings.push(ValidationWarning {
            field: "sensor.standard_gravity".to_string(),
            message: format!("standard_gravity = {g} is outside the expected range (9.7-9.9 m/s²)"),
            suggestion: None,
        });
    }

    if config.sensor.cancel_gravity == Some(true) && !config.sensor.input_format.has_gyro() {
        warnings.push(ValidationWarning {
            field: "sensor.cancel_gravity".to_string(),
            message: "cancel_gravity with a gyro-less input format tracks tilt from the accelerometer only".to_string(),
            suggestion: None,
        });
    }

    // The live estimate needs room for at least two peaks at the minimum spacing
    let dt = config.filter.nominal_dt_s;
    let min_span = 2.0 * config.rate.min_distance_samples as f64 * dt;
    if dt.is_finite() && config.rate.live_window_s < min_span {
        warnings.push(ValidationWarning {
            field: "rate.live_window_s".to_string(),
            message: format!(
                "live_window_s = {} is shorter than two peak spacings ({:.1} s); live estimates will be coarse",
                config.rate.live_window_s, min_span
            ),
            suggestion: None,
        });
    }

    if config.rate.live_window_s > config.window.max_window_s {
        warnings.push(ValidationWarning {
            field: "rate.live_window_s".to_string(),
            message: format!(
                "live_window_s = {} exceeds window.max_window_s = {}; the estimate uses the whole window",
                config.rate.live_window_s, config.window.max_window_s
            ),
            suggestion: None,
        });
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================
