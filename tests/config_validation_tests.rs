//! Config Validation Tests
//!
//! Typo detection and range validation for `monitor_config.toml`,
//! exercised independently from the rest of the pipeline.

use breath_monitor::config::validation::{
    known_config_keys, suggest_correction, validate_physical_ranges, validate_unknown_keys,
};
use breath_monitor::config::{ConfigError, InputFormat, MonitorConfig, TimeBase};

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_filter_key_warns_with_suggestion() {
    let toml_str = r#"
[filter]
complementary_alhpa = 0.97
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert!(warnings[0].field.contains("complementary_alhpa"));
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("filter.complementary_alpha"),
        "Should suggest the correct spelling"
    );
}

#[test]
fn misspelled_section_is_reported() {
    let toml_str = r#"
[sensr]
input_format = "imu"
"#;
    let warnings = validate_unknown_keys(toml_str);
    let fields: Vec<&str> = warnings.iter().map(|w| w.field.as_str()).collect();
    assert!(fields.contains(&"sensr"));
    assert!(fields.contains(&"sensr.input_format"));
    let section = warnings.iter().find(|w| w.field == "sensr").unwrap();
    assert_eq!(section.suggestion.as_deref(), Some("sensor"));
}

#[test]
fn unrelated_key_has_no_suggestion() {
    let warnings = validate_unknown_keys("[session]\nwell_name = \"F-9A\"\n");
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].suggestion.is_none());
}

#[test]
fn valid_full_config_has_no_unknown_keys() {
    let toml_str = MonitorConfig::default().to_toml().unwrap();
    assert!(validate_unknown_keys(&toml_str).is_empty());
}

#[test]
fn every_serialized_key_is_known() {
    let toml_str = MonitorConfig::default().to_toml().unwrap();
    let value: toml::Value = toml_str.parse().unwrap();
    let known = known_config_keys();
    for key in breath_monitor::config::validation::walk_toml_keys(&value, "") {
        assert!(known.contains(key.as_str()), "{key} missing from known_config_keys()");
    }
}

#[test]
fn suggestion_respects_distance_limit() {
    let known = known_config_keys();
    assert_eq!(suggest_correction("window.clip_mn", &known).as_deref(), Some("window.clip_min"));
    assert!(suggest_correction("window.totally_different", &known).is_none());
}

#[test]
fn unknown_keys_do_not_fail_loading() {
    let config = MonitorConfig::from_toml_str("[window]\nignore_intial_s = 3.0\n").unwrap();
    // The misspelled key is ignored, the default stands
    assert_eq!(config.window.ignore_initial_s, MonitorConfig::default().window.ignore_initial_s);
}

// ============================================================================
// Range Validation
// ============================================================================

#[test]
fn defaults_are_valid_and_quiet() {
    let config = MonitorConfig::default();
    let (errors, warnings) = validate_physical_ranges(&config);
    assert!(errors.is_empty(), "{errors:?}");
    assert!(warnings.is_empty(), "{warnings:?}");
    assert!(config.validate().is_ok());
}

#[test]
fn partial_file_keeps_documented_defaults() {
    let config = MonitorConfig::from_toml_str(
        r#"
[sensor]
input_format = "legacy_accel"
cancel_gravity = false

[session]
time_base = "wall_clock"
"#,
    )
    .unwrap();
    assert_eq!(config.sensor.input_format, InputFormat::LegacyAccel);
    assert_eq!(config.session.time_base, TimeBase::WallClock);
    assert_eq!(config.sensor.accel_lsb_per_g, 16384.0);
    assert_eq!(config.filter.complementary_alpha, 0.98);
    assert_eq!(config.rate.min_distance_samples, 20);
    assert!(!config.capabilities().has_gyro);
}

#[test]
fn legacy_format_alone_disables_gravity_cancellation() {
    let config = MonitorConfig::from_toml_str("[sensor]\ninput_format = \"legacy_accel\"\n").unwrap();
    let caps = config.capabilities();
    assert!(!caps.has_gyro);
    assert!(!caps.cancel_gravity);
    let (_, warnings) = validate_physical_ranges(&config);
    assert!(warnings.iter().all(|w| w.field != "sensor.cancel_gravity"));
}

#[test]
fn zero_sensitivity_is_an_error() {
    let mut config = MonitorConfig::default();
    config.sensor.accel_lsb_per_g = 0.0;
    let (errors, _) = validate_physical_ranges(&config);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("accel_lsb_per_g"));
}

#[test]
fn non_finite_values_are_errors() {
    let mut config = MonitorConfig::default();
    config.filter.nominal_dt_s = f64::NAN;
    config.window.clip_max = f64::INFINITY;
    config.rate.min_prominence = f64::NAN;
    let (errors, _) = validate_physical_ranges(&config);
    assert!(errors.iter().any(|e| e.contains("nominal_dt_s")));
    assert!(errors.iter().any(|e| e.contains("clip_max")));
    assert!(errors.iter().any(|e| e.contains("min_prominence")));
}

#[test]
fn alpha_out_of_range_fails_validate() {
    let mut config = MonitorConfig::default();
    config.filter.ema_alpha = 0.0;
    config.filter.complementary_alpha = 1.5;
    match config.validate() {
        Err(ConfigError::Validation(errors)) => {
            assert_eq!(errors.len(), 2, "{errors:?}");
            assert!(errors.iter().any(|e| e.contains("ema_alpha")));
            assert!(errors.iter().any(|e| e.contains("complementary_alpha")));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn inverted_clip_range_fails_validate() {
    let mut config = MonitorConfig::default();
    config.window.clip_min = 2.0;
    config.window.clip_max = -2.0;
    assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
}

#[test]
fn zero_session_limits_are_errors() {
    let mut config = MonitorConfig::default();
    config.session.tick_period_ms = 0;
    config.session.connect_attempts = 0;
    config.session.log_prefix = "  ".to_string();
    let (errors, _) = validate_physical_ranges(&config);
    assert_eq!(errors.len(), 3, "{errors:?}");
}

#[test]
fn invalid_file_is_rejected_at_load() {
    let result = MonitorConfig::from_toml_str("[filter]\nema_alpha = -0.5\n");
    assert!(matches!(result, Err(ConfigError::Validation(_))));
}

#[test]
fn wrong_type_is_a_parse_error() {
    let result = MonitorConfig::from_toml_str("[window]\nmax_window_s = \"ten minutes\"\n");
    assert!(matches!(result, Err(ConfigError::Parse(..))));
}

// ============================================================================
// Suspicious Values
// ============================================================================

#[test]
fn gravity_outside_earth_range_warns() {
    let mut config = MonitorConfig::default();
    config.sensor.standard_gravity = 1.0;
    let (errors, warnings) = validate_physical_ranges(&config);
    assert!(errors.is_empty());
    assert!(warnings.iter().any(|w| w.field == "sensor.standard_gravity"));
}

#[test]
fn gravity_cancellation_without_gyro_warns() {
    let mut config = MonitorConfig::default();
    config.sensor.input_format = InputFormat::LegacyAccel;
    config.sensor.cancel_gravity = Some(true);
    let (errors, warnings) = validate_physical_ranges(&config);
    assert!(errors.is_empty());
    assert!(warnings.iter().any(|w| w.field == "sensor.cancel_gravity"));
}

#[test]
fn short_live_window_warns() {
    let mut config = MonitorConfig::default();
    config.rate.live_window_s = 1.0;
    let (errors, warnings) = validate_physical_ranges(&config);
    assert!(errors.is_empty());
    assert!(warnings.iter().any(|w| w.field == "rate.live_window_s"));
}

#[test]
fn explicit_file_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("monitor_config.toml");
    let mut original = MonitorConfig::default();
    original.window.ignore_initial_s = 2.5;
    original.server.enabled = true;
    std::fs::write(&path, original.to_toml().unwrap()).unwrap();

    let loaded = MonitorConfig::load_from_file(&path).unwrap();
    assert_eq!(loaded.window.ignore_initial_s, 2.5);
    assert!(loaded.server.enabled);
}

#[test]
fn missing_explicit_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = MonitorConfig::load_from_file(&dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ConfigError::Io(..))));
}
