//! Config Validation Tests
//!
//! Typo detection and range validation for the station config, exercised
//! independently from the rest of the pipeline.

use fieldlink::config::validation::{
    known_config_keys, suggest_correction, validate_physical_ranges, validate_unknown_keys,
};
use fieldlink::config::{ConfigError, StationConfig, StorageBackend};
use fieldlink::commands::CommandFraming;

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_threshold_warns_with_suggestion() {
    let toml_str = r#"
[thresholds]
temperature_max = 32.0
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert!(warnings[0].field.contains("temperature_max"));
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("thresholds.temperature_max_c"),
        "Should suggest the correct spelling"
    );
}

#[test]
fn typo_in_report_section_warns() {
    let toml_str = r#"
[report]
refrence_node = "Node2"
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].suggestion.as_deref(), Some("report.reference_node"));
}

#[test]
fn valid_config_produces_zero_warnings() {
    let toml_str = r#"
nodes = ["Node1", "Node2", "Node3", "Node4"]

[link]
port = "/dev/ttyUSB0"
auto_detect = false
baud_rate = 115200

[thresholds]
temperature_max_c = 28.5
humidity_min_pct = 35.0
humidity_max_pct = 75.0

[window]
size = 120

[report]
every_readings = 10
reference_node = "Node2"
output_dir = "out/reports"
render_json = false

[storage]
backend = "sled"
path = "data/readings.db"

[commands]
framing = "json"

[diagnostics]
anomaly_log = "logs/anomalies.log"
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");

    let config = StationConfig::from_toml_str(toml_str).unwrap();
    assert_eq!(config.nodes.len(), 4);
    assert_eq!(config.link.port.as_deref(), Some("/dev/ttyUSB0"));
    assert!(!config.link.auto_detect);
    assert_eq!(config.link.baud_rate, 115_200);
    assert_eq!(config.thresholds.temperature_max_c, 28.5);
    assert_eq!(config.window.size, 120);
    assert_eq!(config.report.every_readings, 10);
    assert_eq!(config.storage.backend, StorageBackend::Sled);
    assert_eq!(config.commands.framing, CommandFraming::Json);
}

#[test]
fn wildly_wrong_key_has_no_suggestion() {
    let warnings = validate_unknown_keys("completely_unrelated_setting = 1\n");
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].suggestion.is_none());
}

#[test]
fn suggestion_picks_closest_key() {
    let known = known_config_keys();
    assert_eq!(
        suggest_correction("window.sise", &known).as_deref(),
        Some("window.size")
    );
}

// ============================================================================
// Range Validation
// ============================================================================

#[test]
fn default_config_is_valid() {
    let config = StationConfig::default();
    let (errors, warnings) = validate_physical_ranges(&config);
    assert!(errors.is_empty());
    assert!(warnings.is_empty());
    assert!(config.validate().is_ok());
}

#[test]
fn zero_window_and_cadence_rejected() {
    let err = StationConfig::from_toml_str(
        r#"
[window]
size = 0

[report]
every_readings = 0
"#,
    )
    .unwrap_err();

    match err {
        ConfigError::Validation(errors) => {
            assert!(errors.iter().any(|e| e.contains("window.size")));
            assert!(errors.iter().any(|e| e.contains("report.every_readings")));
        }
        other => panic!("expected validation error, got {other}"),
    }
}

#[test]
fn humidity_out_of_percent_range_only_warns() {
    let mut config = StationConfig::default();
    config.thresholds.humidity_max_pct = 120.0;

    let (errors, warnings) = validate_physical_ranges(&config);
    assert!(errors.is_empty());
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].field, "thresholds.humidity_max_pct");
}

#[test]
fn config_round_trips_through_toml() {
    let mut config = StationConfig::default();
    config.link.port = Some("COM3".to_string());
    config.report.reference_node = "Node3".to_string();

    let rendered = config.to_toml().unwrap();
    assert!(validate_unknown_keys(&rendered).is_empty());

    let parsed = StationConfig::from_toml_str(&rendered).unwrap();
    assert_eq!(parsed.link.port.as_deref(), Some("COM3"));
    assert_eq!(parsed.report.reference_node, "Node3");
}

#[test]
fn load_from_missing_file_is_io_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    let err = StationConfig::load_from_file(&temp_dir.path().join("missing.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(..)));
}
