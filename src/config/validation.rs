//! Config validation: unknown-key detection with Levenshtein suggestions
//! and physical range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use super::StationConfig;
use std::collections::HashSet;

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
            write!(f, " — did you mean '{s}'?")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for StationConfig.
///
/// Any new field added to StationConfig must be added here too.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        "nodes",
        // [link]
        "link",
        "link.port",
        "link.auto_detect",
        "link.baud_rate",
        "link.poll_timeout_ms",
        "link.write_timeout_ms",
        "link.max_frame_bytes",
        // [thresholds]
        "thresholds",
        "thresholds.temperature_max_c",
        "thresholds.humidity_min_pct",
        "thresholds.humidity_max_pct",
        // [window]
        "window",
        "window.size",
        // [report]
        "report",
        "report.every_readings",
        "report.reference_node",
        "report.output_dir",
        "report.render_json",
        // [storage]
        "storage",
        "storage.backend",
        "storage.path",
        // [commands]
        "commands",
        "commands.framing",
        // [diagnostics]
        "diagnostics",
        "diagnostics.anomaly_log",
    ];
    keys.iter().copied().collect()
}

/// Collect every dotted key path present in a TOML value.
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

// ============================================================================
// Levenshtein Suggestions
// ============================================================================

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

/// Closest known key within edit distance 3, if any.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|k| (*k, levenshtein(unknown, k)))
        .filter(|(_, dist)| *dist <= 3)
        .min_by(|(ka, da), (kb, db)| da.cmp(db).then_with(|| ka.cmp(kb)))
        .map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys — it only warns.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Physical Ranges
// ============================================================================

/// Check thresholds for values that cannot work (errors) or look like a unit
/// mistake (warnings).
pub fn validate_physical_ranges(config: &StationConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let t = &config.thresholds;
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for (name, value) in [
        ("thresholds.temperature_max_c", t.temperature_max_c),
        ("thresholds.humidity_min_pct", t.humidity_min_pct),
        ("thresholds.humidity_max_pct", t.humidity_max_pct),
    ] {
        if !value.is_finite() {
            errors.push(format!("{name} must be a finite number (got {value})"));
        }
    }

    if t.humidity_min_pct >= t.humidity_max_pct {
        errors.push(format!(
            "thresholds.humidity_min_pct ({}) must be below thresholds.humidity_max_pct ({})",
            t.humidity_min_pct, t.humidity_max_pct
        ));
    }

    for (name, value) in [
        ("thresholds.humidity_min_pct", t.humidity_min_pct),
        ("thresholds.humidity_max_pct", t.humidity_max_pct),
    ] {
        if value.is_finite() && !(0.0..=100.0).contains(&value) {
            warnings.push(ValidationWarning {
                field: name.to_string(),
                message: format!("{name} = {value} is outside 0-100 % relative humidity"),
                suggestion: None,
            });
        }
    }

    if t.temperature_max_c.is_finite() && !(-40.0..=125.0).contains(&t.temperature_max_c) {
        warnings.push(ValidationWarning {
            field: "thresholds.temperature_max_c".to_string(),
            message: format!(
                "thresholds.temperature_max_c = {} is outside the sensor range (-40 to 125 °C)",
                t.temperature_max_c
            ),
            suggestion: None,
        });
    }

    (errors, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("window", "window"), 0);
        assert_eq!(levenshtein("windw", "window"), 1);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("umidade", "humidade"), 1);
    }

    #[test]
    fn test_unknown_key_with_suggestion() {
        let warnings = validate_unknown_keys(
            r#"
            [link]
            baudrate = 9600
            "#,
        );
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "link.baudrate");
        assert_eq!(warnings[0].suggestion.as_deref(), Some("link.baud_rate"));
        assert!(warnings[0].to_string().contains("did you mean 'link.baud_rate'"));
    }

    #[test]
    fn test_unknown_key_without_suggestion() {
        let warnings = validate_unknown_keys("[completely_unrelated]\nvalue = 1\n");
        assert!(warnings.iter().all(|w| w.suggestion.is_none()));
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_known_keys_clean() {
        let text = StationConfig::default().to_toml().unwrap();
        assert!(validate_unknown_keys(&text).is_empty());
    }

    #[test]
    fn test_physical_range_defaults_clean() {
        let (errors, warnings) = validate_physical_ranges(&StationConfig::default());
        assert!(errors.is_empty(), "Defaults should produce no errors: {errors:?}");
        assert!(warnings.is_empty(), "Defaults should produce no warnings: {warnings:?}");
    }

    #[test]
    fn test_physical_range_non_finite() {
        let mut config = StationConfig::default();
        config.thresholds.temperature_max_c = f64::NAN;
        let (errors, _) = validate_physical_ranges(&config);
        assert!(errors.iter().any(|e| e.contains("temperature_max_c")));
    }

    #[test]
    fn test_physical_range_suspicious_humidity() {
        let mut config = StationConfig::default();
        config.thresholds.humidity_max_pct = 170.0;
        let (errors, warnings) = validate_physical_ranges(&config);
        assert!(errors.is_empty());
        assert!(warnings.iter().any(|w| w.field == "thresholds.humidity_max_pct"));
    }
}
