//! Text and JSON renderings of a [`Report`]

use super::{NodeStats, Report};
use serde::Serialize;

const UNDEFINED: &str = "undefined";

fn fixed2(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.2}")
    } else {
        UNDEFINED.to_string()
    }
}

/// Plain-text report: one section per node, values to 2 decimal places.
pub fn render_text(report: &Report) -> String {
    let mut lines = vec![
        "SENSOR REPORT".to_string(),
        format!("Generated: {}", report.generated_at.format("%Y-%m-%d %H:%M:%S")),
        format!("Entries: {}", report.total_entries()),
    ];
    if report.skipped_entries > 0 {
        lines.push(format!("Unreadable entries skipped: {}", report.skipped_entries));
    }

    for (node, stats) in &report.nodes {
        lines.push(String::new());
        lines.push(format!("== {node} =="));
        lines.push(format!("Count: {}", stats.count));
        lines.push(format!("Mean temperature: {}", fixed2(stats.mean_temperature)));
        lines.push(format!("Max temperature: {}", fixed2(stats.max_temperature)));
        lines.push(format!("Min temperature: {}", fixed2(stats.min_temperature)));
        lines.push(format!("Mean humidity: {}", fixed2(stats.mean_humidity)));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[derive(Serialize)]
struct NodeJson {
    count: u64,
    mean_temperature: Option<f64>,
    max_temperature: Option<f64>,
    min_temperature: Option<f64>,
    mean_humidity: Option<f64>,
}

impl From<&NodeStats> for NodeJson {
    fn from(stats: &NodeStats) -> Self {
        let defined = |v: f64| v.is_finite().then_some(v);
        Self {
            count: stats.count,
            mean_temperature: defined(stats.mean_temperature),
            max_temperature: defined(stats.max_temperature),
            min_temperature: defined(stats.min_temperature),
            mean_humidity: defined(stats.mean_humidity),
        }
    }
}

#[derive(Serialize)]
struct ReportJson<'a> {
    generated_at: String,
    skipped_entries: u64,
    nodes: std::collections::BTreeMap<&'a str, NodeJson>,
}

/// JSON report; undefined aggregates become `null`.
pub fn render_json(report: &Report) -> Result<String, serde_json::Error> {
    let doc = ReportJson {
        generated_at: report.generated_at.to_rfc3339(),
        skipped_entries: report.skipped_entries,
        nodes: report
            .nodes
            .iter()
            .map(|(node, stats)| (node.as_str(), NodeJson::from(stats)))
            .collect(),
    };
    serde_json::to_string_pretty(&doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use std::collections::BTreeMap;

    fn sample() -> Report {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            "Node1".to_string(),
            NodeStats {
                count: 3,
                mean_temperature: 25.0,
                max_temperature: 30.456,
                min_temperature: 20.0,
                mean_humidity: 50.0 / 3.0,
            },
        );
        nodes.insert("Node2".to_string(), NodeStats::undefined());
        Report {
            generated_at: Local::now(),
            nodes,
            skipped_entries: 0,
        }
    }

    #[test]
    fn test_text_two_decimals_and_undefined() {
        let text = render_text(&sample());

        assert!(text.contains("== Node1 =="));
        assert!(text.contains("Mean temperature: 25.00"));
        assert!(text.contains("Max temperature: 30.46"));
        assert!(text.contains("Mean humidity: 16.67"));

        let node2 = text.split("== Node2 ==").nth(1).unwrap();
        assert!(node2.contains("Count: 0"));
        assert_eq!(node2.matches("undefined").count(), 4);
        assert!(!node2.contains("NaN"));
    }

    #[test]
    fn test_text_layout() {
        let mut report = sample();
        report.skipped_entries = 2;
        let text = render_text(&report);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "SENSOR REPORT");
        assert!(lines[1].starts_with("Generated: "));
        assert_eq!(lines[2], "Entries: 3");
        assert_eq!(lines[3], "Unreadable entries skipped: 2");
        assert_eq!(lines[4], "");
        assert_eq!(lines[5], "== Node1 ==");
        assert_eq!(lines[11], "");
        assert_eq!(lines[12], "== Node2 ==");
        assert_eq!(lines.len(), 18);
        assert!(text.ends_with("Mean humidity: undefined\n"));
    }

    #[test]
    fn test_json_undefined_is_null() {
        let json = render_json(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["nodes"]["Node1"]["count"], 3);
        assert_eq!(value["nodes"]["Node1"]["min_temperature"], 20.0);
        assert!(value["nodes"]["Node2"]["mean_temperature"].is_null());
        assert!(value["nodes"]["Node2"]["mean_humidity"].is_null());
    }
}
