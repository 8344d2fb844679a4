//! Anomaly Agent - threshold rules over a single reading
//!
//! ## Rules
//!
//! Evaluated temperature first, then humidity. The two are independent, so a
//! single reading can fire both.
//!
//! | Rule        | Condition                              | Commands              | Journal |
//! |-------------|----------------------------------------|-----------------------|---------|
//! | Temperature | `t > temperature_max_c`                | `ALARM_ON`, `MOTOR_OFF` | yes   |
//! | Humidity    | `u < humidity_min_pct` or `u > humidity_max_pct` | none        | yes     |
//!
//! Limits are exclusive: a reading exactly on a limit is normal.

use crate::types::{Action, AnomalyEvent, AnomalyKind, Command, Reading, Thresholds};

// ============================================================================
// Pure Evaluation
// ============================================================================

/// Outcome of evaluating one reading
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    /// Commands to dispatch, in rule order
    pub commands: Vec<Command>,
    /// Anomaly events for the journal, in rule order
    pub warnings: Vec<AnomalyEvent>,
}

impl Evaluation {
    pub fn is_nominal(&self) -> bool {
        self.commands.is_empty() && self.warnings.is_empty()
    }
}

/// Check `reading` against `thresholds`. No I/O, no state.
pub fn evaluate(reading: &Reading, thresholds: &Thresholds) -> Evaluation {
    let mut evaluation = Evaluation::default();
    let node_id = reading.node_id();
    let temperature = reading.temperature();
    let humidity = reading.humidity();

    if temperature > thresholds.temperature_max_c {
        evaluation.warnings.push(AnomalyEvent {
            node_id: node_id.to_string(),
            kind: AnomalyKind::HighTemperature {
                value: temperature,
                limit: thresholds.temperature_max_c,
            },
            observed_at: reading.observed_at(),
        });
        evaluation.commands.push(Command::new(node_id, Action::AlarmOn));
        evaluation.commands.push(Command::new(node_id, Action::MotorOff));
    }

    if humidity > thresholds.humidity_max_pct || humidity < thresholds.humidity_min_pct {
        evaluation.warnings.push(AnomalyEvent {
            node_id: node_id.to_string(),
            kind: AnomalyKind::HumidityOutOfRange {
                value: humidity,
                min: thresholds.humidity_min_pct,
                max: thresholds.humidity_max_pct,
            },
            observed_at: reading.observed_at(),
        });
    }

    evaluation
}

// ============================================================================
// Stateful Wrapper
// ============================================================================

/// Counters kept by [`AnomalyAgent`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgentStats {
    pub readings_evaluated: u64,
    pub temperature_alarms: u64,
    pub humidity_warnings: u64,
}

impl std::fmt::Display for AgentStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Evaluated: {}, Temperature alarms: {}, Humidity warnings: {}",
            self.readings_evaluated, self.temperature_alarms, self.humidity_warnings,
        )
    }
}

/// Holds the active thresholds and counts what the rules fire.
#[derive(Debug, Clone)]
pub struct AnomalyAgent {
    thresholds: Thresholds,
    stats: AgentStats,
}

impl AnomalyAgent {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            stats: AgentStats::default(),
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn evaluate(&mut self, reading: &Reading) -> Evaluation {
        let evaluation = evaluate(reading, &self.thresholds);

        self.stats.readings_evaluated += 1;
        for warning in &evaluation.warnings {
            if warning.is_temperature() {
                self.stats.temperature_alarms += 1;
            } else if warning.is_humidity() {
                self.stats.humidity_warnings += 1;
            }
        }

        evaluation
    }

    pub fn stats(&self) -> AgentStats {
        self.stats
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn reading(temperature: f64, humidity: f64) -> Reading {
        Reading::new("Node1", temperature, humidity, Utc::now()).unwrap()
    }

    fn actions(evaluation: &Evaluation) -> Vec<Action> {
        evaluation.commands.iter().map(|c| c.action.clone()).collect()
    }

    #[test]
    fn test_high_temperature_alarms_and_stops_motor() {
        let evaluation = evaluate(&reading(31.0, 55.0), &Thresholds::default());
        assert_eq!(actions(&evaluation), vec![Action::AlarmOn, Action::MotorOff]);
        assert!(evaluation.commands.iter().all(|c| c.node_id == "Node1"));
        assert_eq!(evaluation.warnings.len(), 1);
        assert!(evaluation.warnings[0].is_temperature());
    }

    #[test]
    fn test_humidity_out_of_range_warns_only() {
        let evaluation = evaluate(&reading(20.0, 80.0), &Thresholds::default());
        assert!(evaluation.commands.is_empty());
        assert_eq!(evaluation.warnings.len(), 1);
        assert!(evaluation.warnings[0].is_humidity());

        let dry = evaluate(&reading(20.0, 39.9), &Thresholds::default());
        assert!(dry.commands.is_empty());
        assert_eq!(dry.warnings.len(), 1);
    }

    #[test]
    fn test_both_rules_fire_temperature_first() {
        let evaluation = evaluate(&reading(31.0, 80.0), &Thresholds::default());
        assert_eq!(actions(&evaluation), vec![Action::AlarmOn, Action::MotorOff]);
        assert_eq!(evaluation.warnings.len(), 2);
        assert!(evaluation.warnings[0].is_temperature());
        assert!(evaluation.warnings[1].is_humidity());
    }

    #[test]
    fn test_limits_are_exclusive() {
        let thresholds = Thresholds::default();
        assert!(evaluate(&reading(30.0, 40.0), &thresholds).is_nominal());
        assert!(evaluate(&reading(30.0, 70.0), &thresholds).is_nominal());
        assert!(evaluate(&reading(22.0, 55.0), &thresholds).is_nominal());
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = Thresholds {
            temperature_max_c: 25.0,
            humidity_min_pct: 20.0,
            humidity_max_pct: 90.0,
        };
        let evaluation = evaluate(&reading(26.0, 80.0), &thresholds);
        assert_eq!(evaluation.commands.len(), 2);
        assert_eq!(evaluation.warnings.len(), 1);
    }

    #[test]
    fn test_agent_counts_rule_hits() {
        let mut agent = AnomalyAgent::new(Thresholds::default());
        agent.evaluate(&reading(31.0, 80.0));
        agent.evaluate(&reading(20.0, 30.0));
        agent.evaluate(&reading(20.0, 50.0));

        let stats = agent.stats();
        assert_eq!(stats.readings_evaluated, 3);
        assert_eq!(stats.temperature_alarms, 1);
        assert_eq!(stats.humidity_warnings, 2);
    }
}
