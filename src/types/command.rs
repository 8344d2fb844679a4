//! Outbound node commands

use serde::{Deserialize, Serialize};
use std::fmt;

/// Action vocabulary understood by node firmware.
///
/// `Other` carries tokens added by newer firmware without a code change here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    AlarmOn,
    MotorOff,
    Other(String),
}

impl Action {
    /// Wire token for this action.
    pub fn token(&self) -> &str {
        match self {
            Self::AlarmOn => "ALARM_ON",
            Self::MotorOff => "MOTOR_OFF",
            Self::Other(token) => token,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Fire-and-forget instruction addressed to one node. No acknowledgement is modeled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub node_id: String,
    pub action: Action,
}

impl Command {
    pub fn new(node_id: impl Into<String>, action: Action) -> Self {
        Self {
            node_id: node_id.into(),
            action,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.action, self.node_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_tokens() {
        assert_eq!(Action::AlarmOn.token(), "ALARM_ON");
        assert_eq!(Action::MotorOff.token(), "MOTOR_OFF");
        assert_eq!(Action::Other("FAN_ON".to_string()).token(), "FAN_ON");
        assert_eq!(
            Command::new("Node3", Action::MotorOff).to_string(),
            "MOTOR_OFF -> Node3"
        );
    }
}
