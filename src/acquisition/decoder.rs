//! Frame decoder
//!
//! Node firmware sends one JSON object per line, in one of two key styles:
//!
//! - short: `{"n": "Node1", "t": 23.5, "u": 48.0}`
//! - long:  `{"node": "Node1", "temperatura": 23.5, "umidade": 48.0}`
//!
//! Some firmware revisions wrap the object in free text
//! (`Data sent: {...}`), so decoding is two-phase: the whole line is parsed
//! first, and if that fails the span from the first `{` to the last `}` is
//! parsed instead. When both styles are present the short key wins.
//!
//! Malformed input is never an error for the caller: [`decode`] returns
//! `None`. [`decode_frame`] exposes the reason for diagnostics.

use crate::types::Reading;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

/// Why a frame was discarded. Informational only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("empty frame")]
    Empty,

    #[error("no JSON object in frame")]
    Malformed,

    #[error("missing field: {0}")]
    FieldMissing(&'static str),

    #[error("invalid value for field: {0}")]
    TypeInvalid(&'static str),
}

/// Key pairs accepted for each field, short key first.
mod keys {
    pub const NODE: (&str, &str) = ("n", "node");
    pub const TEMPERATURE: (&str, &str) = ("t", "temperatura");
    pub const HUMIDITY: (&str, &str) = ("u", "umidade");
}

/// Decode one frame, stamping the reading with the current time.
///
/// Returns `None` for anything that is not a complete, valid reading.
pub fn decode(line: &str) -> Option<Reading> {
    decode_frame(line, Utc::now()).ok()
}

/// Decode one frame with an explicit acquisition time.
pub fn decode_frame(line: &str, observed_at: DateTime<Utc>) -> Result<Reading, DecodeError> {
    let object = parse_object(line)?;

    let node_id = resolve_node(&object)?;
    let temperature = resolve_number(&object, keys::TEMPERATURE, "temperature")?;
    let humidity = resolve_number(&object, keys::HUMIDITY, "humidity")?;

    Reading::new(node_id, temperature, humidity, observed_at)
        .ok_or(DecodeError::TypeInvalid("measurement"))
}

/// Strict parse of the whole line, then lenient parse of the outermost braces.
fn parse_object(line: &str) -> Result<Map<String, Value>, DecodeError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(DecodeError::Empty);
    }

    if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(trimmed) {
        return Ok(object);
    }

    let start = trimmed.find('{').ok_or(DecodeError::Malformed)?;
    let end = trimmed.rfind('}').ok_or(DecodeError::Malformed)?;
    if end < start {
        return Err(DecodeError::Malformed);
    }

    match serde_json::from_str::<Value>(&trimmed[start..=end]) {
        Ok(Value::Object(object)) => Ok(object),
        _ => Err(DecodeError::Malformed),
    }
}

/// First non-null value among `(short, long)`.
fn lookup<'a>(object: &'a Map<String, Value>, (short, long): (&str, &str)) -> Option<&'a Value> {
    [short, long]
        .into_iter()
        .filter_map(|key| object.get(key))
        .find(|value| !value.is_null())
}

fn resolve_node(object: &Map<String, Value>) -> Result<String, DecodeError> {
    let (short, long) = keys::NODE;
    let value = [short, long]
        .into_iter()
        .filter_map(|key| object.get(key))
        .find(|value| match value {
            Value::Null => false,
            Value::String(s) => !s.trim().is_empty(),
            _ => true,
        })
        .ok_or(DecodeError::FieldMissing("node"))?;

    match value {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
        _ => Err(DecodeError::TypeInvalid("node")),
    }
}

fn resolve_number(
    object: &Map<String, Value>,
    keys: (&str, &str),
    field: &'static str,
) -> Result<f64, DecodeError> {
    let value = lookup(object, keys).ok_or(DecodeError::FieldMissing(field))?;

    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or(DecodeError::TypeInvalid(field))?;

    if number.is_finite() {
        Ok(number)
    } else {
        Err(DecodeError::TypeInvalid(field))
    }
}
