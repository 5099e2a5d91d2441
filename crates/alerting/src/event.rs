//! Alert Event Model

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Placeholder used wherever an optional identity field is missing
pub const UNKNOWN: &str = "unknown";

/// Destination state that signals a target has recovered
pub const RECOVERED_STATE: &str = "running";

/// Discriminant of state-transition events
pub const STATE_TRANSITION: &str = "StateTransition";

/// Resource an alert is about
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertTarget {
    /// Resource type, e.g. `Server` or `Stack`
    #[serde(rename = "type", default, deserialize_with = "lenient_text")]
    pub kind: Option<String>,
    /// Resource identifier
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: Option<String>,
}

impl AlertTarget {
    /// Create a target from a type and id
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            id: Some(id.into()),
        }
    }

    /// Target type, or the placeholder when absent
    pub fn kind_or_unknown(&self) -> &str {
        self.kind.as_deref().unwrap_or(UNKNOWN)
    }

    /// Target id, or the placeholder when absent
    pub fn id_or_unknown(&self) -> &str {
        self.id.as_deref().unwrap_or(UNKNOWN)
    }
}

/// Typed, variant-specific part of an alert
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertData {
    /// Event-type discriminant
    #[serde(rename = "type", default, deserialize_with = "lenient_text")]
    pub kind: Option<String>,
    /// Variant payload; shape depends on `kind`
    #[serde(default)]
    pub data: Value,
}

/// Payload of a state-transition alert
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateChange<'a> {
    pub name: Option<&'a str>,
    pub from: Option<&'a str>,
    pub to: Option<&'a str>,
}

/// An alert as received from the monitoring platform.
///
/// Every field is optional on the wire: a relay must never drop an alert
/// because an optional field is missing, null or of the wrong type, so such
/// values deserialize to `None` or the default and are substituted
/// downstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    /// Severity level, e.g. `OK`, `WARNING`, `CRITICAL`
    #[serde(default, deserialize_with = "lenient_text")]
    pub level: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub target: AlertTarget,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub resolved: bool,
    /// Platform timestamp in milliseconds
    #[serde(default, deserialize_with = "lenient")]
    pub ts: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub data: AlertData,
}

/// Any value that does not fit `T` becomes `T::default()`
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Strings pass through, numbers keep their textual form, anything else is absent
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    })
}

/// Booleans, or the strings `"true"`/`"false"`; anything else is `false`
fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(flag) => flag,
        Value::String(text) => text.trim().eq_ignore_ascii_case("true"),
        _ => false,
    })
}

impl AlertEvent {
    /// Event-type discriminant, if any
    pub fn kind(&self) -> Option<&str> {
        self.data.kind.as_deref()
    }

    /// Whether this event reports a state transition of its target
    pub fn is_state_transition(&self) -> bool {
        self.kind() == Some(STATE_TRANSITION)
    }

    /// State-transition payload, when this is a state transition
    pub fn state_change(&self) -> Option<StateChange<'_>> {
        if !self.is_state_transition() {
            return None;
        }
        Some(StateChange {
            name: self.str_field("name"),
            from: self.str_field("from"),
            to: self.str_field("to"),
        })
    }

    /// Whether this event reports a return to the healthy state
    pub fn is_recovery(&self) -> bool {
        self.state_change()
            .and_then(|change| change.to)
            .map_or(false, |to| to == RECOVERED_STATE)
    }

    /// Human-readable name carried in the payload
    pub fn display_name(&self) -> Option<&str> {
        self.str_field("name")
    }

    /// Opaque detail map of a generic event, without the display name
    pub fn details(&self) -> Map<String, Value> {
        match &self.data.data {
            Value::Object(map) => map
                .iter()
                .filter(|(k, _)| k.as_str() != "name")
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            _ => Map::new(),
        }
    }

    fn str_field(&self, field: &str) -> Option<&str> {
        self.data.data.get(field).and_then(Value::as_str)
    }
}
