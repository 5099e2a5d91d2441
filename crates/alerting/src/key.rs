//! Alert Key Derivation

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::event::{AlertEvent, UNKNOWN};

/// Stable identity used to coalesce repeated alerts
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertKey(String);

impl AlertKey {
    /// Borrow the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this key belongs to the family identified by `prefix`
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Display for AlertKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AlertKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Derive the coalescing key for an event.
///
/// State transitions are keyed by destination state so that repeated
/// transitions into the same state coalesce while transitions into
/// different states stay distinct. Everything else is keyed by level.
/// Missing fields become `"unknown"`; this never fails.
pub fn derive_key(event: &AlertEvent) -> AlertKey {
    let kind = event.target.kind_or_unknown();
    let id = event.target.id_or_unknown();

    match event.state_change() {
        Some(change) => AlertKey(format!(
            "{kind}:{id}:state:{}",
            change.to.unwrap_or(UNKNOWN)
        )),
        None => AlertKey(format!(
            "{kind}:{id}:{}",
            event.level.as_deref().unwrap_or(UNKNOWN)
        )),
    }
}

/// Prefix shared by every state-transition key of the event's target
pub fn state_family_prefix(event: &AlertEvent) -> String {
    format!(
        "{}:{}:state:",
        event.target.kind_or_unknown(),
        event.target.id_or_unknown()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{AlertData, AlertTarget};
    use proptest::prelude::*;
    use serde_json::json;

    fn generic(kind: &str, id: &str, level: &str) -> AlertEvent {
        AlertEvent {
            level: Some(level.to_string()),
            target: AlertTarget::new(kind, id),
            ..Default::default()
        }
    }

    fn transition(kind: &str, id: &str, to: &str) -> AlertEvent {
        AlertEvent {
            level: Some("WARNING".to_string()),
            target: AlertTarget::new(kind, id),
            data: AlertData {
                kind: Some("StateTransition".to_string()),
                data: json!({"name": "svc", "from": "running", "to": to}),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_generic_key_uses_level() {
        let key = derive_key(&generic("server", "s1", "CRITICAL"));
        assert_eq!(key.as_str(), "server:s1:CRITICAL");
    }

    #[test]
    fn test_transition_key_uses_destination_state() {
        let degraded = derive_key(&transition("stack", "x", "degraded"));
        let stopped = derive_key(&transition("stack", "x", "stopped"));

        assert_eq!(degraded.as_str(), "stack:x:state:degraded");
        assert_ne!(degraded, stopped);
        assert!(degraded.has_prefix(&state_family_prefix(&transition("stack", "x", "running"))));
    }

    #[test]
    fn test_level_does_not_affect_transition_key() {
        let mut critical = transition("stack", "x", "degraded");
        critical.level = Some("CRITICAL".to_string());
        assert_eq!(
            derive_key(&critical),
            derive_key(&transition("stack", "x", "degraded"))
        );
    }

    #[test]
    fn test_missing_fields_use_placeholders() {
        assert_eq!(derive_key(&AlertEvent::default()).as_str(), "unknown:unknown:unknown");

        let mut event = transition("stack", "x", "degraded");
        event.data.data = json!({});
        event.target.id = None;
        assert_eq!(derive_key(&event).as_str(), "stack:unknown:state:unknown");
    }

    #[test]
    fn test_platform_state_change_keys_by_level() {
        let mut event = transition("stack", "x", "running");
        event.level = Some("CRITICAL".to_string());
        event.data.kind = Some("StackStateChange".to_string());
        assert_eq!(derive_key(&event).as_str(), "stack:x:CRITICAL");
    }

    #[test]
    fn test_family_prefix_excludes_other_targets() {
        let other = derive_key(&transition("stack", "xy", "degraded"));
        assert!(!other.has_prefix(&state_family_prefix(&transition("stack", "x", "running"))));
    }

    proptest! {
        #[test]
        fn derive_key_is_total_and_deterministic(
            kind in proptest::option::of("[A-Za-z]{0,8}"),
            id in proptest::option::of("[a-z0-9-]{0,12}"),
            level in proptest::option::of("[A-Z]{0,8}"),
            event_type in proptest::option::of("[A-Za-z]{0,16}"),
            payload in proptest::option::of("[a-z]{0,8}"),
        ) {
            let event = AlertEvent {
                level,
                target: AlertTarget { kind, id },
                data: AlertData {
                    kind: event_type,
                    data: payload.map_or(serde_json::Value::Null, |to| json!({"to": to})),
                },
                ..Default::default()
            };

            let first = derive_key(&event);
            prop_assert_eq!(&first, &derive_key(&event.clone()));
            prop_assert!(first.as_str().split(':').count() >= 3);
        }
    }
}
