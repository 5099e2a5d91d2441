//! Alert message rendering.
//!
//! Produces the Markdown body sent to chat: an emoji and level headline,
//! the affected target (with a dashboard link when a base URL is set),
//! the state transition or detail map, and the platform timestamp.

use alerting::AlertEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write;

/// Dashboard link settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Dashboard base URL, e.g. `https://monitor.example.com`
    pub base_url: Option<String>,
}

/// Emoji shown in front of an alert headline
pub fn level_emoji(level: Option<&str>, resolved: bool) -> &'static str {
    if resolved {
        return "✅";
    }
    match level.map(str::to_ascii_uppercase).as_deref() {
        Some("CRITICAL") => "🚨",
        Some("WARNING") => "⚠️",
        Some("OK") => "✅",
        _ => "ℹ️",
    }
}

/// Dashboard path segment for a target type
pub fn target_path(kind: &str) -> String {
    match kind {
        "Server" => "servers".to_string(),
        "Stack" => "stacks".to_string(),
        "Deployment" => "deployments".to_string(),
        "Build" => "builds".to_string(),
        "Repo" => "repos".to_string(),
        "Procedure" => "procedures".to_string(),
        "Action" => "actions".to_string(),
        "Builder" => "builders".to_string(),
        "Alerter" => "alerters".to_string(),
        "ResourceSync" => "resource-syncs".to_string(),
        other => format!("{}s", other.to_ascii_lowercase()),
    }
}

/// Escape characters that legacy chat Markdown treats as markup
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Renders alerts as chat Markdown
#[derive(Debug, Clone, Default)]
pub struct MessageFormatter {
    base_url: Option<String>,
}

impl MessageFormatter {
    pub fn new(links: &LinkConfig) -> Self {
        Self {
            base_url: links
                .base_url
                .as_deref()
                .map(|url| url.trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty()),
        }
    }

    /// Dashboard URL for the event's target, when it can be built
    pub fn target_url(&self, event: &AlertEvent) -> Option<String> {
        let base = self.base_url.as_deref()?;
        let kind = event.target.kind.as_deref()?;
        let id = event.target.id.as_deref()?;
        Some(format!("{base}/{}/{id}", target_path(kind)))
    }

    /// Render the full message body
    pub fn render(&self, event: &AlertEvent) -> String {
        let level = event.level.as_deref().unwrap_or("UNKNOWN");
        let name = event
            .display_name()
            .or(event.target.id.as_deref())
            .unwrap_or("unnamed alert");

        let mut message = format!(
            "{} *{}*: {}",
            level_emoji(event.level.as_deref(), event.resolved),
            escape_markdown(level),
            escape_markdown(name)
        );
        if event.resolved {
            message.push_str("\n_Resolved_");
        }

        // Writing into a String cannot fail
        let _ = write!(
            message,
            "\n{} `{}`",
            escape_markdown(event.target.kind_or_unknown()),
            event.target.id_or_unknown().replace('`', "'")
        );

        match event.state_change() {
            Some(change) => {
                let _ = write!(
                    message,
                    "\nState: {} → {}",
                    escape_markdown(change.from.unwrap_or("unknown")),
                    escape_markdown(change.to.unwrap_or("unknown"))
                );
            }
            None => {
                if let Some(kind) = event.kind() {
                    let _ = write!(message, "\nType: {}", escape_markdown(kind));
                }
                let mut details: Vec<(String, Value)> = event.details().into_iter().collect();
                details.sort_by(|a, b| a.0.cmp(&b.0));
                for (key, value) in details {
                    let value = match value {
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    let _ = write!(
                        message,
                        "\n{}: {}",
                        escape_markdown(&key),
                        escape_markdown(&value)
                    );
                }
            }
        }

        if let Some(when) = event.ts.and_then(DateTime::<Utc>::from_timestamp_millis) {
            let _ = write!(message, "\n{}", when.format("%Y-%m-%d %H:%M:%S UTC"));
        }

        if let Some(url) = self.target_url(event) {
            let _ = write!(message, "\n[Open in dashboard]({url})");
        }

        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::{AlertData, AlertTarget};
    use serde_json::json;

    fn formatter(base_url: Option<&str>) -> MessageFormatter {
        MessageFormatter::new(&LinkConfig {
            base_url: base_url.map(str::to_string),
        })
    }

    #[test]
    fn test_level_emoji() {
        assert_eq!(level_emoji(Some("CRITICAL"), false), "🚨");
        assert_eq!(level_emoji(Some("warning"), false), "⚠️");
        assert_eq!(level_emoji(Some("OK"), false), "✅");
        assert_eq!(level_emoji(None, false), "ℹ️");
        assert_eq!(level_emoji(Some("CRITICAL"), true), "✅");
    }

    #[test]
    fn test_target_path() {
        assert_eq!(target_path("Server"), "servers");
        assert_eq!(target_path("ResourceSync"), "resource-syncs");
        assert_eq!(target_path("Cluster"), "clusters");
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("disk_usage *high*"), "disk\\_usage \\*high\\*");
        assert_eq!(escape_markdown("plain"), "plain");
    }

    #[test]
    fn test_render_state_transition() {
        let event = AlertEvent {
            level: Some("WARNING".to_string()),
            target: AlertTarget::new("Stack", "x"),
            data: AlertData {
                kind: Some("StateTransition".to_string()),
                data: json!({"name": "web", "from": "running", "to": "degraded"}),
            },
            ..Default::default()
        };

        let text = formatter(Some("https://monitor.example.com/")).render(&event);
        assert!(text.starts_with("⚠️ *WARNING*: web"));
        assert!(text.contains("Stack `x`"));
        assert!(text.contains("State: running → degraded"));
        assert!(text.ends_with("[Open in dashboard](https://monitor.example.com/stacks/x)"));
    }

    #[test]
    fn test_render_generic_details_sorted() {
        let event = AlertEvent {
            level: Some("CRITICAL".to_string()),
            target: AlertTarget::new("Server", "s1"),
            data: AlertData {
                kind: Some("ServerDisk".to_string()),
                data: json!({"name": "db", "used_gb": 91, "path": "/var"}),
            },
            ..Default::default()
        };

        let text = formatter(None).render(&event);
        let path_at = text.find("path: /var").unwrap();
        let used_at = text.find("used\\_gb: 91").unwrap();
        assert!(path_at < used_at);
        assert!(!text.contains("Open in dashboard"));
    }

    #[test]
    fn test_render_resolved_and_timestamp() {
        let event = AlertEvent {
            level: Some("CRITICAL".to_string()),
            target: AlertTarget::new("Server", "s1"),
            resolved: true,
            ts: Some(0),
            ..Default::default()
        };

        let text = formatter(None).render(&event);
        assert!(text.starts_with("✅ *CRITICAL*: s1\n_Resolved_"));
        assert!(text.contains("1970-01-01 00:00:00 UTC"));
    }

    #[test]
    fn test_render_empty_event() {
        let text = formatter(Some("https://monitor.example.com")).render(&AlertEvent::default());
        assert!(text.starts_with("ℹ️ *UNKNOWN*: unnamed alert"));
        assert!(text.contains("unknown `unknown`"));
        assert!(!text.contains("Open in dashboard"));
    }
}
