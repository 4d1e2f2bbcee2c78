//! Webhook targets and delivery outcomes.

use serde::{Deserialize, Serialize};

/// A webhook endpoint owned by the persistence collaborator.
///
/// Read-only to the dispatcher; disabled targets are skipped without a
/// network attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookTarget {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub enabled: bool,
}

impl WebhookTarget {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Result of delivering the clip to one webhook target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// The endpoint answered with a 2xx status
    Sent,
    /// The endpoint answered with a non-2xx status
    HttpError { status: u16 },
    /// Transport-level failure (connect, timeout, DNS)
    NetworkError { message: String },
    /// Target disabled; no network attempt made
    Skipped,
}

impl DeliveryOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, DeliveryOutcome::Sent)
    }
}

/// A delivery outcome tagged with the target it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetOutcome {
    pub target: String,
    pub outcome: DeliveryOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enabled_default_is_false_on_deserialize() {
        let target: WebhookTarget =
            serde_json::from_str(r#"{"name": "main", "url": "https://example.com/hook"}"#).unwrap();
        assert!(!target.enabled);
    }

    #[test]
    fn test_outcome_tagging() {
        let sent = serde_json::to_value(DeliveryOutcome::Sent).unwrap();
        assert_eq!(sent["result"], "sent");

        let err = serde_json::to_value(DeliveryOutcome::HttpError { status: 413 }).unwrap();
        assert_eq!(err["result"], "http_error");
        assert_eq!(err["status"], 413);
    }
}
