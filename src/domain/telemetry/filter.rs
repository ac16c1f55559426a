//! Subscriber-side event filtering.

use serde::{Deserialize, Serialize};

use super::{EventEnvelope, Severity};

/// Allow-list filter attached to a subscriber.
///
/// Matching is AND across dimensions and OR within a list-valued
/// dimension; an unspecified dimension always matches. An event that
/// carries no target never matches a filter that specifies a target
/// dimension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Vec<Severity>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_types: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

impl EventFilter {
    /// A filter with no dimensions specified; matches every event.
    pub fn match_all() -> Self {
        Self::default()
    }

    /// Restricts to the given severities.
    pub fn with_severity(mut self, severity: Vec<Severity>) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Restricts to the given event types.
    pub fn with_event_types<I, S>(mut self, event_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.event_types = Some(event_types.into_iter().map(Into::into).collect());
        self
    }

    /// Restricts to events targeting the given session.
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Checks whether an event passes every specified dimension.
    pub fn matches(&self, event: &EventEnvelope) -> bool {
        if let Some(severities) = &self.severity {
            if !severities.contains(&event.severity) {
                return false;
            }
        }

        if let Some(event_types) = &self.event_types {
            if !event_types.iter().any(|t| t == &event.event_type) {
                return false;
            }
        }

        if let Some(session_id) = &self.session_id {
            match &event.target {
                Some(target) if target.session_id.as_deref() == Some(session_id) => {}
                _ => return false,
            }
        }

        if let Some(account_id) = &self.account_id {
            match &event.target {
                Some(target) if target.account_id.as_deref() == Some(account_id) => {}
                _ => return false,
            }
        }

        if let Some(platform) = &self.platform {
            match &event.target {
                Some(target) if target.platform.as_deref() == Some(platform) => {}
                _ => return false,
            }
        }

        true
    }
}
