//! Immutable telemetry event envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::foundation::{CommandId, EventId, Target, Timestamp};

use super::{Cursor, Severity};

/// One immutable entry in the append-only telemetry log.
///
/// The `type` field on the wire carries the event type string (e.g.
/// `"status.changed"`), which is also what distinguishes envelopes from
/// control frames on the streaming transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: EventId,
    pub cursor: Cursor,
    pub emitted_at: Timestamp,
    pub severity: Severity,

    #[serde(rename = "type")]
    pub event_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,

    pub payload: JsonValue,
}

/// Optional context attached to an emitted event.
///
/// Severity defaults to `info`; the remaining dimensions are only set when
/// the emitter has them.
#[derive(Debug, Clone, Default)]
pub struct EmitOptions {
    pub severity: Severity,
    pub command_id: Option<CommandId>,
    pub correlation_id: Option<String>,
    pub target: Option<Target>,
}

impl EmitOptions {
    /// Options with the given severity and nothing else.
    pub fn severity(severity: Severity) -> Self {
        Self {
            severity,
            ..Self::default()
        }
    }

    /// Sets the severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Links the event to a command.
    pub fn with_command_id(mut self, command_id: CommandId) -> Self {
        self.command_id = Some(command_id);
        self
    }

    /// Adds a correlation id for request tracing.
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Adds the target the event refers to.
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }
}
