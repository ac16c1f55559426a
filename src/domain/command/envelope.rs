//! Immutable command envelope and the partial submission request it is
//! built from.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::domain::foundation::{CommandId, Target, Timestamp, ValidationError};

/// Command type used when a submission omits `type`.
pub const DEFAULT_COMMAND_TYPE: &str = "run";

/// The service that submitted a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub service: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
}

/// Immutable description of a unit of requested work.
///
/// Created exactly once at submission time and never mutated afterwards;
/// the mutable lifecycle lives in [`super::CommandState`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub command_id: CommandId,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    pub requested_at: Timestamp,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester: Option<Requester>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,

    #[serde(rename = "type")]
    pub command_type: String,

    pub payload: Map<String, JsonValue>,
}

/// Partial envelope accepted at the submission boundary.
///
/// Every field is optional; [`CommandEnvelope::from_request`] fills the
/// defaults and validates what was provided.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitRequest {
    /// Protocol version tag sent by clients. Accepted for forward
    /// compatibility; the current protocol has a single version.
    pub version: Option<String>,

    pub command_id: Option<CommandId>,
    pub idempotency_key: Option<String>,
    pub correlation_id: Option<String>,
    pub requested_at: Option<Timestamp>,
    pub requester: Option<Requester>,
    pub target: Option<Target>,

    #[serde(rename = "type")]
    pub command_type: Option<String>,

    pub payload: Option<Map<String, JsonValue>>,
}

impl SubmitRequest {
    /// Convenience constructor for a typed submission.
    pub fn of_type(command_type: impl Into<String>) -> Self {
        Self {
            command_type: Some(command_type.into()),
            ..Self::default()
        }
    }

    /// Sets the idempotency key.
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    /// Sets the payload map.
    pub fn with_payload(mut self, payload: Map<String, JsonValue>) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Sets the target.
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }
}

impl CommandEnvelope {
    /// Builds a full envelope from a partial submission.
    ///
    /// Missing `command_id` is generated, `type` defaults to
    /// [`DEFAULT_COMMAND_TYPE`], `payload` defaults to an empty map and
    /// `requested_at` to the current moment. A provided-but-empty `type` or
    /// `idempotency_key` is rejected rather than silently defaulted.
    pub fn from_request(request: SubmitRequest) -> Result<Self, ValidationError> {
        if let Some(command_type) = &request.command_type {
            if command_type.trim().is_empty() {
                return Err(ValidationError::empty_field("type"));
            }
        }

        if let Some(key) = &request.idempotency_key {
            if key.trim().is_empty() {
                return Err(ValidationError::empty_field("idempotency_key"));
            }
        }

        Ok(Self {
            command_id: request.command_id.unwrap_or_default(),
            idempotency_key: request.idempotency_key,
            correlation_id: request.correlation_id,
            requested_at: request.requested_at.unwrap_or_default(),
            requester: request.requester,
            target: request.target,
            command_type: request
                .command_type
                .unwrap_or_else(|| DEFAULT_COMMAND_TYPE.to_string()),
            payload: request.payload.unwrap_or_default(),
        })
    }
}
