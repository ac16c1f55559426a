//! Mutable lifecycle record tracked for every submitted command.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::domain::foundation::{CommandId, StateMachine, Timestamp, ValidationError};

use super::CommandStatus;

/// Lifecycle record for one command.
///
/// One CommandState exists per [`super::CommandEnvelope`], sharing its
/// `command_id`. The record is created at submission and mutated only
/// through [`CommandState::apply`]; it is never deleted while the process
/// lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandState {
    pub command_id: CommandId,
    pub status: CommandStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Map<String, JsonValue>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandState {
    /// Creates the initial record for a freshly submitted command.
    pub fn new(command_id: CommandId) -> Self {
        let now = Timestamp::now();
        Self {
            command_id,
            status: CommandStatus::Created,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
        }
    }

    /// Applies a validated status transition in place.
    ///
    /// Stamps `started_at` on the first entry into `RUNNING` and
    /// `completed_at` on entry into a terminal status. Terminal statuses
    /// reject further transitions, so `completed_at` is stamped exactly
    /// once. `result` and `error` are attached when given.
    pub fn apply(
        &mut self,
        status: CommandStatus,
        result: Option<Map<String, JsonValue>>,
        error: Option<String>,
    ) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(status)?;

        let now = Timestamp::now();
        self.updated_at = now;

        if status == CommandStatus::Running && self.started_at.is_none() {
            self.started_at = Some(now);
        }
        if status.is_terminal_status() {
            self.completed_at = Some(now);
        }
        if let Some(result) = result {
            self.result = Some(result);
        }
        if let Some(error) = error {
            self.error = Some(error);
        }

        Ok(())
    }
}

/// Filter for listing command states.
///
/// All dimensions are optional and combine with AND; `since` is an
/// inclusive lower bound on `created_at`.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub status: Option<CommandStatus>,
    pub command_type: Option<String>,
    pub since: Option<Timestamp>,
}

impl ListFilter {
    /// Checks whether a state (with its envelope's command type) matches.
    pub fn matches(&self, state: &CommandState, command_type: &str) -> bool {
        if let Some(status) = self.status {
            if state.status != status {
                return false;
            }
        }
        if let Some(wanted) = &self.command_type {
            if wanted != command_type {
                return false;
            }
        }
        if let Some(since) = &self.since {
            if state.created_at.is_before(since) {
                return false;
            }
        }
        true
    }
}
