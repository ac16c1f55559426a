//! Command lifecycle status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};

/// Lifecycle status of a submitted command.
///
/// Commands move `CREATED -> QUEUED -> RUNNING` and then into exactly one
/// terminal status. `CANCELLED` is additionally reachable from any
/// non-terminal status; terminal statuses have no outgoing transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandStatus {
    Created,
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl CommandStatus {
    /// Returns true for `SUCCEEDED`, `FAILED` and `CANCELLED`.
    pub fn is_terminal_status(&self) -> bool {
        matches!(
            self,
            CommandStatus::Succeeded | CommandStatus::Failed | CommandStatus::Cancelled
        )
    }
}

impl StateMachine for CommandStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use CommandStatus::*;
        matches!(
            (self, target),
            (Created, Queued)
                | (Queued, Running)
                | (Running, Succeeded)
                | (Running, Failed)
                | (Created, Cancelled)
                | (Queued, Cancelled)
                | (Running, Cancelled)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use CommandStatus::*;
        match self {
            Created => vec![Queued, Cancelled],
            Queued => vec![Running, Cancelled],
            Running => vec![Succeeded, Failed, Cancelled],
            Succeeded | Failed | Cancelled => vec![],
        }
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CommandStatus::Created => "CREATED",
            CommandStatus::Queued => "QUEUED",
            CommandStatus::Running => "RUNNING",
            CommandStatus::Succeeded => "SUCCEEDED",
            CommandStatus::Failed => "FAILED",
            CommandStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for CommandStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CREATED" => Ok(CommandStatus::Created),
            "QUEUED" => Ok(CommandStatus::Queued),
            "RUNNING" => Ok(CommandStatus::Running),
            "SUCCEEDED" => Ok(CommandStatus::Succeeded),
            "FAILED" => Ok(CommandStatus::Failed),
            "CANCELLED" => Ok(CommandStatus::Cancelled),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}
