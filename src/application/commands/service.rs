//! CommandService - the submission, query and cancel facade.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::domain::command::{CommandEnvelope, CommandState, ListFilter, SubmitRequest};
use crate::domain::foundation::{CommandId, DomainError, ErrorCode};

use super::store::{CommandStore, CreateOutcome};

/// Entry point for callers of the control plane.
///
/// Wraps the store and the executor's queue: a fresh submission is
/// recorded, transitioned to `QUEUED` and pushed to the single worker; a
/// deduplicated submission is returned as-is and never re-queued.
pub struct CommandService {
    store: Arc<CommandStore>,
    queue: mpsc::UnboundedSender<CommandId>,
}

impl CommandService {
    /// Creates a service over the store and the worker queue.
    pub fn new(store: Arc<CommandStore>, queue: mpsc::UnboundedSender<CommandId>) -> Self {
        Self { store, queue }
    }

    /// Submits a partial envelope and returns the resulting state.
    ///
    /// Validation failures surface here synchronously; queue placement is
    /// fire-and-forget from the caller's point of view.
    pub fn submit(&self, request: SubmitRequest) -> Result<CommandState, DomainError> {
        let envelope = CommandEnvelope::from_request(request)?;
        let command_type = envelope.command_type.clone();

        match self.store.create(envelope) {
            CreateOutcome::Existing(state) => Ok(state),
            CreateOutcome::Created(state) => {
                let command_id = state.command_id;
                let queued = self
                    .store
                    .transition(&command_id, crate::domain::command::CommandStatus::Queued, None, None)?;

                if self.queue.send(command_id).is_err() {
                    tracing::error!(
                        command_id = %command_id,
                        "executor queue is closed, command will not run"
                    );
                    return Err(DomainError::new(
                        ErrorCode::QueueClosed,
                        "command queue is closed",
                    ));
                }

                tracing::info!(
                    command_id = %command_id,
                    command_type = %command_type,
                    "command submitted"
                );
                Ok(queued)
            }
        }
    }

    /// Looks up a command's lifecycle state.
    pub fn get(&self, command_id: &CommandId) -> Option<CommandState> {
        self.store.get(command_id)
    }

    /// Cancels a non-terminal command; returns whether it took effect.
    pub fn cancel(&self, command_id: &CommandId) -> bool {
        self.store.cancel(command_id)
    }

    /// Lists command states matching the filter, newest first.
    pub fn list(&self, filter: &ListFilter) -> Vec<CommandState> {
        self.store.list(filter)
    }
}
