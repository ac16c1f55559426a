//! CommandExecutor - single-worker sequential processing of submitted
//! commands.
//!
//! One task drains the queue; each command is fully awaited before the
//! next is popped, so commands never run concurrently and execute in
//! submission order. The work behind a handler usually owns one exclusive
//! external session, which is what the strict ordering protects.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Map, Value as JsonValue};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::adapters::events::EventBus;
use crate::domain::command::{CommandEnvelope, CommandStatus};
use crate::domain::foundation::{CommandId, DomainError};
use crate::domain::telemetry::{Cursor, EmitOptions};
use crate::ports::{CommandContext, CommandHandler};

use super::store::CommandStore;

/// What to do with a command whose type has no registered handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnknownCommandPolicy {
    /// Transition straight to `SUCCEEDED` with a stub result. Keeps old
    /// clients working against a server that no longer (or does not yet)
    /// know a command type.
    #[default]
    StubSuccess,
    /// Transition to `FAILED` with a descriptive error.
    Reject,
}

/// Handler table built at startup, keyed by command type.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for a command type, replacing any previous
    /// registration for that type.
    pub fn register(
        &mut self,
        command_type: impl Into<String>,
        handler: Arc<dyn CommandHandler>,
    ) -> &mut Self {
        self.handlers.insert(command_type.into(), handler);
        self
    }

    /// Looks up the handler for a command type.
    pub fn get(&self, command_type: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(command_type).cloned()
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// True when no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Capabilities handed to a running handler.
struct ExecutionContext {
    store: Arc<CommandStore>,
    bus: Arc<EventBus>,
}

impl CommandContext for ExecutionContext {
    fn succeed(
        &self,
        command_id: &CommandId,
        result: Map<String, JsonValue>,
    ) -> Result<(), DomainError> {
        self.store
            .transition(command_id, CommandStatus::Succeeded, Some(result), None)
            .map(|_| ())
    }

    fn fail(&self, command_id: &CommandId, error: String) -> Result<(), DomainError> {
        self.store
            .transition(command_id, CommandStatus::Failed, None, Some(error))
            .map(|_| ())
    }

    fn status(&self, command_id: &CommandId) -> Option<CommandStatus> {
        self.store.get(command_id).map(|state| state.status)
    }

    fn emit(&self, event_type: &str, payload: JsonValue, options: EmitOptions) -> Cursor {
        self.bus.emit(event_type, payload, options)
    }
}

/// Sequential processor for the command queue.
pub struct CommandExecutor {
    store: Arc<CommandStore>,
    bus: Arc<EventBus>,
    registry: HandlerRegistry,
    unknown_policy: UnknownCommandPolicy,
}

impl CommandExecutor {
    /// Creates an executor over the given store, bus and handler table.
    pub fn new(
        store: Arc<CommandStore>,
        bus: Arc<EventBus>,
        registry: HandlerRegistry,
        unknown_policy: UnknownCommandPolicy,
    ) -> Self {
        Self {
            store,
            bus,
            registry,
            unknown_policy,
        }
    }

    /// Spawns the single worker task draining the queue.
    ///
    /// The task ends when every sender half of the channel is dropped.
    pub fn spawn(self, queue: mpsc::UnboundedReceiver<CommandId>) -> JoinHandle<()> {
        tokio::spawn(self.run(queue))
    }

    async fn run(self, mut queue: mpsc::UnboundedReceiver<CommandId>) {
        tracing::debug!(
            handlers = self.registry.len(),
            "command executor worker started"
        );
        while let Some(command_id) = queue.recv().await {
            self.execute(command_id).await;
        }
        tracing::debug!("command executor worker stopped");
    }

    /// Runs one command to completion.
    ///
    /// Handler errors are converted to a `FAILED` transition and never
    /// escape, so one failing command cannot block the queue behind it.
    pub(crate) async fn execute(&self, command_id: CommandId) {
        let Some(state) = self.store.get(&command_id) else {
            tracing::warn!(command_id = %command_id, "dequeued unknown command");
            return;
        };
        if state.status.is_terminal_status() {
            // Cancelled (or otherwise finished) while waiting in the queue.
            tracing::debug!(
                command_id = %command_id,
                status = %state.status,
                "skipping command that reached a terminal status while queued"
            );
            return;
        }

        if let Err(err) = self
            .store
            .transition(&command_id, CommandStatus::Running, None, None)
        {
            tracing::warn!(command_id = %command_id, error = %err, "could not start command");
            return;
        }

        let Some(envelope) = self.store.envelope(&command_id) else {
            tracing::warn!(command_id = %command_id, "command envelope missing");
            return;
        };

        match self.registry.get(&envelope.command_type) {
            Some(handler) => self.run_handler(&envelope, handler).await,
            None => self.finish_unhandled(&envelope),
        }
    }

    async fn run_handler(&self, envelope: &CommandEnvelope, handler: Arc<dyn CommandHandler>) {
        let command_id = envelope.command_id;
        tracing::info!(
            command_id = %command_id,
            command_type = %envelope.command_type,
            handler = handler.name(),
            "executing command"
        );

        let ctx = ExecutionContext {
            store: self.store.clone(),
            bus: self.bus.clone(),
        };

        if let Err(err) = handler.handle(envelope, &ctx).await {
            tracing::warn!(
                command_id = %command_id,
                handler = handler.name(),
                error = %err,
                "handler failed"
            );

            let already_terminal = self
                .store
                .get(&command_id)
                .map(|state| state.status.is_terminal_status())
                .unwrap_or(true);
            if !already_terminal {
                if let Err(transition_err) = self.store.transition(
                    &command_id,
                    CommandStatus::Failed,
                    None,
                    Some(err.to_string()),
                ) {
                    tracing::error!(
                        command_id = %command_id,
                        error = %transition_err,
                        "could not record handler failure"
                    );
                }
            }
        }
    }

    fn finish_unhandled(&self, envelope: &CommandEnvelope) {
        let command_id = envelope.command_id;
        match self.unknown_policy {
            UnknownCommandPolicy::StubSuccess => {
                tracing::info!(
                    command_id = %command_id,
                    command_type = %envelope.command_type,
                    "no handler registered, completing with stub result"
                );
                let mut result = Map::new();
                result.insert("acknowledged".to_string(), json!(true));
                result.insert("handler".to_string(), json!("none"));
                if let Err(err) = self.store.transition(
                    &command_id,
                    CommandStatus::Succeeded,
                    Some(result),
                    None,
                ) {
                    tracing::error!(command_id = %command_id, error = %err, "stub completion failed");
                }
            }
            UnknownCommandPolicy::Reject => {
                tracing::warn!(
                    command_id = %command_id,
                    command_type = %envelope.command_type,
                    "no handler registered, rejecting"
                );
                let message = format!(
                    "no handler registered for command type '{}'",
                    envelope.command_type
                );
                if let Err(err) =
                    self.store
                        .transition(&command_id, CommandStatus::Failed, None, Some(message))
                {
                    tracing::error!(command_id = %command_id, error = %err, "rejection failed");
                }
            }
        }
    }
}
