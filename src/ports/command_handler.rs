//! CommandHandler port - the seam where external workers plug in.
//!
//! Handlers wrap the actual long-running work (browser sessions, media
//! jobs, scrapers). The executor hands each one the immutable envelope
//! plus a [`CommandContext`] capability; the handler reports its own
//! terminal outcome through that context exactly once before returning.

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};

use crate::domain::command::{CommandEnvelope, CommandStatus};
use crate::domain::foundation::{CommandId, DomainError};
use crate::domain::telemetry::{Cursor, EmitOptions};

/// Capabilities a running handler has over the core.
///
/// The contract: call `succeed` or `fail` exactly once for the command
/// being handled, before `handle` returns. `emit` may be called any
/// number of times for progress reporting, and `status` lets a
/// cooperative handler observe an advisory cancellation; the core never
/// interrupts running work on its own.
pub trait CommandContext: Send + Sync {
    /// Records the terminal `SUCCEEDED` outcome with its result map.
    fn succeed(
        &self,
        command_id: &CommandId,
        result: Map<String, JsonValue>,
    ) -> Result<(), DomainError>;

    /// Records the terminal `FAILED` outcome with an error message.
    fn fail(&self, command_id: &CommandId, error: String) -> Result<(), DomainError>;

    /// Current status of a command, or `None` when unknown.
    fn status(&self, command_id: &CommandId) -> Option<CommandStatus>;

    /// Emits a progress event on the telemetry stream.
    fn emit(&self, event_type: &str, payload: JsonValue, options: EmitOptions) -> Cursor;
}

/// One registered worker, keyed by command type.
///
/// A handler error is caught by the executor and recorded as a `FAILED`
/// outcome on the handler's behalf; it never stops the queue.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Executes the command described by `envelope`.
    async fn handle(
        &self,
        envelope: &CommandEnvelope,
        ctx: &dyn CommandContext,
    ) -> Result<(), DomainError>;

    /// Stable name used in logs.
    fn name(&self) -> &'static str;
}
