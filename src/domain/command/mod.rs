//! Command domain - envelopes, lifecycle state and status transitions.

mod envelope;
mod state;
mod status;

pub use envelope::{CommandEnvelope, Requester, SubmitRequest, DEFAULT_COMMAND_TYPE};
pub use state::{CommandState, ListFilter};
pub use status::CommandStatus;
