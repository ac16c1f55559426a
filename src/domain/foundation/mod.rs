//! Foundation - shared value objects and base traits for the domain layer.

mod errors;
mod ids;
mod state_machine;
mod target;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{CommandId, EventId, SubscriberId};
pub use state_machine::StateMachine;
pub use target::Target;
pub use timestamp::Timestamp;
