//! HTTP adapter for the command control plane.

mod dto;
mod handlers;
mod routes;

pub use dto::{CancelResponse, ErrorBody, EventsQuery, ListQuery};
pub use handlers::{ApiError, CommandsAppState};
pub use routes::{command_routes, events_routes};
