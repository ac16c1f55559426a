//! Axum router configuration for the command and event endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    cancel_command, events_snapshot, get_command, list_commands, submit_command, CommandsAppState,
};

/// Create the command API router.
///
/// # Routes
///
/// - `POST /` - submit a command envelope
/// - `GET  /` - list command states (filters: `status`, `type`, `since`)
/// - `GET  /{id}` - one command's state
/// - `POST /{id}/cancel` - advisory cancel
pub fn command_routes() -> Router<CommandsAppState> {
    Router::new()
        .route("/", post(submit_command).get(list_commands))
        .route("/{id}", get(get_command))
        .route("/{id}/cancel", post(cancel_command))
}

/// Create the event snapshot router.
///
/// # Routes
///
/// - `GET /` - retained events after a cursor (filters: `severity`,
///   `event_types`, `session_id`, `account_id`, `platform`)
pub fn events_routes() -> Router<CommandsAppState> {
    Router::new().route("/", get(events_snapshot))
}
