//! HTTP handlers for command submission, query, cancel and the event
//! snapshot endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::adapters::events::EventBus;
use crate::application::CommandService;
use crate::domain::command::CommandState;
use crate::domain::foundation::{CommandId, DomainError, ErrorCode};
use crate::domain::telemetry::EventEnvelope;

use super::dto::{CancelResponse, ErrorBody, EventsQuery, ListQuery};

/// Shared state for the command endpoints.
#[derive(Clone)]
pub struct CommandsAppState {
    pub service: Arc<CommandService>,
    pub bus: Arc<EventBus>,
}

/// Error wrapper mapping domain errors onto HTTP statuses.
#[derive(Debug)]
pub struct ApiError(DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.code {
            ErrorCode::ValidationFailed | ErrorCode::EmptyField | ErrorCode::InvalidFormat => {
                StatusCode::BAD_REQUEST
            }
            ErrorCode::CommandNotFound => StatusCode::NOT_FOUND,
            ErrorCode::InvalidStateTransition => StatusCode::CONFLICT,
            ErrorCode::QueueClosed | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ErrorBody::from(&self.0))).into_response()
    }
}

/// `POST /api/commands` - submit a partial envelope.
pub async fn submit_command(
    State(state): State<CommandsAppState>,
    Json(request): Json<crate::domain::command::SubmitRequest>,
) -> Result<Json<CommandState>, ApiError> {
    let state_record = state.service.submit(request)?;
    Ok(Json(state_record))
}

/// `GET /api/commands` - list states, newest first.
pub async fn list_commands(
    State(state): State<CommandsAppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<CommandState>>, ApiError> {
    let filter = query.into_filter()?;
    Ok(Json(state.service.list(&filter)))
}

/// `GET /api/commands/{id}` - lifecycle state of one command.
pub async fn get_command(
    State(state): State<CommandsAppState>,
    Path(command_id): Path<CommandId>,
) -> Result<Json<CommandState>, ApiError> {
    state
        .service
        .get(&command_id)
        .map(Json)
        .ok_or_else(|| ApiError(DomainError::command_not_found(command_id)))
}

/// `POST /api/commands/{id}/cancel` - advisory cancellation.
pub async fn cancel_command(
    State(state): State<CommandsAppState>,
    Path(command_id): Path<CommandId>,
) -> Result<Json<CancelResponse>, ApiError> {
    if state.service.get(&command_id).is_none() {
        return Err(ApiError(DomainError::command_not_found(command_id)));
    }

    let cancelled = state.service.cancel(&command_id);
    Ok(Json(CancelResponse { cancelled }))
}

/// `GET /api/events` - snapshot of retained events after a cursor.
pub async fn events_snapshot(
    State(state): State<CommandsAppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Vec<EventEnvelope>>, ApiError> {
    let cursor = query.cursor();
    let filter = query.into_filter()?;
    Ok(Json(state.bus.events_since(cursor, Some(&filter))))
}
