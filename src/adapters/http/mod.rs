//! HTTP adapters - REST API and router assembly.

pub mod commands;

pub use commands::{command_routes, events_routes, CommandsAppState};

use axum::{routing::get, Json, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::adapters::websocket::{websocket_router, WebSocketState};
use crate::application::AppContext;

/// Assemble the full API router over a running context.
///
/// # Routes
///
/// - `/api/commands/...` - submission, query and cancel
/// - `/api/events` - retained-event snapshot
/// - `/api/events/live` - streaming WebSocket endpoint
/// - `/health` - liveness probe
pub fn api_router(ctx: &AppContext) -> Router {
    let commands_state = CommandsAppState {
        service: ctx.service.clone(),
        bus: ctx.bus.clone(),
    };
    let ws_state = WebSocketState::new(ctx.bus.clone());

    Router::new()
        .nest("/api/commands", command_routes().with_state(commands_state.clone()))
        .nest(
            "/api/events",
            events_routes()
                .with_state(commands_state)
                .merge(websocket_router().with_state(ws_state)),
        )
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// `GET /health` - liveness probe.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::HandlerRegistry;
    use crate::config::AppConfig;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_endpoint_responds_ok() {
        let ctx = AppContext::start(&AppConfig::default(), HandlerRegistry::new());
        let app = api_router(&ctx);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
