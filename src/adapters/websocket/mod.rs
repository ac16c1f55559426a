//! WebSocket adapter - the streaming protocol over the event bus.

mod handler;
mod messages;

pub use handler::{ws_handler, websocket_router, WebSocketState};
pub use messages::{ClientMessage, ServerMessage};
