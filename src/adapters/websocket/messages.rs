//! Streaming protocol messages.
//!
//! Control frames in both directions are JSON objects tagged by `type`.
//! Event envelopes are sent raw (one per message); their `type` field
//! holds an event type string such as `"status.changed"`, which is how
//! clients tell them apart from control frames.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;
use crate::domain::telemetry::{Cursor, EventFilter};

// ============================================
// Server → Client Messages
// ============================================

/// Control frames sent from server to client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection established; carries a starting cursor with nothing to
    /// replay behind it.
    Connected { cursor: Cursor },

    /// Subscription registered (after any requested replay).
    Subscribed { cursor: Cursor },

    /// Heartbeat response, Unix milliseconds.
    Pong { timestamp: i64 },

    /// The last client frame could not be handled; the connection stays
    /// open.
    Error { message: String },
}

impl ServerMessage {
    /// Builds an error frame.
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    /// Builds a pong frame stamped with the current time.
    pub fn pong_now() -> Self {
        ServerMessage::Pong {
            timestamp: Timestamp::now().as_unix_millis(),
        }
    }
}

// ============================================
// Client → Server Messages
// ============================================

/// Control frames accepted from clients.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start (or replace) this connection's subscription. An optional
    /// cursor requests replay of retained events after it; optional
    /// filters narrow delivery.
    Subscribe {
        cursor: Option<Cursor>,
        filters: Option<EventFilter>,
    },

    /// Drop this connection's subscription, if any.
    Unsubscribe,

    /// Heartbeat request.
    Ping,
}
