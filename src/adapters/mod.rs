//! Adapters - infrastructure implementations at the edges of the core.

pub mod events;
pub mod http;
pub mod websocket;
