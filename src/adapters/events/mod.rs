//! Event adapters - the in-memory bus backing the telemetry plane.

mod bus;

pub use bus::{EventBus, DEFAULT_EVENT_BUFFER_CAPACITY};
