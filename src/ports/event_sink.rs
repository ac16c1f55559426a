//! EventSink port - delivery capability handed to the event bus.
//!
//! The bus knows nothing about transports; a subscriber registers a sink
//! and the bus calls it once per matching event.

use crate::domain::telemetry::EventEnvelope;

/// Capability to deliver one event to a subscriber.
///
/// Implementations MUST NOT block: the bus delivers synchronously from
/// `emit`, so a sink that waits on I/O would stall every producer. Hand
/// the envelope to a channel or buffer and return. Implementations must
/// also not call back into the bus from `deliver`.
pub trait EventSink: Send + Sync {
    /// Delivers a single event. Failures are the sink's own concern; a
    /// sink whose receiver is gone simply drops the event, and cleanup
    /// happens through `unsubscribe`.
    fn deliver(&self, event: EventEnvelope);
}
