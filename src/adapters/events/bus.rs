//! In-memory event bus with a bounded log and cursor-based replay.
//!
//! The bus owns three things behind one lock: the ring buffer of recent
//! events, the monotonic cursor counter, and the subscriber registry.
//! Keeping them under a single lock makes a replaying `subscribe` atomic
//! with respect to `emit`, which is what rules out gaps and duplicates at
//! the replay/live boundary.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::domain::foundation::{EventId, SubscriberId, Timestamp};
use crate::domain::telemetry::{Cursor, EmitOptions, EventEnvelope, EventFilter};
use crate::ports::EventSink;

/// Default number of events retained in the ring buffer.
pub const DEFAULT_EVENT_BUFFER_CAPACITY: usize = 10_000;

struct SubscriberEntry {
    filter: EventFilter,
    cursor: Option<Cursor>,
    sink: Arc<dyn EventSink>,
}

struct BusInner {
    buffer: VecDeque<EventEnvelope>,
    capacity: usize,
    next_sequence: u64,
    last_cursor: Option<Cursor>,
    subscribers: HashMap<SubscriberId, SubscriberEntry>,
}

impl BusInner {
    fn mint_cursor(&mut self) -> Cursor {
        let cursor = Cursor::from_sequence(self.next_sequence);
        self.next_sequence += 1;
        cursor
    }
}

/// Append-only, bounded, in-memory telemetry log with filtered pub/sub.
///
/// `emit` is synchronous with respect to its caller: the event is
/// appended and every matching subscriber's sink has been invoked before
/// `emit` returns. Sinks are required to be non-blocking (see
/// [`EventSink`]); delivery is an enqueue, not a network round trip.
pub struct EventBus {
    inner: Mutex<BusInner>,
}

impl EventBus {
    /// Creates a bus retaining up to `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(BusInner {
                buffer: VecDeque::with_capacity(capacity.min(1024)),
                capacity,
                next_sequence: 1,
                last_cursor: None,
                subscribers: HashMap::new(),
            }),
        }
    }

    /// Creates a bus with the default retention window.
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_CAPACITY)
    }

    /// Appends an event and delivers it to every matching subscriber.
    ///
    /// Returns the cursor minted for the event. Eviction at capacity
    /// drops the oldest entry only; it never disturbs cursor ordering or
    /// uniqueness, just the retained window.
    pub fn emit(
        &self,
        event_type: impl Into<String>,
        payload: serde_json::Value,
        options: EmitOptions,
    ) -> Cursor {
        let mut inner = self.inner.lock().expect("EventBus: lock poisoned");

        let cursor = inner.mint_cursor();
        let envelope = EventEnvelope {
            event_id: EventId::new(),
            cursor,
            emitted_at: Timestamp::now(),
            severity: options.severity,
            event_type: event_type.into(),
            command_id: options.command_id,
            correlation_id: options.correlation_id,
            target: options.target,
            payload,
        };

        if inner.buffer.len() >= inner.capacity {
            inner.buffer.pop_front();
        }
        inner.buffer.push_back(envelope.clone());
        inner.last_cursor = Some(cursor);

        for entry in inner.subscribers.values_mut() {
            if entry.filter.matches(&envelope) {
                entry.sink.deliver(envelope.clone());
                entry.cursor = Some(cursor);
            }
        }

        tracing::trace!(
            cursor = %cursor,
            event_type = %envelope.event_type,
            severity = %envelope.severity,
            "event emitted"
        );

        cursor
    }

    /// Registers a subscriber and returns its id.
    ///
    /// With a `from` cursor, every retained matching event with a cursor
    /// strictly greater is delivered first, in cursor order. Replay and
    /// registration happen under the bus lock as one step, so an `emit`
    /// racing with this call is either fully before the replay (and
    /// included in it) or fully after registration (and delivered live) -
    /// never lost, never duplicated.
    pub fn subscribe(
        &self,
        sink: Arc<dyn EventSink>,
        filter: EventFilter,
        from: Option<Cursor>,
    ) -> SubscriberId {
        let mut inner = self.inner.lock().expect("EventBus: lock poisoned");
        let id = SubscriberId::new();

        let mut delivered_up_to = from;
        if let Some(from) = from {
            for event in inner
                .buffer
                .iter()
                .filter(|e| e.cursor > from && filter.matches(e))
            {
                sink.deliver(event.clone());
                delivered_up_to = Some(event.cursor);
            }
        }

        inner.subscribers.insert(
            id,
            SubscriberEntry {
                filter,
                cursor: delivered_up_to,
                sink,
            },
        );

        tracing::debug!(subscriber_id = %id, replayed_from = ?from, "subscriber registered");
        id
    }

    /// Removes a subscriber; a no-op for unknown ids.
    pub fn unsubscribe(&self, id: SubscriberId) {
        let mut inner = self.inner.lock().expect("EventBus: lock poisoned");
        if inner.subscribers.remove(&id).is_some() {
            tracing::debug!(subscriber_id = %id, "subscriber removed");
        }
    }

    /// Returns retained events with cursor strictly greater than `after`.
    ///
    /// An absent cursor (including one that parsed from a token older
    /// than the retained window) means "from the beginning of the
    /// retained window".
    pub fn events_since(
        &self,
        after: Option<Cursor>,
        filter: Option<&EventFilter>,
    ) -> Vec<EventEnvelope> {
        let inner = self.inner.lock().expect("EventBus: lock poisoned");
        inner
            .buffer
            .iter()
            .filter(|e| after.map_or(true, |after| e.cursor > after))
            .filter(|e| filter.map_or(true, |f| f.matches(e)))
            .cloned()
            .collect()
    }

    /// Cursor of the most recently emitted event, or a freshly minted one
    /// when the log is empty.
    ///
    /// Handing a client this value gives it a starting point with nothing
    /// to replay: every later event's cursor is strictly greater.
    pub fn current_cursor(&self) -> Cursor {
        let mut inner = self.inner.lock().expect("EventBus: lock poisoned");
        match inner.last_cursor {
            Some(cursor) => cursor,
            None => inner.mint_cursor(),
        }
    }

    /// Number of retained events (test and diagnostics helper).
    pub fn event_count(&self) -> usize {
        self.inner.lock().expect("EventBus: lock poisoned").buffer.len()
    }

    /// Number of registered subscribers (test and diagnostics helper).
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .lock()
            .expect("EventBus: lock poisoned")
            .subscribers
            .len()
    }

    /// Last cursor delivered to a subscriber, or `None` when nothing has
    /// been delivered yet (or the id is unknown).
    pub fn subscriber_cursor(&self, id: SubscriberId) -> Option<Cursor> {
        self.inner
            .lock()
            .expect("EventBus: lock poisoned")
            .subscribers
            .get(&id)
            .and_then(|entry| entry.cursor)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}
