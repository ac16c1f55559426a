//! CommandStore - lifecycle records, idempotency index and validated
//! transitions, with telemetry emitted on every change.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{json, Map, Value as JsonValue};

use crate::adapters::events::EventBus;
use crate::domain::command::{CommandEnvelope, CommandState, CommandStatus, ListFilter};
use crate::domain::foundation::{CommandId, DomainError, ErrorCode};
use crate::domain::telemetry::{EmitOptions, Severity};

/// Event type emitted for every command lifecycle change.
pub const STATUS_CHANGED: &str = "status.changed";

/// Outcome of [`CommandStore::create`].
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    /// A new record was created and should be queued for execution.
    Created(CommandState),
    /// The idempotency key (or command id) was already known; the
    /// existing record is returned unchanged and must not be re-queued.
    Existing(CommandState),
}

impl CreateOutcome {
    /// The state regardless of which branch was taken.
    pub fn into_state(self) -> CommandState {
        match self {
            CreateOutcome::Created(state) | CreateOutcome::Existing(state) => state,
        }
    }
}

struct CommandRecord {
    envelope: CommandEnvelope,
    state: CommandState,
}

#[derive(Default)]
struct StoreInner {
    records: HashMap<CommandId, CommandRecord>,
    idempotency: HashMap<String, CommandId>,
}

/// Owner of all command lifecycle records for the process lifetime.
///
/// Records are created at submission, mutated only through validated
/// transitions and never deleted; history accumulates until the process
/// exits. Every mutation emits a [`STATUS_CHANGED`] event on the bus.
pub struct CommandStore {
    bus: Arc<EventBus>,
    inner: Mutex<StoreInner>,
}

impl CommandStore {
    /// Creates an empty store emitting to the given bus.
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            bus,
            inner: Mutex::new(StoreInner::default()),
        }
    }

    /// Creates a record for a submitted envelope.
    ///
    /// When the envelope carries an idempotency key that is already
    /// mapped (or a command id that already exists), the existing state
    /// is returned unchanged: at-most-once submission. Otherwise the
    /// record is created with status `CREATED` and the idempotency
    /// mapping is registered in the same locked step.
    pub fn create(&self, envelope: CommandEnvelope) -> CreateOutcome {
        let pending;
        let state = {
            let mut inner = self.inner.lock().expect("CommandStore: lock poisoned");

            if let Some(key) = &envelope.idempotency_key {
                if let Some(existing_id) = inner.idempotency.get(key) {
                    let existing = inner.records[existing_id].state.clone();
                    tracing::debug!(
                        command_id = %existing.command_id,
                        idempotency_key = %key,
                        "duplicate submission deduplicated"
                    );
                    return CreateOutcome::Existing(existing);
                }
            }
            if let Some(record) = inner.records.get(&envelope.command_id) {
                return CreateOutcome::Existing(record.state.clone());
            }

            let state = CommandState::new(envelope.command_id);
            if let Some(key) = &envelope.idempotency_key {
                inner.idempotency.insert(key.clone(), envelope.command_id);
            }

            pending = status_event(&envelope, &state, None);
            inner.records.insert(
                envelope.command_id,
                CommandRecord {
                    envelope,
                    state: state.clone(),
                },
            );
            state
        };

        self.emit(pending);
        CreateOutcome::Created(state)
    }

    /// Applies a validated transition and emits the change.
    pub fn transition(
        &self,
        command_id: &CommandId,
        status: CommandStatus,
        result: Option<Map<String, JsonValue>>,
        error: Option<String>,
    ) -> Result<CommandState, DomainError> {
        let (state, pending) = {
            let mut inner = self.inner.lock().expect("CommandStore: lock poisoned");
            let record = inner
                .records
                .get_mut(command_id)
                .ok_or_else(|| DomainError::command_not_found(command_id))?;

            let previous = record.state.status;
            record
                .state
                .apply(status, result, error)
                .map_err(|err| DomainError::new(ErrorCode::InvalidStateTransition, err.to_string()))?;

            (
                record.state.clone(),
                status_event(&record.envelope, &record.state, Some(previous)),
            )
        };

        self.emit(pending);
        Ok(state)
    }

    /// Cancels a command when it has not yet reached a terminal status.
    ///
    /// Advisory only: a `RUNNING` command's in-flight work is not
    /// interrupted, its recorded status just flips. Returns whether the
    /// cancellation took effect.
    pub fn cancel(&self, command_id: &CommandId) -> bool {
        let pending = {
            let mut inner = self.inner.lock().expect("CommandStore: lock poisoned");
            let Some(record) = inner.records.get_mut(command_id) else {
                return false;
            };
            if record.state.status.is_terminal_status() {
                return false;
            }

            let previous = record.state.status;
            record
                .state
                .apply(CommandStatus::Cancelled, None, None)
                .expect("cancellation is valid from every non-terminal status");

            status_event(&record.envelope, &record.state, Some(previous))
        };

        self.emit(pending);
        true
    }

    /// Looks up the lifecycle state of a command.
    pub fn get(&self, command_id: &CommandId) -> Option<CommandState> {
        let inner = self.inner.lock().expect("CommandStore: lock poisoned");
        inner.records.get(command_id).map(|r| r.state.clone())
    }

    /// Looks up the immutable envelope of a command.
    pub fn envelope(&self, command_id: &CommandId) -> Option<CommandEnvelope> {
        let inner = self.inner.lock().expect("CommandStore: lock poisoned");
        inner.records.get(command_id).map(|r| r.envelope.clone())
    }

    /// Returns matching states, newest first.
    pub fn list(&self, filter: &ListFilter) -> Vec<CommandState> {
        let inner = self.inner.lock().expect("CommandStore: lock poisoned");
        let mut states: Vec<CommandState> = inner
            .records
            .values()
            .filter(|r| filter.matches(&r.state, &r.envelope.command_type))
            .map(|r| r.state.clone())
            .collect();
        states.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        states
    }

    /// Number of records held (test and diagnostics helper).
    pub fn count(&self) -> usize {
        self.inner
            .lock()
            .expect("CommandStore: lock poisoned")
            .records
            .len()
    }

    fn emit(&self, pending: PendingEvent) {
        self.bus
            .emit(STATUS_CHANGED, pending.payload, pending.options);
    }
}

struct PendingEvent {
    payload: JsonValue,
    options: EmitOptions,
}

fn status_event(
    envelope: &CommandEnvelope,
    state: &CommandState,
    previous: Option<CommandStatus>,
) -> PendingEvent {
    let mut payload = json!({
        "command_id": state.command_id,
        "type": envelope.command_type,
        "status": state.status,
    });
    if let Some(previous) = previous {
        payload["previous_status"] = json!(previous);
    }
    if let Some(error) = &state.error {
        payload["error"] = json!(error);
    }

    let severity = if state.status == CommandStatus::Failed {
        Severity::Error
    } else {
        Severity::Info
    };

    let mut options = EmitOptions::severity(severity).with_command_id(state.command_id);
    if let Some(correlation_id) = &envelope.correlation_id {
        options = options.with_correlation_id(correlation_id.clone());
    }
    if let Some(target) = &envelope.target {
        options = options.with_target(target.clone());
    }

    PendingEvent { payload, options }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::command::SubmitRequest;
    use crate::domain::telemetry::EventFilter;

    fn store() -> (Arc<EventBus>, CommandStore) {
        let bus = Arc::new(EventBus::with_default_capacity());
        let store = CommandStore::new(bus.clone());
        (bus, store)
    }

    fn envelope(request: SubmitRequest) -> CommandEnvelope {
        CommandEnvelope::from_request(request).unwrap()
    }

    fn status_events(bus: &EventBus) -> Vec<String> {
        bus.events_since(None, None)
            .iter()
            .map(|e| e.payload["status"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn create_returns_created_state_and_emits() {
        let (bus, store) = store();

        let outcome = store.create(envelope(SubmitRequest::of_type("sync")));
        let state = outcome.into_state();

        assert_eq!(state.status, CommandStatus::Created);
        assert_eq!(status_events(&bus), vec!["CREATED"]);
    }

    #[test]
    fn create_with_same_idempotency_key_returns_existing_unchanged() {
        let (bus, store) = store();

        let first = store
            .create(envelope(
                SubmitRequest::of_type("sync").with_idempotency_key("job-1"),
            ))
            .into_state();
        let second = store.create(envelope(
            SubmitRequest::of_type("sync").with_idempotency_key("job-1"),
        ));

        match second {
            CreateOutcome::Existing(state) => {
                assert_eq!(state.command_id, first.command_id);
            }
            CreateOutcome::Created(_) => panic!("expected deduplicated submission"),
        }

        assert_eq!(store.count(), 1);
        // Only the first submission produced an event.
        assert_eq!(bus.events_since(None, None).len(), 1);
    }

    #[test]
    fn transition_emits_status_changed_with_previous_status() {
        let (bus, store) = store();
        let state = store
            .create(envelope(SubmitRequest::of_type("sync")))
            .into_state();

        store
            .transition(&state.command_id, CommandStatus::Queued, None, None)
            .unwrap();

        let events = bus.events_since(None, None);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].event_type, STATUS_CHANGED);
        assert_eq!(events[1].payload["status"], "QUEUED");
        assert_eq!(events[1].payload["previous_status"], "CREATED");
        assert_eq!(events[1].command_id, Some(state.command_id));
    }

    #[test]
    fn failed_transition_emits_error_severity() {
        let (bus, store) = store();
        let state = store
            .create(envelope(SubmitRequest::of_type("sync")))
            .into_state();
        let id = state.command_id;

        store.transition(&id, CommandStatus::Queued, None, None).unwrap();
        store.transition(&id, CommandStatus::Running, None, None).unwrap();
        store
            .transition(&id, CommandStatus::Failed, None, Some("boom".to_string()))
            .unwrap();

        let errors = bus.events_since(
            None,
            Some(&EventFilter::match_all().with_severity(vec![Severity::Error])),
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].payload["status"], "FAILED");
        assert_eq!(errors[0].payload["error"], "boom");
    }

    #[test]
    fn transition_on_unknown_command_fails() {
        let (_bus, store) = store();
        let result = store.transition(&CommandId::new(), CommandStatus::Queued, None, None);

        assert!(matches!(
            result,
            Err(DomainError {
                code: ErrorCode::CommandNotFound,
                ..
            })
        ));
    }

    #[test]
    fn second_terminal_transition_is_rejected() {
        let (_bus, store) = store();
        let id = store
            .create(envelope(SubmitRequest::of_type("sync")))
            .into_state()
            .command_id;

        store.transition(&id, CommandStatus::Queued, None, None).unwrap();
        store.transition(&id, CommandStatus::Running, None, None).unwrap();
        store
            .transition(&id, CommandStatus::Succeeded, None, None)
            .unwrap();

        let result = store.transition(&id, CommandStatus::Failed, None, None);
        assert!(matches!(
            result,
            Err(DomainError {
                code: ErrorCode::InvalidStateTransition,
                ..
            })
        ));
    }

    #[test]
    fn cancel_created_command_succeeds() {
        let (_bus, store) = store();
        let id = store
            .create(envelope(SubmitRequest::of_type("sync")))
            .into_state()
            .command_id;

        assert!(store.cancel(&id));
        assert_eq!(store.get(&id).unwrap().status, CommandStatus::Cancelled);
    }

    #[test]
    fn cancel_succeeded_command_is_rejected_without_mutation() {
        let (_bus, store) = store();
        let id = store
            .create(envelope(SubmitRequest::of_type("sync")))
            .into_state()
            .command_id;

        store.transition(&id, CommandStatus::Queued, None, None).unwrap();
        store.transition(&id, CommandStatus::Running, None, None).unwrap();
        store
            .transition(&id, CommandStatus::Succeeded, None, None)
            .unwrap();

        assert!(!store.cancel(&id));
        assert_eq!(store.get(&id).unwrap().status, CommandStatus::Succeeded);
    }

    #[test]
    fn cancel_unknown_command_returns_false() {
        let (_bus, store) = store();
        assert!(!store.cancel(&CommandId::new()));
    }

    #[test]
    fn list_filters_by_status_and_type() {
        let (_bus, store) = store();

        let sync = store
            .create(envelope(SubmitRequest::of_type("sync")))
            .into_state()
            .command_id;
        store
            .create(envelope(SubmitRequest::of_type("export")))
            .into_state();
        store.transition(&sync, CommandStatus::Queued, None, None).unwrap();

        let queued = store.list(&ListFilter {
            status: Some(CommandStatus::Queued),
            ..ListFilter::default()
        });
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].command_id, sync);

        let exports = store.list(&ListFilter {
            command_type: Some("export".to_string()),
            ..ListFilter::default()
        });
        assert_eq!(exports.len(), 1);
    }

    #[test]
    fn list_returns_newest_first() {
        let (_bus, store) = store();

        let first = store
            .create(envelope(SubmitRequest::of_type("a")))
            .into_state()
            .command_id;
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = store
            .create(envelope(SubmitRequest::of_type("b")))
            .into_state()
            .command_id;

        let all = store.list(&ListFilter::default());
        assert_eq!(all[0].command_id, second);
        assert_eq!(all[1].command_id, first);
    }

    #[test]
    fn get_unknown_command_returns_none() {
        let (_bus, store) = store();
        assert!(store.get(&CommandId::new()).is_none());
    }
}
