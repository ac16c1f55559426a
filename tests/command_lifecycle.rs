//! End-to-end lifecycle tests: submission through terminal status, with
//! the telemetry stream observed the way a connected client would.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map};

use conductor::application::{AppContext, HandlerRegistry, STATUS_CHANGED};
use conductor::config::AppConfig;
use conductor::domain::command::{CommandEnvelope, CommandStatus, ListFilter, SubmitRequest};
use conductor::domain::foundation::{CommandId, DomainError};
use conductor::domain::telemetry::{EmitOptions, EventEnvelope, EventFilter};
use conductor::ports::{CommandContext, CommandHandler, EventSink};

#[derive(Default)]
struct CollectingSink {
    events: Mutex<Vec<EventEnvelope>>,
}

impl CollectingSink {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn received(&self) -> Vec<EventEnvelope> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for CollectingSink {
    fn deliver(&self, event: EventEnvelope) {
        self.events.lock().unwrap().push(event);
    }
}

async fn wait_for_terminal(ctx: &AppContext, command_id: &CommandId) -> CommandStatus {
    for _ in 0..200 {
        if let Some(state) = ctx.store.get(command_id) {
            if state.status.is_terminal_status() {
                return state.status;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("command {} never reached a terminal status", command_id);
}

fn statuses_for(events: &[EventEnvelope], command_id: &CommandId) -> Vec<String> {
    events
        .iter()
        .filter(|e| e.command_id.as_ref() == Some(command_id))
        .map(|e| e.payload["status"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn usage_check_runs_through_the_full_status_sequence() {
    let ctx = AppContext::start(&AppConfig::default(), HandlerRegistry::new());

    // Observe status changes the way a streaming client would.
    let sink = CollectingSink::new();
    ctx.bus.subscribe(
        sink.clone(),
        EventFilter::match_all().with_event_types([STATUS_CHANGED]),
        None,
    );

    let submitted = ctx
        .service
        .submit(SubmitRequest::of_type("usage.check"))
        .unwrap();
    let status = wait_for_terminal(&ctx, &submitted.command_id).await;
    assert_eq!(status, CommandStatus::Succeeded);

    let final_state = ctx.store.get(&submitted.command_id).unwrap();
    assert!(!final_state.result.unwrap().is_empty());
    assert!(final_state.started_at.is_some());
    assert!(final_state.completed_at.is_some());

    // Exactly one event per transition, in lifecycle order.
    assert_eq!(
        statuses_for(&sink.received(), &submitted.command_id),
        vec!["CREATED", "QUEUED", "RUNNING", "SUCCEEDED"]
    );
}

struct ScrapeHandler;

#[async_trait]
impl CommandHandler for ScrapeHandler {
    async fn handle(
        &self,
        envelope: &CommandEnvelope,
        ctx: &dyn CommandContext,
    ) -> Result<(), DomainError> {
        for page in 1..=2 {
            ctx.emit(
                "worker.progress",
                json!({"page": page, "total": 2}),
                EmitOptions::default().with_command_id(envelope.command_id),
            );
        }

        let mut result = Map::new();
        result.insert("pages".to_string(), json!(2));
        ctx.succeed(&envelope.command_id, result)
    }

    fn name(&self) -> &'static str {
        "ScrapeHandler"
    }
}

#[tokio::test]
async fn registered_handler_reports_progress_and_owns_its_terminal_transition() {
    let mut registry = HandlerRegistry::new();
    registry.register("pages.scrape", Arc::new(ScrapeHandler));
    let ctx = AppContext::start(&AppConfig::default(), registry);

    let sink = CollectingSink::new();
    ctx.bus
        .subscribe(sink.clone(), EventFilter::match_all(), None);

    let submitted = ctx
        .service
        .submit(SubmitRequest::of_type("pages.scrape"))
        .unwrap();
    let status = wait_for_terminal(&ctx, &submitted.command_id).await;
    assert_eq!(status, CommandStatus::Succeeded);

    let state = ctx.store.get(&submitted.command_id).unwrap();
    assert_eq!(state.result.unwrap()["pages"], json!(2));

    // Progress events land between RUNNING and SUCCEEDED in cursor order.
    let events = sink.received();
    let position = |event_type: &str, status: Option<&str>| {
        events
            .iter()
            .position(|e| {
                e.event_type == event_type
                    && status.map_or(true, |s| e.payload["status"] == s)
            })
            .unwrap()
    };
    let running = position(STATUS_CHANGED, Some("RUNNING"));
    let progress = position("worker.progress", None);
    let succeeded = position(STATUS_CHANGED, Some("SUCCEEDED"));
    assert!(running < progress && progress < succeeded);

    // Cursors across the whole observed stream are strictly increasing.
    for pair in events.windows(2) {
        assert!(pair[0].cursor < pair[1].cursor);
    }
}

struct BrokenHandler;

#[async_trait]
impl CommandHandler for BrokenHandler {
    async fn handle(
        &self,
        _envelope: &CommandEnvelope,
        _ctx: &dyn CommandContext,
    ) -> Result<(), DomainError> {
        Err(DomainError::new(
            conductor::domain::foundation::ErrorCode::InternalError,
            "browser session crashed",
        ))
    }

    fn name(&self) -> &'static str {
        "BrokenHandler"
    }
}

#[tokio::test]
async fn failing_handler_is_recorded_and_queue_keeps_draining() {
    let mut registry = HandlerRegistry::new();
    registry.register("broken", Arc::new(BrokenHandler));
    let ctx = AppContext::start(&AppConfig::default(), registry);

    let failing = ctx.service.submit(SubmitRequest::of_type("broken")).unwrap();
    let following = ctx
        .service
        .submit(SubmitRequest::of_type("usage.check"))
        .unwrap();

    assert_eq!(
        wait_for_terminal(&ctx, &failing.command_id).await,
        CommandStatus::Failed
    );
    assert_eq!(
        wait_for_terminal(&ctx, &following.command_id).await,
        CommandStatus::Succeeded
    );

    let failed = ctx.store.get(&failing.command_id).unwrap();
    assert!(failed.error.unwrap().contains("browser session crashed"));
}

#[tokio::test]
async fn commands_execute_strictly_in_submission_order() {
    struct OrderedHandler {
        order: Arc<Mutex<Vec<CommandId>>>,
    }

    #[async_trait]
    impl CommandHandler for OrderedHandler {
        async fn handle(
            &self,
            envelope: &CommandEnvelope,
            ctx: &dyn CommandContext,
        ) -> Result<(), DomainError> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.order.lock().unwrap().push(envelope.command_id);
            ctx.succeed(&envelope.command_id, Map::new())
        }

        fn name(&self) -> &'static str {
            "OrderedHandler"
        }
    }

    let order = Arc::new(Mutex::new(Vec::new()));
    let mut registry = HandlerRegistry::new();
    registry.register("job", Arc::new(OrderedHandler { order: order.clone() }));
    let ctx = AppContext::start(&AppConfig::default(), registry);

    let sink = CollectingSink::new();
    ctx.bus.subscribe(
        sink.clone(),
        EventFilter::match_all().with_event_types([STATUS_CHANGED]),
        None,
    );

    let first = ctx.service.submit(SubmitRequest::of_type("job")).unwrap();
    let second = ctx.service.submit(SubmitRequest::of_type("job")).unwrap();

    wait_for_terminal(&ctx, &second.command_id).await;

    assert_eq!(
        order.lock().unwrap().as_slice(),
        &[first.command_id, second.command_id]
    );

    // The second command never started before the first reached its
    // terminal status.
    let events = sink.received();
    let first_terminal = events
        .iter()
        .position(|e| {
            e.command_id == Some(first.command_id) && e.payload["status"] == "SUCCEEDED"
        })
        .unwrap();
    let second_running = events
        .iter()
        .position(|e| {
            e.command_id == Some(second.command_id) && e.payload["status"] == "RUNNING"
        })
        .unwrap();
    assert!(first_terminal < second_running);
}

#[tokio::test]
async fn duplicate_idempotency_key_yields_one_command_and_one_execution() {
    let ctx = AppContext::start(&AppConfig::default(), HandlerRegistry::new());

    let first = ctx
        .service
        .submit(SubmitRequest::of_type("usage.check").with_idempotency_key("req-1"))
        .unwrap();
    let second = ctx
        .service
        .submit(SubmitRequest::of_type("usage.check").with_idempotency_key("req-1"))
        .unwrap();

    assert_eq!(first.command_id, second.command_id);
    wait_for_terminal(&ctx, &first.command_id).await;

    // One record, one lifecycle: no duplicate terminal events.
    assert_eq!(ctx.service.list(&ListFilter::default()).len(), 1);
    let terminal_events = ctx
        .bus
        .events_since(None, None)
        .into_iter()
        .filter(|e| {
            e.command_id == Some(first.command_id) && e.payload["status"] == "SUCCEEDED"
        })
        .count();
    assert_eq!(terminal_events, 1);
}

#[tokio::test]
async fn cancel_before_start_prevents_execution() {
    // No executor draining the queue here, so the command deterministically
    // sits in QUEUED while we cancel it.
    use conductor::adapters::events::EventBus;
    use conductor::application::{CommandService, CommandStore};

    let bus = Arc::new(EventBus::with_default_capacity());
    let store = Arc::new(CommandStore::new(bus.clone()));
    let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
    let service = CommandService::new(store.clone(), tx);

    let submitted = service.submit(SubmitRequest::of_type("job")).unwrap();
    assert_eq!(submitted.status, CommandStatus::Queued);

    assert!(service.cancel(&submitted.command_id));
    let state = store.get(&submitted.command_id).unwrap();
    assert_eq!(state.status, CommandStatus::Cancelled);
    assert!(state.started_at.is_none());

    // A second cancel (now terminal) reports no effect and changes nothing.
    assert!(!service.cancel(&submitted.command_id));
    assert_eq!(
        store.get(&submitted.command_id).unwrap().status,
        CommandStatus::Cancelled
    );
}

#[tokio::test]
async fn cancel_on_succeeded_command_returns_false() {
    let ctx = AppContext::start(&AppConfig::default(), HandlerRegistry::new());

    let submitted = ctx
        .service
        .submit(SubmitRequest::of_type("usage.check"))
        .unwrap();
    wait_for_terminal(&ctx, &submitted.command_id).await;

    assert!(!ctx.service.cancel(&submitted.command_id));
    assert_eq!(
        ctx.store.get(&submitted.command_id).unwrap().status,
        CommandStatus::Succeeded
    );
}
