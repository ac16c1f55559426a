//! Explicit application context wiring the core together at startup.
//!
//! There are no process-wide singletons: the bus, store and service are
//! constructed here, injected where needed, and dropped on shutdown.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::adapters::events::EventBus;
use crate::config::AppConfig;

use super::commands::{CommandExecutor, CommandService, CommandStore, HandlerRegistry};

/// The running core: event bus, command store and submission service.
///
/// [`AppContext::start`] also spawns the executor worker; the worker ends
/// once every clone of the service (and with it the queue sender) is
/// dropped.
pub struct AppContext {
    pub bus: Arc<EventBus>,
    pub store: Arc<CommandStore>,
    pub service: Arc<CommandService>,
}

impl AppContext {
    /// Builds the core from configuration and a handler table, and spawns
    /// the executor worker. Must be called from within a tokio runtime.
    pub fn start(config: &AppConfig, registry: HandlerRegistry) -> Self {
        let bus = Arc::new(EventBus::new(config.telemetry.event_buffer_capacity));
        let store = Arc::new(CommandStore::new(bus.clone()));

        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        CommandExecutor::new(
            store.clone(),
            bus.clone(),
            registry,
            config.executor.unknown_command_policy,
        )
        .spawn(queue_rx);

        let service = Arc::new(CommandService::new(store.clone(), queue_tx));

        tracing::info!(
            event_buffer_capacity = config.telemetry.event_buffer_capacity,
            "application context started"
        );

        Self { bus, store, service }
    }
}
