//! Ports - interfaces between the core and the outside world.
//!
//! Following hexagonal architecture, ports define the contracts the core
//! exposes to collaborators. Adapters and the application layer implement
//! them.
//!
//! - `EventSink` - delivery capability handed to the event bus per
//!   subscriber; keeps the bus free of transport dependencies
//! - `CommandHandler` / `CommandContext` - the worker seam: external jobs
//!   run behind `CommandHandler` and report outcomes through
//!   `CommandContext`

mod command_handler;
mod event_sink;

pub use command_handler::{CommandContext, CommandHandler};
pub use event_sink::EventSink;
