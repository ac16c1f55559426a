//! Telemetry domain - event envelopes, cursors, severities and filters.

mod cursor;
mod envelope;
mod filter;
mod severity;

pub use cursor::{Cursor, ParseCursorError};
pub use envelope::{EmitOptions, EventEnvelope};
pub use filter::EventFilter;
pub use severity::Severity;
