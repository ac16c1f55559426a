//! Telemetry plane configuration

use serde::Deserialize;

use crate::adapters::events::DEFAULT_EVENT_BUFFER_CAPACITY;

use super::error::ValidationError;

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Number of events retained for replay. Older events are evicted;
    /// clients whose cursor falls off the window simply resume from its
    /// beginning.
    #[serde(default = "default_event_buffer_capacity")]
    pub event_buffer_capacity: usize,
}

impl TelemetryConfig {
    /// Validate telemetry configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.event_buffer_capacity == 0 {
            return Err(ValidationError::InvalidEventBufferCapacity);
        }
        Ok(())
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            event_buffer_capacity: default_event_buffer_capacity(),
        }
    }
}

fn default_event_buffer_capacity() -> usize {
    DEFAULT_EVENT_BUFFER_CAPACITY
}
