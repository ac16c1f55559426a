//! Executor configuration

use serde::Deserialize;

use crate::application::UnknownCommandPolicy;

/// Executor configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecutorConfig {
    /// Policy for command types with no registered handler:
    /// `stub-success` completes them with a stub result, `reject` fails
    /// them.
    #[serde(default)]
    pub unknown_command_policy: UnknownCommandPolicy,
}
