//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment
//! variables using the `config` and `dotenvy` crates. Configuration is
//! loaded with the `CONDUCTOR_` prefix and nested values use double
//! underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use conductor::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {}", config.server.socket_addr());
//! ```

mod error;
mod executor;
mod server;
mod telemetry;

pub use error::{ConfigError, ValidationError};
pub use executor::ExecutorConfig;
pub use server::{Environment, ServerConfig};
pub use telemetry::TelemetryConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Telemetry configuration (event retention)
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Executor configuration (unknown-command policy)
    #[serde(default)]
    pub executor: ExecutorConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with the `CONDUCTOR` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// For example `CONDUCTOR_SERVER__PORT=9000` sets `server.port`.
    pub fn load() -> Result<Self, ConfigError> {
        // Best-effort: a missing .env file is not an error
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("CONDUCTOR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Validate every configuration section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.telemetry.validate()?;
        Ok(())
    }
}
