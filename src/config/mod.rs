pub mod app;
pub mod auth;
pub mod database;
pub mod notes;
pub mod observability;
pub mod outbox;
pub mod resilience;
pub mod server;

use thiserror::Error;

pub use app::{AppConfig, AppMetadata};
pub use auth::AuthConfig;
pub use database::DatabaseConfig;
pub use notes::NotesConfig;
pub use observability::{LogFormat, ObservabilityConfig};
pub use outbox::{OutboxConfig, PublisherConfig, PublisherKind};
pub use resilience::CircuitBreakerConfig;
pub use server::ServerConfig;

/// Configuration loading or validation failure
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Implemented by every configuration section so the whole tree can be
/// checked once after deserialization.
pub trait Validate {
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Load the application configuration from files and environment variables
pub fn load() -> Result<AppConfig, ConfigError> {
    app::load_config()
}
