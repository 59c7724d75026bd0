use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{ConfigError, Validate};

/// Outbox dispatcher settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxConfig {
    /// Run the dispatcher inside this process
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Delay in milliseconds between two dispatch cycles
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Deadline in milliseconds for publishing a single event
    #[serde(default = "default_publish_timeout_ms")]
    pub publish_timeout_ms: u64,
    /// Maximum number of events claimed per cycle
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
    /// Claim rows with `FOR UPDATE SKIP LOCKED` so several dispatchers can
    /// share one table. Ignored on backends without row locks.
    #[serde(default = "default_skip_locked")]
    pub skip_locked: bool,
    #[serde(default)]
    pub publisher: PublisherConfig,
}

/// Where dispatched events are delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublisherKind {
    /// Emit every event as a structured log line
    Log,
    /// POST every event to a webhook
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    #[serde(default = "default_publisher_kind")]
    pub kind: PublisherKind,
    /// Webhook URL, required for the `http` publisher
    #[serde(default)]
    pub url: Option<String>,
}

fn default_enabled() -> bool {
    true
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_publish_timeout_ms() -> u64 {
    3000
}

fn default_batch_size() -> u64 {
    100
}

fn default_skip_locked() -> bool {
    true
}

fn default_publisher_kind() -> PublisherKind {
    PublisherKind::Log
}

impl OutboxConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            poll_interval_ms: default_poll_interval_ms(),
            publish_timeout_ms: default_publish_timeout_ms(),
            batch_size: default_batch_size(),
            skip_locked: default_skip_locked(),
            publisher: PublisherConfig::default(),
        }
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            kind: default_publisher_kind(),
            url: None,
        }
    }
}

impl Validate for OutboxConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "outbox.poll_interval_ms must be > 0".to_string(),
            ));
        }
        if self.publish_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "outbox.publish_timeout_ms must be > 0".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "outbox.batch_size must be > 0".to_string(),
            ));
        }
        self.publisher.validate()
    }
}

impl Validate for PublisherConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.kind == PublisherKind::Http
            && self.url.as_deref().is_none_or(|url| url.is_empty())
        {
            return Err(ConfigError::ValidationError(
                "outbox.publisher.url is required for the http publisher".to_string(),
            ));
        }
        Ok(())
    }
}
