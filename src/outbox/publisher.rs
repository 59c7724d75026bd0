use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use awc::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::{PublisherConfig, PublisherKind};
use crate::entities::v1::notes_outbox::NoteOutboxAction;

use super::OutboxEvent;

/// Envelope delivered for every outbox event
///
/// Consumers de-duplicate on `event_id`, delivery is at-least-once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxMessage {
    pub event_id: Uuid,
    pub action: NoteOutboxAction,
    pub user_id: String,
    pub note_id: Uuid,
    /// False for `read` and `search`
    pub mutating: bool,
}

impl From<&OutboxEvent> for OutboxMessage {
    fn from(event: &OutboxEvent) -> Self {
        Self {
            event_id: event.event_id,
            action: event.action,
            user_id: event.user_id.clone(),
            note_id: event.note_id,
            mutating: event.action.is_mutating(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error("publish request failed: {0}")]
    Request(String),

    #[error("sink answered with status {0}")]
    Status(u16),

    #[error("sink rejected the event: {0}")]
    Rejected(String),

    #[error("publish deadline of {0:?} exceeded")]
    Timeout(Duration),
}

/// Delivers outbox events to the outside world
///
/// `Ok(())` means the sink acknowledged the event and it may be marked sent.
#[async_trait(?Send)]
pub trait Publisher: Send + Sync {
    async fn publish(&self, message: &OutboxMessage) -> Result<(), PublishError>;
}

/// Emits every event as a structured log line
#[derive(Debug, Clone, Default)]
pub struct LogPublisher;

#[async_trait(?Send)]
impl Publisher for LogPublisher {
    async fn publish(&self, message: &OutboxMessage) -> Result<(), PublishError> {
        tracing::info!(
            target: "outbox",
            event_id = %message.event_id,
            action = %message.action,
            user_id = %message.user_id,
            note_id = %message.note_id,
            mutating = message.mutating,
            "Note event"
        );
        Ok(())
    }
}

/// POSTs the JSON envelope to a webhook, any 2xx is an acknowledgement
#[derive(Debug, Clone)]
pub struct HttpPublisher {
    url: String,
    timeout: Duration,
}

impl HttpPublisher {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait(?Send)]
impl Publisher for HttpPublisher {
    async fn publish(&self, message: &OutboxMessage) -> Result<(), PublishError> {
        let response = Client::new()
            .post(&self.url)
            .timeout(self.timeout)
            .send_json(message)
            .await
            .map_err(|e| PublishError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::Status(status.as_u16()));
        }

        Ok(())
    }
}

/// Build the configured publisher
pub fn from_config(config: &PublisherConfig, timeout: Duration) -> Arc<dyn Publisher> {
    match (config.kind, config.url.as_deref()) {
        (PublisherKind::Http, Some(url)) => Arc::new(HttpPublisher::new(url, timeout)),
        (PublisherKind::Http, None) => {
            tracing::warn!("HTTP publisher configured without url, falling back to log publisher");
            Arc::new(LogPublisher)
        }
        (PublisherKind::Log, _) => Arc::new(LogPublisher),
    }
}
