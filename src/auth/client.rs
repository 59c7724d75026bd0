use std::time::Duration;

use async_trait::async_trait;
use awc::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AuthConfig;

/// Wire request for token validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateTokenRequest {
    pub token: String,
}

/// Identity fields returned for a valid token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteUser {
    pub id: String,
    pub username: String,
}

/// Wire response for token validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateTokenReply {
    pub valid: bool,
    #[serde(default)]
    pub user: Option<RemoteUser>,
}

/// The remote call was attempted but produced no usable answer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("deadline of {0:?} exceeded")]
    Timeout(Duration),

    #[error("call cancelled before completion")]
    Cancelled,
}

/// Transport to the authentication service.
///
/// Implementations only move bytes. Breaker bookkeeping and result mapping
/// live in [`AuthGateway`](super::AuthGateway).
#[async_trait(?Send)]
pub trait AuthServiceClient: Send + Sync {
    async fn validate_token(
        &self,
        request: ValidateTokenRequest,
    ) -> Result<ValidateTokenReply, TransportError>;
}

/// JSON-over-HTTP client posting to `{address}/validate`
#[derive(Debug, Clone)]
pub struct HttpAuthClient {
    endpoint: String,
    timeout: Duration,
}

impl HttpAuthClient {
    pub fn new(address: &str, timeout: Duration) -> Self {
        Self {
            endpoint: format!("{}/validate", address.trim_end_matches('/')),
            timeout,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.address, config.request_timeout())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait(?Send)]
impl AuthServiceClient for HttpAuthClient {
    async fn validate_token(
        &self,
        request: ValidateTokenRequest,
    ) -> Result<ValidateTokenReply, TransportError> {
        // awc clients are not Send, so one is built per call like the
        // request extractors do.
        let mut response = Client::new()
            .post(&self.endpoint)
            .timeout(self.timeout)
            .send_json(&request)
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        response
            .json::<ValidateTokenReply>()
            .await
            .map_err(|e| TransportError::Malformed(e.to_string()))
    }
}
