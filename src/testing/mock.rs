//! In-process stand-ins for the authentication service and the event sink.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::auth::{AuthServiceClient, RemoteUser, TransportError, ValidateTokenReply, ValidateTokenRequest};
use crate::models::v1::User;
use crate::outbox::{OutboxMessage, PublishError, Publisher};

/// Scripted answer of [`MockAuthClient`] for one token
#[derive(Debug, Clone)]
pub enum MockReply {
    Valid(User),
    Invalid,
    /// `valid: true` without a user, which the gateway treats as malformed
    ValidWithoutUser,
    Fail(TransportError),
    /// Never completes
    Hang,
}

/// Authentication client answering from a token table
///
/// Unknown tokens are answered as invalid.
#[derive(Debug, Default)]
pub struct MockAuthClient {
    replies: Mutex<HashMap<String, MockReply>>,
    calls: AtomicUsize,
}

impl MockAuthClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, token: impl Into<String>, reply: MockReply) -> Self {
        self.set_reply(token, reply);
        self
    }

    /// Replace the scripted answer for a token, e.g. to bring the service back
    pub fn set_reply(&self, token: impl Into<String>, reply: MockReply) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.into(), reply);
    }

    /// Number of calls that reached the client
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait(?Send)]
impl AuthServiceClient for MockAuthClient {
    async fn validate_token(
        &self,
        request: ValidateTokenRequest,
    ) -> Result<ValidateTokenReply, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let reply = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&request.token)
            .cloned()
            .unwrap_or(MockReply::Invalid);

        match reply {
            MockReply::Valid(user) => Ok(ValidateTokenReply {
                valid: true,
                user: Some(RemoteUser {
                    id: user.id,
                    username: user.username,
                }),
            }),
            MockReply::Invalid => Ok(ValidateTokenReply {
                valid: false,
                user: None,
            }),
            MockReply::ValidWithoutUser => Ok(ValidateTokenReply {
                valid: true,
                user: None,
            }),
            MockReply::Fail(err) => Err(err),
            MockReply::Hang => std::future::pending().await,
        }
    }
}

/// Publisher that keeps every delivered message in memory
///
/// Failures can be queued with [`RecordingPublisher::fail_next`]; each queued
/// failure is consumed by one publish attempt.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<OutboxMessage>>,
    failures: Mutex<VecDeque<PublishError>>,
    hang: std::sync::atomic::AtomicBool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, times: usize) {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        for _ in 0..times {
            failures.push_back(PublishError::Rejected("scripted failure".to_string()));
        }
    }

    /// Make every following publish attempt hang
    pub fn hang(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<OutboxMessage> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait(?Send)]
impl Publisher for RecordingPublisher {
    async fn publish(&self, message: &OutboxMessage) -> Result<(), PublishError> {
        if self.hang.load(Ordering::SeqCst) {
            return std::future::pending().await;
        }

        let failure = self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        if let Some(err) = failure {
            return Err(err);
        }

        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.clone());
        Ok(())
    }
}
