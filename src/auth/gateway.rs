use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::metrics::AppMetrics;
use crate::models::v1::User;
use crate::resilience::{CallPermit, CircuitBreaker};

use super::client::{AuthServiceClient, TransportError, ValidateTokenReply, ValidateTokenRequest};

/// Domain-level answer to "is this token valid?"
///
/// `valid: false` is a normal result, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidateTokenResponse {
    pub valid: bool,
    pub user: Option<User>,
}

impl ValidateTokenResponse {
    pub fn valid(user: User) -> Self {
        Self {
            valid: true,
            user: Some(user),
        }
    }

    pub fn invalid() -> Self {
        Self {
            valid: false,
            user: None,
        }
    }
}

/// The token could not be checked. Distinct from a checked-and-rejected token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The breaker is open, no remote call was attempted
    #[error("Authentication service unavailable: circuit breaker {name} is open")]
    Unavailable { name: String },

    /// The remote call was attempted and failed
    #[error("Authentication service call failed: {0}")]
    Transport(#[from] TransportError),
}

/// Reports exactly one outcome to the breaker for an admitted call.
///
/// Dropping it unreported counts as a failure, which covers callers that
/// abandon the future mid-call.
struct AdmittedCall<'a> {
    breaker: &'a CircuitBreaker,
    permit: CallPermit,
    reported: bool,
}

impl<'a> AdmittedCall<'a> {
    fn new(breaker: &'a CircuitBreaker, permit: CallPermit) -> Self {
        Self {
            breaker,
            permit,
            reported: false,
        }
    }

    fn report(mut self, success: bool) {
        self.reported = true;
        self.breaker.record_result(self.permit, success);
    }
}

impl Drop for AdmittedCall<'_> {
    fn drop(&mut self) {
        if !self.reported {
            tracing::warn!(
                circuit_breaker = %self.breaker.name(),
                error = %TransportError::Cancelled,
                "Authentication call abandoned, recording failure"
            );
            self.breaker.record_result(self.permit, false);
        }
    }
}

/// Circuit-breaker guarded front of the authentication service
///
/// Cloning is cheap and every clone shares the same client and breaker.
#[derive(Clone)]
pub struct AuthGateway {
    client: Arc<dyn AuthServiceClient>,
    breaker: CircuitBreaker,
    request_timeout: Duration,
    metrics: Option<AppMetrics>,
}

impl AuthGateway {
    pub fn new(
        client: Arc<dyn AuthServiceClient>,
        breaker: CircuitBreaker,
        request_timeout: Duration,
    ) -> Self {
        Self {
            client,
            breaker,
            request_timeout,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: AppMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Validate a bearer token against the authentication service.
    ///
    /// Fails fast with [`AuthError::Unavailable`] while the breaker refuses
    /// calls, without touching breaker state. Any other call reports exactly
    /// one outcome: success whenever the service produced a well-formed
    /// answer, whatever the verdict on the token, and failure otherwise.
    #[tracing::instrument(skip(self, token), fields(circuit_breaker = %self.breaker.name()))]
    pub async fn validate_token(&self, token: &str) -> Result<ValidateTokenResponse, AuthError> {
        let Some(permit) = self.breaker.allow() else {
            self.observe("rejected");
            return Err(AuthError::Unavailable {
                name: self.breaker.name().to_string(),
            });
        };

        let call = AdmittedCall::new(&self.breaker, permit);
        let request = ValidateTokenRequest {
            token: token.to_string(),
        };

        let reply = match tokio::time::timeout(self.request_timeout, self.client.validate_token(request)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => {
                call.report(false);
                return Err(self.transport_failure(err));
            }
            Err(_) => {
                call.report(false);
                return Err(self.transport_failure(TransportError::Timeout(self.request_timeout)));
            }
        };

        match into_response(reply) {
            Ok(response) => {
                call.report(true);
                self.observe(if response.valid { "valid" } else { "invalid" });
                tracing::debug!(valid = response.valid, "Token validated");
                Ok(response)
            }
            Err(err) => {
                call.report(false);
                Err(self.transport_failure(err))
            }
        }
    }

    fn transport_failure(&self, err: TransportError) -> AuthError {
        tracing::warn!(
            error = %err,
            circuit_state = %self.breaker.state(),
            "Authentication service call failed"
        );
        self.observe("transport_error");
        AuthError::Transport(err)
    }

    fn observe(&self, outcome: &'static str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_auth_request(outcome);
            metrics.set_circuit_state(self.breaker.name(), self.breaker.state());
        }
    }
}

fn into_response(reply: ValidateTokenReply) -> Result<ValidateTokenResponse, TransportError> {
    match (reply.valid, reply.user) {
        (false, _) => Ok(ValidateTokenResponse::invalid()),
        (true, Some(user)) => Ok(ValidateTokenResponse::valid(User::new(user.id, user.username))),
        (true, None) => Err(TransportError::Malformed(
            "valid token reply without user".to_string(),
        )),
    }
}
