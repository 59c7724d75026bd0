use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{CircuitBreakerConfig, ConfigError, Validate};

/// Connection settings for the external authentication service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Base address of the authentication service, e.g. `http://localhost:5000`
    #[serde(default = "default_address")]
    pub address: String,
    /// Deadline in milliseconds for a single token validation call
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Circuit breaker wrapped around every validation call
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
}

fn default_address() -> String {
    "http://localhost:5000".to_string()
}

fn default_request_timeout_ms() -> u64 {
    2000
}

impl AuthConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            request_timeout_ms: default_request_timeout_ms(),
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

impl Validate for AuthConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.address.is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.address cannot be empty".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "auth.request_timeout_ms must be > 0".to_string(),
            ));
        }
        self.circuit_breaker.validate()?;
        Ok(())
    }
}
