use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{ConfigError, Validate};

/// Settings for the circuit breaker guarding the authentication service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Number of most recent outcomes kept in the statistical window
    #[serde(default = "default_record_length")]
    pub record_length: usize,
    /// Minimum time in milliseconds the breaker stays open before a trial call
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Failure ratio over a full window at which the breaker opens
    #[serde(default = "default_percentile")]
    pub percentile: f64,
    /// Consecutive successful trial calls needed to close the breaker again
    #[serde(default = "default_recovery_requests")]
    pub recovery_requests: u32,
}

fn default_record_length() -> usize {
    100
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_percentile() -> f64 {
    0.3
}

fn default_recovery_requests() -> u32 {
    10
}

impl CircuitBreakerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            record_length: default_record_length(),
            timeout_ms: default_timeout_ms(),
            percentile: default_percentile(),
            recovery_requests: default_recovery_requests(),
        }
    }
}

impl Validate for CircuitBreakerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.record_length == 0 {
            return Err(ConfigError::ValidationError(
                "auth.circuit_breaker.record_length must be > 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.percentile) {
            return Err(ConfigError::ValidationError(
                "auth.circuit_breaker.percentile must be within [0.0, 1.0]".to_string(),
            ));
        }
        if self.recovery_requests == 0 {
            return Err(ConfigError::ValidationError(
                "auth.circuit_breaker.recovery_requests must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
