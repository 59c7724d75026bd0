//! Resilience patterns for fault-tolerant calls to remote dependencies
//!
//! # Available Patterns
//!
//! - **Circuit Breaker**: stops calling a failing dependency once its recent
//!   failure ratio crosses a threshold, then probes recovery with trial
//!   calls after a cooldown.
//!
//! # Example
//!
//! ```rust
//! use note_service::resilience::CircuitBreaker;
//!
//! let cb = CircuitBreaker::new("auth-service".to_string());
//!
//! if let Some(permit) = cb.allow() {
//!     // call the dependency, then report how it went
//!     cb.record_result(permit, true);
//! }
//! ```

mod circuit_breaker;

pub use circuit_breaker::{CallPermit, CircuitBreaker, CircuitBreakerConfig, CircuitState};
