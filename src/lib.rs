pub mod api;
pub mod auth;
pub mod config;
pub mod controllers;
pub mod database;
pub mod entities;
pub mod errors;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod observability;
pub mod outbox;
pub mod requests;
pub mod resilience;
pub mod responses;
pub mod router;
pub mod services;

// Testing utilities (always available for integration tests)
pub mod testing;

// Re-export commonly used types for convenience
pub use auth::{AuthError, AuthGateway, AuthServiceClient, HttpAuthClient};
pub use metrics::{AppMetrics, MetricsMiddleware};
pub use middlewares::v1::auth::Auth;
pub use outbox::{OutboxDispatcher, OutboxWriter, Publisher};
pub use resilience::{CircuitBreaker, CircuitState};
pub use router::AppState;
