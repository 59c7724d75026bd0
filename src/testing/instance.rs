use std::sync::Arc;
use std::time::Duration;

use sea_orm::DatabaseConnection;

use crate::auth::AuthGateway;
use crate::config::NotesConfig;
use crate::metrics::AppMetrics;
use crate::outbox::OutboxWriter;
use crate::resilience::{CircuitBreaker, CircuitBreakerConfig};
use crate::router::AppState;

use super::mock::{MockAuthClient, MockReply};
use super::setup;

/// Token the default mock client accepts for [`setup::user`]
pub const TOKEN: &str = "token";

/// Fully wired application state backed by in-memory storage and a scripted
/// authentication client
pub struct Instance {
    pub client: Arc<MockAuthClient>,
    pub state: AppState,
}

impl Instance {
    pub async fn new() -> Self {
        Self::with_breaker(CircuitBreakerConfig::default()).await
    }

    pub async fn with_breaker(config: CircuitBreakerConfig) -> Self {
        let client = Arc::new(MockAuthClient::new().reply(TOKEN, MockReply::Valid(setup::user())));
        Self::build(setup::database().await, client, config)
    }

    pub fn build(
        db: DatabaseConnection,
        client: Arc<MockAuthClient>,
        config: CircuitBreakerConfig,
    ) -> Self {
        let metrics = AppMetrics::new();
        let breaker = CircuitBreaker::with_config("auth".to_string(), config);
        let gateway = AuthGateway::new(client.clone(), breaker, Duration::from_millis(500))
            .with_metrics(metrics.clone());

        Self {
            client,
            state: AppState {
                db,
                gateway,
                writer: OutboxWriter::new().with_metrics(metrics.clone()),
                notes: NotesConfig::default(),
                metrics,
            },
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.state.db
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        self.state.gateway.breaker()
    }
}

/// Build an actix test service from an [`Instance`]
///
/// Evaluates to `(service, instance)`. Without arguments a fresh default
/// instance is used.
#[macro_export]
macro_rules! service {
    () => {{
        let instance = $crate::testing::instance::Instance::new().await;
        $crate::service!(instance)
    }};
    ($instance:expr) => {{
        let instance = $instance;
        let state = instance.state.clone();
        let app = ::actix_web::App::new()
            .wrap($crate::metrics::MetricsMiddleware::new(state.metrics.clone()))
            .configure(move |app| state.configure(app));

        let service = ::actix_web::test::init_service(app).await;

        (service, instance)
    }};
}
