pub mod middleware;

pub use middleware::MetricsMiddleware;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::{Arc, OnceLock};

use crate::entities::v1::notes_outbox::NoteOutboxAction;
use crate::resilience::CircuitState;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

#[derive(Clone)]
pub struct AppMetrics {
    prometheus_handle: Arc<PrometheusHandle>,
}

impl AppMetrics {
    pub fn new() -> Self {
        Self::with_config(None)
    }

    pub fn with_config(config: Option<&crate::config::AppConfig>) -> Self {
        let handle = PROMETHEUS_HANDLE.get_or_init(|| {
            let builder = PrometheusBuilder::new();

            let builder = if let Some(cfg) = config {
                builder
                    .add_global_label("service", cfg.app.name.clone())
                    .add_global_label("version", cfg.app.version.clone())
                    .add_global_label("environment", cfg.app.environment.clone())
            } else {
                builder
            };

            // Bucket overrides only fail on an empty slice.
            let builder = match builder.set_buckets_for_metric(
                Matcher::Full("http_requests_duration_seconds".to_string()),
                &[0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0],
            ) {
                Ok(builder) => builder,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to set histogram buckets");
                    PrometheusBuilder::new()
                }
            };

            let recorder = builder.build_recorder();
            let handle = recorder.handle();
            if let Err(e) = ::metrics::set_global_recorder(recorder) {
                tracing::warn!(error = %e, "Metrics recorder already installed");
            }

            Self::describe_metrics();

            handle
        });

        Self {
            prometheus_handle: Arc::new(handle.clone()),
        }
    }

    fn describe_metrics() {
        // HTTP metrics
        describe_counter!("http_requests_total", "Total number of HTTP requests");
        describe_histogram!(
            "http_requests_duration_seconds",
            "HTTP request duration in seconds"
        );
        describe_gauge!(
            "http_requests_in_flight",
            "Number of HTTP requests currently being processed"
        );

        // Auth metrics
        describe_counter!(
            "auth_requests_total",
            "Token validations by outcome (valid, invalid, transport_error, rejected)"
        );
        describe_gauge!(
            "circuit_breaker_state",
            "Circuit breaker state (0 closed, 1 half-open, 2 open)"
        );
        describe_counter!(
            "circuit_breaker_rejections_total",
            "Calls refused by an open circuit breaker"
        );

        // Outbox metrics
        describe_counter!(
            "outbox_events_written_total",
            "Outbox events written alongside note actions"
        );
        describe_counter!(
            "outbox_events_published_total",
            "Outbox events delivered and marked as sent"
        );
        describe_counter!(
            "outbox_publish_failures_total",
            "Outbox publish attempts that failed and will be retried"
        );
        describe_gauge!(
            "outbox_pending_events",
            "Unsent events seen by the last dispatch cycle"
        );
    }

    // HTTP metrics
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        counter!(
            "http_requests_total",
            "method" => method.to_string(),
            "path" => path.to_string(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            "http_requests_duration_seconds",
            "method" => method.to_string(),
            "path" => path.to_string()
        )
        .record(duration_secs);
    }

    pub fn http_request_start(&self) {
        gauge!("http_requests_in_flight").increment(1.0);
    }

    pub fn http_request_end(&self) {
        gauge!("http_requests_in_flight").decrement(1.0);
    }

    // Auth metrics
    pub fn record_auth_request(&self, outcome: &'static str) {
        counter!("auth_requests_total", "outcome" => outcome).increment(1);
        if outcome == "rejected" {
            counter!("circuit_breaker_rejections_total").increment(1);
        }
    }

    pub fn set_circuit_state(&self, name: &str, state: CircuitState) {
        gauge!("circuit_breaker_state", "name" => name.to_string()).set(state.as_gauge());
    }

    // Outbox metrics
    pub fn record_outbox_written(&self, action: NoteOutboxAction) {
        counter!("outbox_events_written_total", "action" => action.as_str()).increment(1);
    }

    pub fn record_outbox_published(&self, count: u64) {
        counter!("outbox_events_published_total").increment(count);
    }

    pub fn record_outbox_publish_failures(&self, count: u64) {
        counter!("outbox_publish_failures_total").increment(count);
    }

    pub fn set_outbox_pending(&self, count: u64) {
        gauge!("outbox_pending_events").set(count as f64);
    }

    // Prometheus export
    pub fn render(&self) -> String {
        self.prometheus_handle.render()
    }
}

impl Default for AppMetrics {
    fn default() -> Self {
        Self::new()
    }
}
