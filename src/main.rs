use std::sync::Arc;

use actix_web::{App, HttpServer};
use anyhow::Context;

use note_service::outbox::publisher;
use note_service::resilience::CircuitBreakerConfig;
use note_service::{
    config, database, observability, AppMetrics, AppState, AuthGateway, CircuitBreaker,
    HttpAuthClient, MetricsMiddleware, OutboxDispatcher, OutboxWriter,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = config::load().context("Failed to load configuration")?;

    observability::init(&config.observability);

    tracing::info!(
        name = %config.app.name,
        version = %config.app.version,
        environment = %config.app.environment,
        "Starting"
    );

    let db = database::connect(&config.database)
        .await
        .context("Failed to initialise database")?;

    let metrics = AppMetrics::with_config(Some(&config));

    let breaker = CircuitBreaker::with_config(
        "auth".to_string(),
        CircuitBreakerConfig::from(&config.auth.circuit_breaker),
    );
    let client = Arc::new(HttpAuthClient::from_config(&config.auth));
    let gateway = AuthGateway::new(client, breaker, config.auth.request_timeout())
        .with_metrics(metrics.clone());

    let writer = OutboxWriter::new().with_metrics(metrics.clone());

    let dispatcher = if config.outbox.enabled {
        let publisher =
            publisher::from_config(&config.outbox.publisher, config.outbox.publish_timeout());
        let dispatcher = OutboxDispatcher::new(db.clone(), writer.clone(), publisher, &config.outbox)
            .with_metrics(metrics.clone());
        Some(dispatcher.spawn())
    } else {
        tracing::info!("Outbox dispatcher disabled");
        None
    };

    let state = AppState {
        db,
        gateway,
        writer,
        notes: config.notes.clone(),
        metrics,
    };

    let mut server = HttpServer::new(move || {
        let state = state.clone();
        App::new()
            .wrap(MetricsMiddleware::new(state.metrics.clone()))
            .configure(move |app| state.configure(app))
    })
    .shutdown_timeout(config.app.shutdown_timeout);

    if config.server.workers > 0 {
        server = server.workers(config.server.workers);
    }

    let address = (config.server.host.as_str(), config.server.port);
    tracing::info!(host = %address.0, port = address.1, "Listening");

    let result = server
        .bind(address)
        .with_context(|| format!("Failed to bind {}:{}", address.0, address.1))?
        .run()
        .await;

    if let Some(dispatcher) = dispatcher {
        dispatcher.stop().await;
    }

    result.context("HTTP server failed")
}
