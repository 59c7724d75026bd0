//! Health check endpoint

use actix_web::web::Data;
use actix_web::{get, HttpResponse};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::AuthGateway;

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `healthy` when the database answers
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    /// Database connection status
    pub database: String,
    /// State of the breaker guarding the authentication service
    pub auth_circuit: String,
}

/// Service health
///
/// Reports database connectivity and the authentication breaker state. An
/// open breaker does not make the service unhealthy.
#[utoipa::path(
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Database unavailable", body = HealthResponse),
    )
)]
#[get("/health")]
pub async fn health(db: Data<DatabaseConnection>, gateway: Data<AuthGateway>) -> HttpResponse {
    let connected = db.ping().await.is_ok();

    let response = HealthResponse {
        status: if connected { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        database: if connected { "connected" } else { "disconnected" }.to_string(),
        auth_circuit: gateway.breaker().state().to_string(),
    };

    tracing::debug!(status = %response.status, auth_circuit = %response.auth_circuit, "Health check");

    if connected {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}
