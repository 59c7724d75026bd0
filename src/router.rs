use actix_web::web::{Data, ServiceConfig};
use actix_web::{get, HttpResponse};
use sea_orm::DatabaseConnection;
use utoipa::OpenApi;

use crate::api::Definition;
use crate::auth::AuthGateway;
use crate::config::NotesConfig;
use crate::controllers;
use crate::metrics::AppMetrics;
use crate::outbox::OutboxWriter;

/// Shared handles every worker registers as app data
///
/// Cloning shares the pool, the gateway and its breaker.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub gateway: AuthGateway,
    pub writer: OutboxWriter,
    pub notes: NotesConfig,
    pub metrics: AppMetrics,
}

impl AppState {
    pub fn configure(&self, app: &mut ServiceConfig) {
        app.app_data(Data::new(self.db.clone()));
        app.app_data(Data::new(self.gateway.clone()));
        app.app_data(Data::new(self.writer.clone()));
        app.app_data(Data::new(self.notes.clone()));
        app.app_data(Data::new(self.metrics.clone()));
        route(app);
    }
}

pub fn route(app: &mut ServiceConfig) {
    // Note
    app.service(controllers::v1::note::create);
    app.service(controllers::v1::note::read);
    app.service(controllers::v1::note::update);
    app.service(controllers::v1::note::delete);
    app.service(controllers::v1::note::search);

    // Health check endpoint
    app.service(controllers::health::health);

    // Metrics endpoint
    app.service(controllers::metrics::metrics);

    app.service(openapi);
}

#[get("/api.json")]
pub async fn openapi() -> HttpResponse {
    HttpResponse::Ok().json(Definition::openapi())
}
