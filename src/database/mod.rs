//! Database connection setup

use note_service_migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use thiserror::Error;

use crate::config::DatabaseConfig;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(#[source] DbErr),

    #[error("Database migration failed: {0}")]
    MigrationError(#[source] DbErr),
}

/// Open the connection pool and apply pending migrations when configured
#[tracing::instrument(skip(config), fields(max_connections = config.max_connections))]
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DatabaseError> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout())
        .sqlx_logging(false);

    // Every pooled connection to `sqlite::memory:` is its own database
    if config.url.contains(":memory:") {
        options.max_connections(1).min_connections(1);
    }

    let db = Database::connect(options)
        .await
        .map_err(DatabaseError::ConnectionError)?;

    tracing::info!("Database connected");

    if config.run_migrations {
        Migrator::up(&db, None)
            .await
            .map_err(DatabaseError::MigrationError)?;
        tracing::info!("Database migrations applied");
    }

    Ok(db)
}
