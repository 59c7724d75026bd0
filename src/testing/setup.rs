use note_service_migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use crate::models::v1::User;

/// Returns an in-memory SQLite database with all migrations applied
///
/// Every call opens a separate database. The pool holds a single connection,
/// so a test must commit or drop its transaction before using `db` again.
///
/// # Panics
/// Panics if the connection or a migration fails.
pub async fn database() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options)
        .await
        .expect("Failed to connect to in-memory database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

/// The user every mock token resolves to unless a test scripts another
pub fn user() -> User {
    User::new("user-1", "JohnDoe")
}
