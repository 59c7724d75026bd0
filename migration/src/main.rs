use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    cli::run_cli(note_service_migration::Migrator).await;
}
