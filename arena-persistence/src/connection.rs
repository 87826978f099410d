use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection, DbErr};

/// Connect to the configured database and bring the schema up to
/// date. Used once at startup.
pub async fn connect_and_migrate() -> Result<DatabaseConnection, DbErr> {
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://arena.db?mode=rwc".to_string());

    let db = Database::connect(&database_url).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

pub async fn connect_to_memory_database() -> Result<DatabaseConnection, DbErr> {
    Database::connect("sqlite::memory:").await
}
