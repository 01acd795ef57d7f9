//! Schema migrations.
//!
//! Migrations are embedded from `./migrations` and applied before the server starts
//! serving requests. Startup aborts when they fail or drift is detected.

use rocket_db_pools::sqlx::{self, PgPool, migrate::Migrator};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Apply pending migrations.
///
/// Idempotent: already applied migrations are skipped after their checksums are verified.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    log::info!("checking database migration state");

    MIGRATOR.run(pool).await?;

    log::info!("database migrations up to date");
    Ok(())
}

/// Revert every migration, then apply them again.
///
/// **WARNING**: drops all archived messages. Intended for development databases.
pub async fn reset_database(pool: &PgPool) -> Result<(), sqlx::Error> {
    log::info!("resetting database schema");

    MIGRATOR.undo(pool, 0).await?;
    MIGRATOR.run(pool).await?;

    log::info!("database schema recreated via migrations");
    Ok(())
}
