/// Database migration runner
///
/// Migrations live in the crate's `migrations/` directory and are embedded
/// at compile time via `sqlx::migrate!`. The initial migration creates the
/// three collections plus the `AFTER DELETE` trigger on `identities` that
/// feeds the cascade watcher's LISTEN/NOTIFY subscription.

use sqlx::postgres::PgPool;
use tracing::{info, warn};

/// Runs all pending migrations
///
/// Both binaries call this on startup, so either one can bring up a fresh
/// database.
///
/// # Errors
///
/// Returns an error if a migration fails to apply; a failed migration is
/// rolled back.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Running database migrations");

    match sqlx::migrate!("./migrations").run(pool).await {
        Ok(()) => {
            info!("Database migrations up to date");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Migration failed");
            Err(e)
        }
    }
}
