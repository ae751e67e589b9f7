/// Database connection pool management
///
/// PostgreSQL pool setup via sqlx with two bounds that together keep all
/// store I/O bounded: `acquire_timeout_seconds` caps how long a call waits
/// for a connection, and `statement_timeout_seconds` is set on every
/// connection so a slow or lock-blocked query is cancelled server-side
/// instead of stalling the caller indefinitely.
///
/// # Example
///
/// ```no_run
/// use staynest_shared::db::pool::{create_pool, PoolConfig};
///
/// # async fn example() -> Result<(), sqlx::Error> {
/// let config = PoolConfig {
///     url: std::env::var("DATABASE_URL").unwrap(),
///     ..Default::default()
/// };
/// let pool = create_pool(config).await?;
/// # Ok(())
/// # }
/// ```

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Connection pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of idle connections to keep warm
    pub min_connections: u32,

    /// Timeout for acquiring a connection (seconds)
    pub acquire_timeout_seconds: u64,

    /// Server-side `statement_timeout` applied to every connection
    /// (seconds); bounds query execution itself
    pub statement_timeout_seconds: u64,

    /// How long a connection may stay idle before being closed (seconds)
    pub idle_timeout_seconds: Option<u64>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 2,
            acquire_timeout_seconds: 30,
            statement_timeout_seconds: 30,
            idle_timeout_seconds: Some(600),
        }
    }
}

/// Creates a PostgreSQL connection pool and verifies connectivity
///
/// # Errors
///
/// Returns an error if the URL is invalid, the database is unreachable, or
/// the post-connect health check fails.
pub async fn create_pool(config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    info!(
        max_connections = config.max_connections,
        acquire_timeout_seconds = config.acquire_timeout_seconds,
        statement_timeout_seconds = config.statement_timeout_seconds,
        "Creating database connection pool"
    );

    let connect = PgConnectOptions::from_str(&config.url)?
        .options([("statement_timeout", statement_timeout_value(&config))]);

    let mut options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds));

    if let Some(idle) = config.idle_timeout_seconds {
        options = options.idle_timeout(Duration::from_secs(idle));
    }

    let pool = options.connect_with(connect).await?;
    health_check(&pool).await?;

    info!("Database connection pool ready");
    Ok(pool)
}

/// Postgres duration literal for the per-connection statement timeout
fn statement_timeout_value(config: &PoolConfig) -> String {
    format!("{}s", config.statement_timeout_seconds)
}

/// Verifies the database is reachable
pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    debug!("Performing database health check");
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Gracefully closes the pool during shutdown
pub async fn close_pool(pool: PgPool) {
    info!("Closing database connection pool");
    pool.close().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_config_default() {
        let config = PoolConfig::default();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.acquire_timeout_seconds, 30);
        assert_eq!(config.statement_timeout_seconds, 30);
        assert_eq!(config.idle_timeout_seconds, Some(600));
    }

    #[test]
    fn test_statement_timeout_literal() {
        let config = PoolConfig {
            statement_timeout_seconds: 45,
            ..Default::default()
        };
        assert_eq!(statement_timeout_value(&config), "45s");
    }

    // Integration tests require a running database.
}
