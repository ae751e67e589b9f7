//! # StayNest API Server
//!
//! This is the main API server for StayNest, providing:
//!
//! - Account sign-up and deletion
//! - Membership purchase and reconciled status
//! - Profile views that self-repair membership drift
//! - Resolved payment listings
//! - An on-demand orphan sweep for operators
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p staynest-api
//! ```

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use staynest_api::app::{build_router, AppState};
use staynest_api::config::Config;
use staynest_shared::db::migrations::run_migrations;
use staynest_shared::db::pool::{create_pool, PoolConfig};
use staynest_shared::store::{PgStore, RecordStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "staynest_api=info,staynest_shared=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("StayNest API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let pool = create_pool(PoolConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;
    run_migrations(&pool).await?;

    let store: Arc<dyn RecordStore> = Arc::new(PgStore::new(pool));
    let bind_address = config.bind_address();
    let app = build_router(AppState::new(store, config));

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received, draining connections...");
        })
        .await?;

    tracing::info!("Server shut down cleanly");
    Ok(())
}
