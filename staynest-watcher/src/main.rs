//! # StayNest Watcher
//!
//! This is the consistency daemon for StayNest. It keeps the Membership
//! collection consistent with Identity deletions by:
//!
//! - Subscribing to Identity delete events and cascading each one to the
//!   Membership collection
//! - Falling back to full orphan sweeps when the subscription degrades
//! - Running a periodic sweep when the store has no change feed at all
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p staynest-watcher
//! ```

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use staynest_shared::db::migrations::run_migrations;
use staynest_shared::db::pool::{close_pool, create_pool, PoolConfig};
use staynest_shared::store::{PgStore, RecordStore};
use staynest_shared::sweep::sweep;
use staynest_watcher::config::Config;
use staynest_watcher::scheduler::SweepScheduler;
use staynest_watcher::watcher::CascadeWatcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "staynest_watcher=info,staynest_shared=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("StayNest Watcher v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let pool = create_pool(PoolConfig {
        url: config.database_url.clone(),
        ..Default::default()
    })
    .await?;
    run_migrations(&pool).await?;

    let store: Arc<dyn RecordStore> = Arc::new(PgStore::new(pool.clone()));

    // Catch up on anything deleted while the watcher was down.
    match sweep(store.as_ref(), config.sweep_page_size).await {
        Ok(deleted) => tracing::info!(deleted, "Startup sweep complete"),
        Err(err) => tracing::error!(error = %err, "Startup sweep failed"),
    }

    let shutdown = CancellationToken::new();

    let watcher_handle = if config.change_feed_enabled && store.supports_change_feed() {
        let watcher = CascadeWatcher::with_config(store.clone(), config.watcher_config());
        Some(watcher.spawn())
    } else {
        tracing::warn!("Change feed disabled or unsupported; relying on scheduled sweeps only");
        None
    };

    let scheduler_handle = SweepScheduler::new(
        store.clone(),
        config.sweep_interval,
        config.sweep_page_size,
        shutdown.clone(),
    )
    .spawn();

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, stopping...");

    shutdown.cancel();
    if let Some(handle) = watcher_handle {
        handle.stop().await;
    }
    if let Err(err) = scheduler_handle.await {
        tracing::error!(error = %err, "Scheduler task panicked");
    }

    close_pool(pool).await;
    tracing::info!("Watcher shut down cleanly");

    Ok(())
}
