/// Periodic sweep scheduler
///
/// Deployments whose store cannot produce a change feed get no cascade
/// watcher; this scheduler is their consistency mechanism, running the
/// orphan sweep on a fixed interval. It is also harmless alongside the
/// watcher, since the sweep is idempotent.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use staynest_shared::store::RecordStore;
use staynest_shared::sweep::sweep;

/// Runs the orphan sweep on a fixed interval until cancelled
pub struct SweepScheduler {
    store: Arc<dyn RecordStore>,
    interval: Duration,
    page_size: u32,
    shutdown: CancellationToken,
}

impl SweepScheduler {
    pub fn new(
        store: Arc<dyn RecordStore>,
        interval: Duration,
        page_size: u32,
        shutdown: CancellationToken,
    ) -> Self {
        SweepScheduler {
            store,
            interval,
            page_size,
            shutdown,
        }
    }

    /// Spawns the scheduler loop onto the runtime
    ///
    /// The first sweep runs after one full interval, not at startup; the
    /// watcher binary already sweeps at boot.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of a tokio interval fires immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        match sweep(self.store.as_ref(), self.page_size).await {
                            Ok(deleted) if deleted > 0 => {
                                tracing::info!(deleted, "Scheduled sweep removed orphaned memberships");
                            }
                            Ok(_) => {
                                tracing::debug!("Scheduled sweep found nothing to delete");
                            }
                            Err(err) => {
                                tracing::error!(error = %err, "Scheduled sweep failed");
                            }
                        }
                    }
                }
            }
            tracing::info!("Sweep scheduler stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use staynest_shared::models::{Membership, PlanTier};
    use staynest_shared::store::{MemoryStore, RecordStore};

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_sweeps_on_interval() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_membership(&Membership::new(
                "orphan@example.com",
                "Orphan",
                PlanTier::Silver,
                5_000,
                "card",
                serde_json::json!({}),
            ))
            .await
            .unwrap();

        let shutdown = CancellationToken::new();
        let handle = SweepScheduler::new(
            store.clone(),
            Duration::from_secs(60),
            100,
            shutdown.clone(),
        )
        .spawn();

        // Before the interval elapses the orphan is untouched.
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(store
            .find_membership_by_email("orphan@example.com")
            .await
            .unwrap()
            .is_some());

        tokio::time::sleep(Duration::from_secs(40)).await;
        assert!(store
            .find_membership_by_email("orphan@example.com")
            .await
            .unwrap()
            .is_none());

        shutdown.cancel();
        handle.await.unwrap();
    }
}
