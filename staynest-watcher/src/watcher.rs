/// Cascade-delete watcher
///
/// This module implements the long-lived loop that keeps Memberships
/// consistent with Identity deletions. It subscribes to the store's
/// Identity delete feed and cascades each event to the Membership
/// collection; when the subscription is lost it drops to a degraded mode
/// that sweeps for orphans immediately, then re-subscribes with capped
/// exponential backoff.
///
/// # State machine
///
/// ```text
/// Starting ──subscribe ok──> Listening ──feed error──> Degraded
///     ▲                          │   ▲                     │
///     │                          │   └──resubscribe ok─────┘
///     └── (initial)              └──shutdown──> Stopped
/// ```
///
/// The current state is published on a `tokio::sync::watch` channel so the
/// process (and the tests) can observe transitions without polling logs.
///
/// # Concurrency
///
/// Exactly one watcher runs per process: [`CascadeWatcher::spawn`] consumes
/// the watcher by value, so a second loop over the same instance cannot be
/// started. An event already received when shutdown is requested is still
/// cascaded before the loop exits.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use staynest_shared::store::{DeleteEvent, RecordStore};
use staynest_shared::sweep::{sweep, DEFAULT_PAGE_SIZE};

/// Lifecycle states published by the watcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    /// Not yet subscribed
    Starting,

    /// Subscribed; delete events cascade individually
    Listening,

    /// Subscription lost; orphans are handled by sweeps until the
    /// subscription is re-established
    Degraded,

    /// Shut down; no further transitions
    Stopped,
}

/// Cascade watcher configuration
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Page size for fallback sweeps
    pub sweep_page_size: u32,

    /// First resubscribe delay after losing the feed
    pub backoff_base: Duration,

    /// Upper bound for the resubscribe delay
    pub backoff_cap: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        WatcherConfig {
            sweep_page_size: DEFAULT_PAGE_SIZE,
            backoff_base: Duration::from_millis(500),
            backoff_cap: Duration::from_secs(30),
        }
    }
}

/// Handle to a running watcher
///
/// Holds the state channel and the join handle; dropping the handle does
/// not stop the watcher (shutdown goes through the cancellation token).
pub struct WatcherHandle {
    state_rx: watch::Receiver<WatcherState>,
    task: JoinHandle<()>,
    shutdown: CancellationToken,
}

impl WatcherHandle {
    /// Returns a receiver observing the watcher's state transitions
    pub fn state(&self) -> watch::Receiver<WatcherState> {
        self.state_rx.clone()
    }

    /// Requests shutdown without waiting for it to complete
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Requests shutdown and waits for the loop to exit
    ///
    /// An event already in flight is cascaded before the loop stops.
    pub async fn stop(self) {
        self.shutdown.cancel();
        if let Err(err) = self.task.await {
            tracing::error!(error = %err, "Watcher task panicked");
        }
    }
}

/// The cascade-delete watcher
pub struct CascadeWatcher {
    store: Arc<dyn RecordStore>,
    config: WatcherConfig,
    shutdown: CancellationToken,
}

impl CascadeWatcher {
    /// Creates a watcher with default configuration
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self::with_config(store, WatcherConfig::default())
    }

    /// Creates a watcher with custom configuration
    pub fn with_config(store: Arc<dyn RecordStore>, config: WatcherConfig) -> Self {
        CascadeWatcher {
            store,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Spawns the watcher loop onto the runtime
    pub fn spawn(self) -> WatcherHandle {
        let (state_tx, state_rx) = watch::channel(WatcherState::Starting);
        let shutdown = self.shutdown.clone();
        let task = tokio::spawn(async move {
            self.run(state_tx).await;
        });
        WatcherHandle {
            state_rx,
            task,
            shutdown,
        }
    }

    async fn run(self, state_tx: watch::Sender<WatcherState>) {
        let mut backoff = self.config.backoff_base;

        'subscribe: while !self.shutdown.is_cancelled() {
            let mut feed = match self.store.watch_identity_deletes().await {
                Ok(feed) => feed,
                Err(err) => {
                    tracing::warn!(error = %err, "Failed to subscribe to delete feed");
                    if self.degraded_pause(&state_tx, &mut backoff).await {
                        break 'subscribe;
                    }
                    continue 'subscribe;
                }
            };

            state_tx.send_replace(WatcherState::Listening);
            backoff = self.config.backoff_base;
            tracing::info!("Cascade watcher listening for identity deletes");

            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => break 'subscribe,
                    event = feed.next_event() => match event {
                        // Cascading happens inside the select arm, so an
                        // event received just before shutdown still
                        // completes its delete.
                        Ok(event) => self.cascade(event).await,
                        Err(err) => {
                            tracing::warn!(error = %err, "Delete feed lost");
                            if self.degraded_pause(&state_tx, &mut backoff).await {
                                break 'subscribe;
                            }
                            continue 'subscribe;
                        }
                    }
                }
            }
        }

        state_tx.send_replace(WatcherState::Stopped);
        tracing::info!("Cascade watcher stopped");
    }

    /// Cascades one Identity delete to the Membership collection
    ///
    /// Store failures are logged and skipped; the record is an orphan until
    /// the next sweep, never a watcher crash.
    async fn cascade(&self, event: DeleteEvent) {
        match event.email {
            Some(email) => {
                match self.store.delete_membership_by_email(&email).await {
                    Ok(true) => {
                        tracing::info!(identity_id = %event.id, email, "Cascaded identity delete to membership");
                    }
                    Ok(false) => {
                        tracing::debug!(identity_id = %event.id, email, "Deleted identity had no membership");
                    }
                    Err(err) => {
                        tracing::error!(identity_id = %event.id, email, error = %err, "Cascade delete failed");
                    }
                }
            }
            // The event did not carry the document; without the email there
            // is nothing to target, so sweep the whole collection.
            None => {
                tracing::warn!(identity_id = %event.id, "Delete event carried no email, falling back to sweep");
                self.run_sweep().await;
            }
        }
    }

    /// Enters Degraded, sweeps immediately, then sleeps the current backoff
    ///
    /// Returns `true` when shutdown was requested during the pause.
    async fn degraded_pause(
        &self,
        state_tx: &watch::Sender<WatcherState>,
        backoff: &mut Duration,
    ) -> bool {
        state_tx.send_replace(WatcherState::Degraded);

        // Events may have been missed while the feed was down; catch up
        // before waiting to resubscribe.
        self.run_sweep().await;

        tracing::info!(delay_ms = backoff.as_millis() as u64, "Resubscribing after backoff");
        let cancelled = tokio::select! {
            _ = self.shutdown.cancelled() => true,
            _ = tokio::time::sleep(*backoff) => false,
        };
        *backoff = (*backoff * 2).min(self.config.backoff_cap);
        cancelled
    }

    async fn run_sweep(&self) {
        match sweep(self.store.as_ref(), self.config.sweep_page_size).await {
            Ok(deleted) if deleted > 0 => {
                tracing::info!(deleted, "Fallback sweep removed orphaned memberships");
            }
            Ok(_) => {}
            Err(err) => {
                tracing::error!(error = %err, "Fallback sweep failed");
            }
        }
    }
}

// State-machine and cascade tests are in tests/watcher_tests.rs.
