/// Integration tests for the cascade watcher state machine
///
/// Runs entirely against the in-memory store; no external services needed.
/// Run with: cargo test --test watcher_tests

use std::sync::Arc;
use std::time::Duration;

use staynest_shared::models::{Identity, Membership, PlanTier};
use staynest_shared::store::{MemoryStore, RecordStore};
use staynest_watcher::watcher::{CascadeWatcher, WatcherConfig, WatcherState};

const WAIT: Duration = Duration::from_secs(5);

/// Backoff tuned for tests: long enough that the Degraded state is
/// observable on the watch channel, short enough that recovery lands well
/// inside the wait budget
fn test_config() -> WatcherConfig {
    WatcherConfig {
        sweep_page_size: 10,
        backoff_base: Duration::from_millis(200),
        backoff_cap: Duration::from_millis(400),
    }
}

async fn seed_member(store: &MemoryStore, email: &str) -> Identity {
    let mut identity = Identity::new(email, "Member", "hash");
    identity.is_member = true;
    store.insert_identity(&identity).await.unwrap();
    store
        .insert_membership(&Membership::new(
            email,
            "Member",
            PlanTier::Gold,
            10_000,
            "card",
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    identity
}

async fn wait_for_state(
    rx: &mut tokio::sync::watch::Receiver<WatcherState>,
    target: WatcherState,
) {
    tokio::time::timeout(WAIT, rx.wait_for(|s| *s == target))
        .await
        .unwrap_or_else(|_| panic!("Timed out waiting for {target:?}"))
        .unwrap();
}

/// Polls until the membership disappears, or panics after the wait budget
async fn wait_for_membership_gone(store: &MemoryStore, email: &str) {
    tokio::time::timeout(WAIT, async {
        loop {
            if store
                .find_membership_by_email(email)
                .await
                .unwrap()
                .is_none()
            {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("Membership for {email} was never cascade-deleted"));
}

#[tokio::test]
async fn test_delete_event_cascades_to_membership() {
    let store = Arc::new(MemoryStore::new());
    let identity = seed_member(&store, "alice@example.com").await;

    let handle = CascadeWatcher::with_config(store.clone(), test_config()).spawn();
    let mut state = handle.state();
    wait_for_state(&mut state, WatcherState::Listening).await;

    assert!(store.delete_identity(identity.id).await.unwrap());
    wait_for_membership_gone(&store, "alice@example.com").await;

    handle.stop().await;
}

#[tokio::test]
async fn test_event_without_email_triggers_sweep_fallback() {
    let store = Arc::new(MemoryStore::new());
    let alice = seed_member(&store, "alice@example.com").await;
    // A second orphan the targeted cascade could never have reached; only
    // the fallback sweep removes it.
    store
        .insert_membership(&Membership::new(
            "stray@example.com",
            "Stray",
            PlanTier::Silver,
            5_000,
            "card",
            serde_json::json!({}),
        ))
        .await
        .unwrap();

    // Events carry only the id from now on.
    store.set_lossy_feed(true);

    let handle = CascadeWatcher::with_config(store.clone(), test_config()).spawn();
    let mut state = handle.state();
    wait_for_state(&mut state, WatcherState::Listening).await;

    assert!(store.delete_identity(alice.id).await.unwrap());
    wait_for_membership_gone(&store, "alice@example.com").await;
    wait_for_membership_gone(&store, "stray@example.com").await;

    handle.stop().await;
}

#[tokio::test]
async fn test_lost_feed_degrades_sweeps_and_recovers() {
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

    let handle = CascadeWatcher::with_config(store.clone(), test_config()).spawn();
    let mut state = handle.state();
    wait_for_state(&mut state, WatcherState::Listening).await;

    store.invalidate_feed();
    wait_for_state(&mut state, WatcherState::Degraded).await;

    // Degraded mode sweeps immediately, then resubscribes after backoff.
    wait_for_membership_gone(&store, "orphan@example.com").await;
    wait_for_state(&mut state, WatcherState::Listening).await;

    // The re-established subscription cascades again.
    let identity = seed_member(&store, "bob@example.com").await;
    assert!(store.delete_identity(identity.id).await.unwrap());
    wait_for_membership_gone(&store, "bob@example.com").await;

    handle.stop().await;
}

#[tokio::test]
async fn test_shutdown_publishes_stopped() {
    let store = Arc::new(MemoryStore::new());

    let handle = CascadeWatcher::with_config(store.clone(), test_config()).spawn();
    let mut state = handle.state();
    wait_for_state(&mut state, WatcherState::Listening).await;

    handle.shutdown();
    wait_for_state(&mut state, WatcherState::Stopped).await;
}

#[tokio::test]
async fn test_stop_waits_for_loop_exit() {
    let store = Arc::new(MemoryStore::new());

    let handle = CascadeWatcher::with_config(store.clone(), test_config()).spawn();
    let state = handle.state();

    handle.stop().await;
    assert_eq!(*state.borrow(), WatcherState::Stopped);
}
