/// Integration tests for the orphaned-membership sweep
///
/// Runs entirely against the in-memory store; no external services needed.
/// Run with: cargo test --test sweep_tests

use staynest_shared::enroll::{enroll, NewMembership};
use staynest_shared::error::CoreError;
use staynest_shared::models::{Identity, Membership, PlanTier};
use staynest_shared::store::{MemoryStore, RecordStore};
use staynest_shared::sweep::{sweep, DEFAULT_PAGE_SIZE};

fn membership(email: &str) -> Membership {
    Membership::new(
        email,
        "Member",
        PlanTier::Silver,
        5_000,
        "card",
        serde_json::json!({}),
    )
}

/// Seeds `total` memberships of which `orphans` have no backing identity
async fn seed(store: &MemoryStore, total: usize, orphans: usize) {
    for i in 0..total {
        let email = format!("user{i:03}@example.com");
        if i >= orphans {
            store
                .insert_identity(&Identity::new(&email, "Member", "hash"))
                .await
                .unwrap();
        }
        store.insert_membership(&membership(&email)).await.unwrap();
    }
}

#[tokio::test]
async fn test_sweep_deletes_exactly_the_orphans() {
    let store = MemoryStore::new();
    seed(&store, 10, 4).await;

    let deleted = sweep(&store, DEFAULT_PAGE_SIZE).await.unwrap();
    assert_eq!(deleted, 4);

    // Survivors all still have their identity.
    let remaining = store.list_membership_emails(None, 100).await.unwrap();
    assert_eq!(remaining.len(), 6);
    for email in &remaining {
        assert!(store.find_identity_by_email(email).await.unwrap().is_some());
    }
}

#[tokio::test]
async fn test_sweep_is_idempotent() {
    let store = MemoryStore::new();
    seed(&store, 8, 3).await;

    assert_eq!(sweep(&store, DEFAULT_PAGE_SIZE).await.unwrap(), 3);
    assert_eq!(
        sweep(&store, DEFAULT_PAGE_SIZE).await.unwrap(),
        0,
        "A second run over an unchanged store deletes nothing"
    );
}

#[tokio::test]
async fn test_sweep_on_empty_store() {
    let store = MemoryStore::new();
    assert_eq!(sweep(&store, DEFAULT_PAGE_SIZE).await.unwrap(), 0);
}

#[tokio::test]
async fn test_sweep_crosses_page_boundaries() {
    let store = MemoryStore::new();
    // 25 memberships, 7 orphans, paged 4 at a time: orphans span pages and
    // deletions happen behind the keyset cursor while later pages load.
    seed(&store, 25, 7).await;

    let deleted = sweep(&store, 4).await.unwrap();
    assert_eq!(deleted, 7);

    let remaining = store.list_membership_emails(None, 100).await.unwrap();
    assert_eq!(remaining.len(), 18);
}

#[tokio::test]
async fn test_sweep_single_element_pages() {
    let store = MemoryStore::new();
    seed(&store, 5, 5).await;

    assert_eq!(sweep(&store, 1).await.unwrap(), 5);
    assert!(store
        .list_membership_emails(None, 100)
        .await
        .unwrap()
        .is_empty());
}

/// Full lifecycle: sign up, purchase, delete the account, sweep the orphan
#[tokio::test]
async fn test_enroll_delete_sweep_lifecycle() {
    let store = MemoryStore::new();
    let identity = Identity::new("a@b.com", "Ana", "hash");
    store.insert_identity(&identity).await.unwrap();

    enroll(
        &store,
        NewMembership {
            email: "a@b.com".to_string(),
            plan: PlanTier::Gold,
            amount_cents: 1_000,
            payment_method: "card".to_string(),
            payment_metadata: serde_json::json!({}),
        },
    )
    .await
    .unwrap();

    let refetched = store.find_identity_by_email("a@b.com").await.unwrap().unwrap();
    assert!(refetched.is_member);

    assert!(store.delete_identity(identity.id).await.unwrap());
    assert_eq!(sweep(&store, DEFAULT_PAGE_SIZE).await.unwrap(), 1);
    assert!(store
        .find_membership_by_email("a@b.com")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_sweep_surfaces_store_failure() {
    let store = MemoryStore::new();
    seed(&store, 3, 1).await;
    store.set_unavailable(true);

    let result = sweep(&store, DEFAULT_PAGE_SIZE).await;
    assert!(matches!(result, Err(CoreError::Store(_))));

    // Once the store recovers the sweep completes normally.
    store.set_unavailable(false);
    assert_eq!(sweep(&store, DEFAULT_PAGE_SIZE).await.unwrap(), 1);
}
