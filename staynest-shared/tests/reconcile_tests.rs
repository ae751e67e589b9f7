/// Integration tests for identity/membership reconciliation
///
/// Runs entirely against the in-memory store; no external services needed.
/// Run with: cargo test --test reconcile_tests

use staynest_shared::models::{Identity, Membership, PlanTier};
use staynest_shared::reconcile::reconcile;
use staynest_shared::store::{MemoryStore, RecordStore};

fn membership(email: &str, name: &str) -> Membership {
    Membership::new(
        email,
        name,
        PlanTier::Gold,
        10_000,
        "card",
        serde_json::json!({}),
    )
}

async fn seed_identity(store: &MemoryStore, email: &str, is_member: bool) -> Identity {
    let mut identity = Identity::new(email, "Test User", "hash");
    identity.is_member = is_member;
    store.insert_identity(&identity).await.unwrap();
    identity
}

#[tokio::test]
async fn test_repairs_flag_when_membership_exists() {
    let store = MemoryStore::new();
    seed_identity(&store, "alice@example.com", false).await;
    store
        .insert_membership(&membership("alice@example.com", "Alice"))
        .await
        .unwrap();

    let result = reconcile(&store, "alice@example.com").await.unwrap();
    assert!(result.is_member);
    assert!(result.membership.is_some());

    let identity = store
        .find_identity_by_email("alice@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(identity.is_member, "Flag should have been repaired to true");
}

#[tokio::test]
async fn test_clears_stale_flag_when_membership_missing() {
    let store = MemoryStore::new();
    seed_identity(&store, "bob@example.com", true).await;

    let result = reconcile(&store, "bob@example.com").await.unwrap();
    assert!(!result.is_member);
    assert!(result.membership.is_none());

    let identity = store
        .find_identity_by_email("bob@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(!identity.is_member, "Stale flag should have been cleared");
}

#[tokio::test]
async fn test_idempotent_when_already_consistent() {
    let store = MemoryStore::new();
    seed_identity(&store, "carol@example.com", true).await;
    store
        .insert_membership(&membership("carol@example.com", "Carol"))
        .await
        .unwrap();

    let writes_before = store.flag_write_count();
    let first = reconcile(&store, "carol@example.com").await.unwrap();
    let second = reconcile(&store, "carol@example.com").await.unwrap();

    assert!(first.is_member && second.is_member);
    assert_eq!(
        store.flag_write_count(),
        writes_before,
        "Consistent records must not trigger flag writes"
    );
}

#[tokio::test]
async fn test_converges_after_single_repair() {
    let store = MemoryStore::new();
    seed_identity(&store, "dave@example.com", false).await;
    store
        .insert_membership(&membership("dave@example.com", "Dave"))
        .await
        .unwrap();

    reconcile(&store, "dave@example.com").await.unwrap();
    let writes_after_repair = store.flag_write_count();
    assert_eq!(writes_after_repair, 1);

    // A second pass observes consistency and writes nothing.
    reconcile(&store, "dave@example.com").await.unwrap();
    assert_eq!(store.flag_write_count(), writes_after_repair);
}

#[tokio::test]
async fn test_missing_identity_reports_membership_only() {
    let store = MemoryStore::new();
    store
        .insert_membership(&membership("ghost@example.com", "Ghost"))
        .await
        .unwrap();

    let result = reconcile(&store, "ghost@example.com").await.unwrap();
    assert!(!result.is_member, "No identity means not a member");
    assert!(
        result.membership.is_some(),
        "The orphaned membership is still reported for the sweep to handle"
    );
}

#[tokio::test]
async fn test_unknown_email_is_not_an_error() {
    let store = MemoryStore::new();
    let result = reconcile(&store, "nobody@example.com").await.unwrap();
    assert!(!result.is_member);
    assert!(result.membership.is_none());
}
