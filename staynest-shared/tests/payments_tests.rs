/// Integration tests for the polymorphic payment join resolver
///
/// Runs entirely against the in-memory store; no external services needed.
/// Run with: cargo test --test payments_tests

use staynest_shared::models::{
    CreatePayment, Identity, Membership, PayerKind, PaymentFilter, PaymentStatus, PlanTier,
    UNRESOLVED_PAYER,
};
use staynest_shared::payments::resolve_payments;
use staynest_shared::store::{MemoryStore, RecordStore};
use uuid::Uuid;

fn create_payment(txn: &str, payer_id: Uuid, kind: PayerKind) -> CreatePayment {
    CreatePayment {
        transaction_id: txn.to_string(),
        amount_cents: 12_500,
        payer_id,
        payer_kind: kind,
        payer_name: None,
        property_name: None,
        status: PaymentStatus::Completed,
        method: None,
        metadata: None,
    }
}

async fn seed_identity(store: &MemoryStore, email: &str, name: &str) -> Identity {
    let identity = Identity::new(email, name, "hash");
    store.insert_identity(&identity).await.unwrap();
    identity
}

async fn seed_membership(store: &MemoryStore, email: &str, name: &str) -> Membership {
    let membership = Membership::new(
        email,
        name,
        PlanTier::Gold,
        10_000,
        "paypal",
        serde_json::json!({ "gateway": "paypal" }),
    );
    store.insert_membership(&membership).await.unwrap();
    membership
}

async fn insert(store: &MemoryStore, data: CreatePayment) {
    store
        .insert_payment(&staynest_shared::models::Payment::new(data))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_mixed_payer_kinds_resolve_from_their_own_collections() {
    let store = MemoryStore::new();
    let alice = seed_identity(&store, "alice@example.com", "Alice").await;
    let bob = seed_membership(&store, "bob@example.com", "Bob").await;

    insert(&store, create_payment("txn-alice", alice.id, PayerKind::Identity)).await;
    insert(&store, create_payment("txn-bob", bob.id, PayerKind::Membership)).await;

    let mut views = resolve_payments(&store, &PaymentFilter::all()).await.unwrap();
    views.sort_by(|a, b| a.transaction_id.cmp(&b.transaction_id));
    assert_eq!(views.len(), 2);

    let alice_view = &views[0];
    assert_eq!(alice_view.payer_name, "Alice");
    assert_eq!(alice_view.payer_email.as_deref(), Some("alice@example.com"));
    assert!(
        alice_view.membership_plan.is_none(),
        "Identity payers carry no plan"
    );

    let bob_view = &views[1];
    assert_eq!(bob_view.payer_name, "Bob");
    assert_eq!(bob_view.payer_email.as_deref(), Some("bob@example.com"));
    assert_eq!(bob_view.membership_plan, Some(PlanTier::Gold));
}

#[tokio::test]
async fn test_dangling_payer_yields_sentinel_not_error() {
    let store = MemoryStore::new();
    insert(
        &store,
        create_payment("txn-gone", Uuid::new_v4(), PayerKind::Identity),
    )
    .await;

    let views = resolve_payments(&store, &PaymentFilter::all()).await.unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].payer_name, UNRESOLVED_PAYER);
    assert!(views[0].payer_email.is_none());
}

#[tokio::test]
async fn test_snapshot_name_takes_precedence() {
    let store = MemoryStore::new();
    let alice = seed_identity(&store, "alice@example.com", "Alice Current").await;

    let mut data = create_payment("txn-1", alice.id, PayerKind::Identity);
    data.payer_name = Some("Alice At Purchase".to_string());
    insert(&store, data).await;

    let views = resolve_payments(&store, &PaymentFilter::all()).await.unwrap();
    assert_eq!(views[0].payer_name, "Alice At Purchase");
    // Email is still resolved live even when the name is a snapshot.
    assert_eq!(views[0].payer_email.as_deref(), Some("alice@example.com"));
}

#[tokio::test]
async fn test_membership_method_and_metadata_fallback() {
    let store = MemoryStore::new();
    let bob = seed_membership(&store, "bob@example.com", "Bob").await;
    insert(&store, create_payment("txn-bare", bob.id, PayerKind::Membership)).await;

    let mut with_own = create_payment("txn-own", bob.id, PayerKind::Membership);
    with_own.method = Some("card".to_string());
    with_own.metadata = Some(serde_json::json!({ "last4": "4242" }));
    insert(&store, with_own).await;

    let mut views = resolve_payments(&store, &PaymentFilter::all()).await.unwrap();
    views.sort_by(|a, b| a.transaction_id.cmp(&b.transaction_id));

    let bare = &views[0];
    assert_eq!(bare.method.as_deref(), Some("paypal"));
    assert_eq!(bare.metadata.as_ref().unwrap()["gateway"], "paypal");

    let own = &views[1];
    assert_eq!(own.method.as_deref(), Some("card"));
    assert_eq!(own.metadata.as_ref().unwrap()["last4"], "4242");
}

#[tokio::test]
async fn test_status_filter_narrows_results() {
    let store = MemoryStore::new();
    let alice = seed_identity(&store, "alice@example.com", "Alice").await;

    insert(&store, create_payment("txn-done", alice.id, PayerKind::Identity)).await;
    let mut pending = create_payment("txn-wait", alice.id, PayerKind::Identity);
    pending.status = PaymentStatus::Pending;
    insert(&store, pending).await;

    let views = resolve_payments(
        &store,
        &PaymentFilter::all().with_status(PaymentStatus::Pending),
    )
    .await
    .unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].transaction_id, "txn-wait");
}

#[tokio::test]
async fn test_search_matches_snapshot_and_property() {
    let store = MemoryStore::new();
    let alice = seed_identity(&store, "alice@example.com", "Alice").await;

    let mut beach = create_payment("txn-beach", alice.id, PayerKind::Identity);
    beach.property_name = Some("Beach House".to_string());
    insert(&store, beach).await;

    let mut named = create_payment("txn-named", alice.id, PayerKind::Identity);
    named.payer_name = Some("Alicia".to_string());
    insert(&store, named).await;

    let by_property = resolve_payments(&store, &PaymentFilter::all().with_search("beach"))
        .await
        .unwrap();
    assert_eq!(by_property.len(), 1);
    assert_eq!(by_property[0].transaction_id, "txn-beach");

    let by_name = resolve_payments(&store, &PaymentFilter::all().with_search("ALICIA"))
        .await
        .unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].transaction_id, "txn-named");
}

#[tokio::test]
async fn test_results_ordered_newest_first() {
    let store = MemoryStore::new();
    let alice = seed_identity(&store, "alice@example.com", "Alice").await;

    for i in 0..3 {
        insert(
            &store,
            create_payment(&format!("txn-{i}"), alice.id, PayerKind::Identity),
        )
        .await;
        // Distinct timestamps so the ordering is observable.
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let views = resolve_payments(&store, &PaymentFilter::all()).await.unwrap();
    assert_eq!(views.len(), 3);
    assert!(views.windows(2).all(|w| w[0].created_at >= w[1].created_at));
}
