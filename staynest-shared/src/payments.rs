/// Payment join resolver
///
/// Payments carry a polymorphic payer reference: `(payer_id, payer_kind)`
/// where the kind discriminates between the Identity and Membership
/// collections. The resolver evaluates the discriminator *before* touching
/// the store: payments are partitioned by kind, each partition is fetched
/// with one batched query against its own collection, and the per-payment
/// join is then a map lookup. Choosing the target collection per record
/// inside the join loop would defeat batching and invites fetching from
/// the wrong collection when one result set mixes payer kinds.
///
/// # Normalization
///
/// - `payer_name`: the payment's own snapshot wins; else the resolved
///   payer's name; else the literal `"N/A"` sentinel — never absent.
/// - `payer_email`: the resolved payer's email, when the payer exists.
/// - Membership payers additionally surface their plan, and their own
///   payment method/metadata serve as fallbacks when the payment record
///   lacks them (a payment created as a side effect of a tier purchase may
///   not duplicate those fields).
/// - A payer id that resolves to nothing (payer since deleted) is not an
///   error; the view degrades to the sentinel.

use std::collections::HashMap;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{
    Identity, Membership, PayerKind, Payment, PaymentFilter, PaymentView, UNRESOLVED_PAYER,
};
use crate::store::RecordStore;

/// Resolves payments matching the filter into normalized views
///
/// Results come back newest-first, mirroring the store's payment ordering.
///
/// # Errors
///
/// Only store failures propagate; unresolvable payers degrade per record.
pub async fn resolve_payments(
    store: &dyn RecordStore,
    filter: &PaymentFilter,
) -> Result<Vec<PaymentView>, CoreError> {
    let payments = store.list_payments(filter).await?;

    // Partition by discriminator first, then batch-fetch per partition.
    let mut identity_ids: Vec<Uuid> = Vec::new();
    let mut membership_ids: Vec<Uuid> = Vec::new();
    for payment in &payments {
        match payment.payer_kind {
            PayerKind::Identity => identity_ids.push(payment.payer_id),
            PayerKind::Membership => membership_ids.push(payment.payer_id),
        }
    }
    identity_ids.sort_unstable();
    identity_ids.dedup();
    membership_ids.sort_unstable();
    membership_ids.dedup();

    let (identities, memberships) = futures::future::try_join(
        store.find_identities_by_ids(&identity_ids),
        store.find_memberships_by_ids(&membership_ids),
    )
    .await?;

    let identities: HashMap<Uuid, Identity> =
        identities.into_iter().map(|i| (i.id, i)).collect();
    let memberships: HashMap<Uuid, Membership> =
        memberships.into_iter().map(|m| (m.id, m)).collect();

    tracing::debug!(
        payments = payments.len(),
        identity_payers = identities.len(),
        membership_payers = memberships.len(),
        "Resolved payment payers"
    );

    Ok(payments
        .into_iter()
        .map(|payment| build_view(payment, &identities, &memberships))
        .collect())
}

/// Merges one payment with its resolved payer into the normalized view
fn build_view(
    payment: Payment,
    identities: &HashMap<Uuid, Identity>,
    memberships: &HashMap<Uuid, Membership>,
) -> PaymentView {
    let mut payer_email = None;
    let mut membership_plan = None;
    let mut resolved_name = None;
    let mut method = payment.method;
    let mut metadata = payment.metadata;

    match payment.payer_kind {
        PayerKind::Identity => {
            if let Some(identity) = identities.get(&payment.payer_id) {
                resolved_name = Some(identity.name.clone());
                payer_email = Some(identity.email.clone());
            }
        }
        PayerKind::Membership => {
            if let Some(membership) = memberships.get(&payment.payer_id) {
                resolved_name = Some(membership.member_name.clone());
                payer_email = Some(membership.email.clone());
                membership_plan = Some(membership.plan);
                if method.is_none() {
                    method = Some(membership.payment_method.clone());
                }
                if metadata.is_none() {
                    metadata = Some(membership.payment_metadata.clone());
                }
            }
        }
    }

    let payer_name = payment
        .payer_name
        .or(resolved_name)
        .unwrap_or_else(|| UNRESOLVED_PAYER.to_string());

    PaymentView {
        id: payment.id,
        transaction_id: payment.transaction_id,
        amount_cents: payment.amount_cents,
        payer_kind: payment.payer_kind,
        payer_name,
        payer_email,
        property_name: payment.property_name,
        membership_plan,
        status: payment.status,
        method,
        metadata,
        created_at: payment.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreatePayment, PaymentStatus, PlanTier};

    fn payment(kind: PayerKind, payer_id: Uuid, snapshot: Option<&str>) -> Payment {
        Payment::new(CreatePayment {
            transaction_id: Uuid::new_v4().to_string(),
            amount_cents: 100,
            payer_id,
            payer_kind: kind,
            payer_name: snapshot.map(str::to_string),
            property_name: None,
            status: PaymentStatus::Completed,
            method: None,
            metadata: None,
        })
    }

    #[test]
    fn test_snapshot_name_wins_over_resolved() {
        let identity = Identity::new("a@b.com", "Alice", "hash");
        let identities = HashMap::from([(identity.id, identity.clone())]);

        let view = build_view(
            payment(PayerKind::Identity, identity.id, Some("Snapshot Name")),
            &identities,
            &HashMap::new(),
        );
        assert_eq!(view.payer_name, "Snapshot Name");
        assert_eq!(view.payer_email.as_deref(), Some("a@b.com"));
    }

    #[test]
    fn test_unresolved_payer_degrades_to_sentinel() {
        let view = build_view(
            payment(PayerKind::Identity, Uuid::new_v4(), None),
            &HashMap::new(),
            &HashMap::new(),
        );
        assert_eq!(view.payer_name, UNRESOLVED_PAYER);
        assert!(view.payer_email.is_none());
        assert!(view.membership_plan.is_none());
    }

    #[test]
    fn test_membership_payer_surfaces_plan_and_fallbacks() {
        let membership = Membership::new(
            "b@b.com",
            "Bob",
            PlanTier::Gold,
            10_000,
            "paypal",
            serde_json::json!({ "gateway": "paypal" }),
        );
        let memberships = HashMap::from([(membership.id, membership.clone())]);

        let view = build_view(
            payment(PayerKind::Membership, membership.id, None),
            &HashMap::new(),
            &memberships,
        );
        assert_eq!(view.payer_name, "Bob");
        assert_eq!(view.membership_plan, Some(PlanTier::Gold));
        // Payment carried no method/metadata, so the membership's own win.
        assert_eq!(view.method.as_deref(), Some("paypal"));
        assert_eq!(view.metadata.unwrap()["gateway"], "paypal");
    }

    #[test]
    fn test_payment_method_not_overridden_when_present() {
        let membership = Membership::new(
            "b@b.com",
            "Bob",
            PlanTier::Gold,
            10_000,
            "paypal",
            serde_json::json!({}),
        );
        let memberships = HashMap::from([(membership.id, membership.clone())]);

        let mut p = payment(PayerKind::Membership, membership.id, None);
        p.method = Some("card".to_string());

        let view = build_view(p, &HashMap::new(), &memberships);
        assert_eq!(view.method.as_deref(), Some("card"));
    }
}

// End-to-end join tests over the store (mixed payer kinds, filters,
// dangling payers) are in tests/payments_tests.rs.
