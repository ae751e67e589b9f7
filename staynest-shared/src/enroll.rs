/// Membership enrollment (purchase completion)
///
/// Creates the Membership extension record for an existing Identity and
/// flips the Identity's membership flag. The two writes are deliberately
/// not wrapped in a cross-collection transaction: the flag update is a
/// best-effort companion to the insert, and a crash between the two leaves
/// a transient inconsistency that the reconciler heals on the next read
/// (or the sweep on its next run).

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::CoreError;
use crate::models::{Membership, PlanTier};
use crate::store::RecordStore;

/// Input for a membership purchase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMembership {
    /// Email of the purchasing Identity
    pub email: String,

    /// Purchased tier
    pub plan: PlanTier,

    /// Amount paid, in cents
    pub amount_cents: i64,

    /// Payment method tag
    pub payment_method: String,

    /// Opaque gateway metadata
    pub payment_metadata: JsonValue,
}

/// Creates a Membership for an existing Identity
///
/// The persisted record uses the Identity's canonical email and display
/// name, never caller-supplied ones, so a purchase cannot spoof a different
/// name than the authenticated account's.
///
/// # Errors
///
/// - [`CoreError::NotFound`] if no Identity exists for the email
/// - [`CoreError::AlreadyExists`] if a Membership already exists for it
pub async fn enroll(
    store: &dyn RecordStore,
    data: NewMembership,
) -> Result<Membership, CoreError> {
    let identity = store
        .find_identity_by_email(&data.email)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("identity {}", data.email)))?;

    if store.find_membership_by_email(&data.email).await?.is_some() {
        return Err(CoreError::AlreadyExists(format!(
            "membership {}",
            data.email
        )));
    }

    let membership = Membership::new(
        identity.email.clone(),
        identity.name.clone(),
        data.plan,
        data.amount_cents,
        data.payment_method,
        data.payment_metadata,
    );

    // The unique index on memberships.email backstops the pre-check above
    // when two purchases race; the loser surfaces AlreadyExists.
    store.insert_membership(&membership).await?;

    // Best-effort companion write. If it fails, the membership stands and
    // the flag is healed by the next reconciling read or sweep.
    match store.set_membership_flag(&identity.email, true).await {
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(
                email = %identity.email,
                error = %e,
                "Membership created but flag write failed; reconciler will heal"
            );
        }
    }

    tracing::info!(
        email = %identity.email,
        plan = membership.plan.as_str(),
        "Membership created"
    );

    Ok(membership)
}

// Creation-invariant tests (missing identity, duplicate purchase, canonical
// name enforcement) are in tests/enroll_tests.rs.
