/// Membership reconciler
///
/// Identity and Membership are linked only by email, and nothing enforces
/// their consistency transactionally. This module is the lazy healing half
/// of that bargain: on specific read paths (whoami, membership-status) the
/// caller runs [`reconcile`], which checks whether `Identity.is_member`
/// matches the existence of a Membership for the same email and corrects
/// the flag when it has drifted.
///
/// # Guarantees
///
/// - After a successful call, the flag matches Membership existence for
///   this one email, until the next write to either record.
/// - At most one write is performed, and only when drift is detected;
///   repeated calls with no intervening writes perform zero writes.
/// - O(1) point lookups only, no scans — safe on the request path.

use crate::error::CoreError;
use crate::models::Membership;
use crate::store::RecordStore;

/// Result of a reconciliation pass for one email
#[derive(Debug, Clone)]
pub struct Reconciled {
    /// The now-consistent membership flag
    pub is_member: bool,

    /// The Membership record, when one exists
    pub membership: Option<Membership>,
}

/// Reconciles the membership flag for one email
///
/// Looks up the Membership and Identity for `email`. If the Identity's
/// `is_member` flag disagrees with the Membership's existence, the flag is
/// corrected and persisted.
///
/// A missing Identity is not an error here: the call returns
/// `(false, membership-if-any)` and leaves any dangling Membership to the
/// orphan sweep.
///
/// # Errors
///
/// Only store failures propagate ([`CoreError::Store`]); callers on read
/// paths may choose to degrade to last-known state instead of failing the
/// surrounding request.
pub async fn reconcile(store: &dyn RecordStore, email: &str) -> Result<Reconciled, CoreError> {
    let membership = store.find_membership_by_email(email).await?;
    let identity = store.find_identity_by_email(email).await?;

    let Some(identity) = identity else {
        // Dangling membership (if any) is the sweep's job, not this call's.
        return Ok(Reconciled {
            is_member: false,
            membership,
        });
    };

    let should_be_member = membership.is_some();
    if identity.is_member != should_be_member {
        store.set_membership_flag(email, should_be_member).await?;
        tracing::info!(
            email,
            was = identity.is_member,
            now = should_be_member,
            "Repaired membership flag drift"
        );
    }

    Ok(Reconciled {
        is_member: should_be_member,
        membership,
    })
}

// Property tests (idempotence, drift repair in both directions, missing
// identity) are in tests/reconcile_tests.rs.
