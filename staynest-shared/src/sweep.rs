/// Orphan sweep
///
/// Batch repair for the Identity↔Membership soft relation: scan all
/// Memberships and delete any whose Identity no longer exists. Used as an
/// administrative action, as the cascade watcher's fallback when a delete
/// event cannot be resolved to an email, and on a timer in deployments
/// without change-feed support.
///
/// The scan is keyset-paged (ordered by email, the unique natural key), so
/// deleting records behind the cursor never skips survivors, and no
/// long-lived store cursor is held across pages. The sweep yields to the
/// scheduler between pages rather than running one unbounded scan.
///
/// Safe to run concurrently with itself: deletion is idempotent
/// (`delete_membership_by_email` reports whether a row was actually
/// removed), so a record can never be deleted twice, and only actual
/// removals are counted.

use crate::error::CoreError;
use crate::store::RecordStore;

/// Default page size for the membership scan
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Deletes all Memberships whose Identity no longer exists
///
/// Returns the number of Memberships this run actually deleted. Idempotent:
/// an immediate second run over an unchanged store deletes nothing.
///
/// # Errors
///
/// Store failures abort the sweep with the count-so-far lost; the caller
/// retries on its own schedule (the sweep is always safe to rerun).
pub async fn sweep(store: &dyn RecordStore, page_size: u32) -> Result<u64, CoreError> {
    let page_size = page_size.max(1);
    let mut deleted = 0u64;
    let mut cursor: Option<String> = None;

    loop {
        let emails = store
            .list_membership_emails(cursor.as_deref(), page_size)
            .await?;
        let Some(last) = emails.last().cloned() else {
            break;
        };

        for email in &emails {
            if store.find_identity_by_email(email).await?.is_some() {
                continue;
            }
            if store.delete_membership_by_email(email).await? {
                deleted += 1;
                tracing::info!(email, "Deleted orphaned membership");
            }
        }

        if emails.len() < page_size as usize {
            break;
        }
        cursor = Some(last);
        tokio::task::yield_now().await;
    }

    if deleted > 0 {
        tracing::info!(deleted, "Orphan sweep finished");
    } else {
        tracing::debug!("Orphan sweep finished, nothing to delete");
    }

    Ok(deleted)
}

// Convergence and idempotence tests are in tests/sweep_tests.rs.
