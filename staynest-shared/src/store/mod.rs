/// Record-store seam
///
/// The consistency engine touches the document store through this trait, so
/// the reconciler, sweep, watcher and join resolver are all written against
/// the same narrow set of primitives: point lookups by email, batched
/// lookups by id, inserts, the membership-flag update, deletes, a paged
/// membership scan, the filtered payment query, and a subscription to
/// Identity delete events.
///
/// Two implementations:
///
/// - [`PgStore`]: production, sqlx over Postgres, LISTEN/NOTIFY change feed
/// - [`MemoryStore`]: in-process maps plus a broadcast-channel feed, used by
///   the test suites and local demos

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Identity, Membership, Payment, PaymentFilter};

/// A delete event observed on the Identity collection
///
/// The feed is best-effort about payload completeness: when the deployment
/// can still resolve the deleted document (e.g. a pre-delete trigger
/// snapshot) the event carries the email, otherwise only the id survives
/// and the watcher must fall back to a full sweep.
#[derive(Debug, Clone)]
pub struct DeleteEvent {
    /// Id of the deleted Identity
    pub id: Uuid,

    /// Email of the deleted Identity, when the event carried the document
    pub email: Option<String>,
}

/// A live subscription to Identity delete events
#[async_trait]
pub trait DeleteFeed: Send {
    /// Waits for the next delete event
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SubscriptionLost`] when the feed is
    /// invalidated; the subscription is unusable afterwards and must be
    /// re-established via [`RecordStore::watch_identity_deletes`].
    async fn next_event(&mut self) -> Result<DeleteEvent, StoreError>;
}

/// CRUD + change-feed primitives over the three collections
#[async_trait]
pub trait RecordStore: Send + Sync {
    // --- identities -----------------------------------------------------

    /// Point lookup of an Identity by email
    async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError>;

    /// Batched lookup of Identities by id (payment-join partition fetch)
    async fn find_identities_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Identity>, StoreError>;

    /// Inserts a new Identity
    ///
    /// # Errors
    ///
    /// [`StoreError::Duplicate`] if the email is already taken.
    async fn insert_identity(&self, identity: &Identity) -> Result<(), StoreError>;

    /// Sets the `is_member` flag on the Identity with this email
    ///
    /// Returns whether a record was actually updated. Per-document writes
    /// are atomic in the underlying store, which is what makes concurrent
    /// reconciler calls for the same email safe (both compute the same
    /// target value; last writer wins).
    async fn set_membership_flag(&self, email: &str, is_member: bool) -> Result<bool, StoreError>;

    /// Deletes an Identity by id; returns whether a record existed
    async fn delete_identity(&self, id: Uuid) -> Result<bool, StoreError>;

    // --- memberships ----------------------------------------------------

    /// Point lookup of a Membership by email
    async fn find_membership_by_email(&self, email: &str) -> Result<Option<Membership>, StoreError>;

    /// Batched lookup of Memberships by id (payment-join partition fetch)
    async fn find_memberships_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Membership>, StoreError>;

    /// Inserts a new Membership
    ///
    /// # Errors
    ///
    /// [`StoreError::Duplicate`] if a Membership already exists for the
    /// email (unique index on the shared natural key).
    async fn insert_membership(&self, membership: &Membership) -> Result<(), StoreError>;

    /// Deletes the Membership with this email; returns whether one existed
    ///
    /// Idempotent: deleting an absent Membership is `Ok(false)`, which lets
    /// cascade deletes and concurrent sweeps race without double-counting.
    async fn delete_membership_by_email(&self, email: &str) -> Result<bool, StoreError>;

    /// Keyset-paged scan of Membership emails, ordered ascending
    ///
    /// Returns up to `limit` emails strictly greater than `after` (all from
    /// the start when `after` is `None`). Keyset pagination keeps the sweep
    /// correct while it deletes records behind the cursor.
    async fn list_membership_emails(
        &self,
        after: Option<&str>,
        limit: u32,
    ) -> Result<Vec<String>, StoreError>;

    // --- payments -------------------------------------------------------

    /// Records a payment
    async fn insert_payment(&self, payment: &Payment) -> Result<(), StoreError>;

    /// Fetches payments matching the filter, newest first
    async fn list_payments(&self, filter: &PaymentFilter) -> Result<Vec<Payment>, StoreError>;

    // --- change feed ----------------------------------------------------

    /// Whether this deployment supports change feeds at all
    ///
    /// When `false`, the cascade watcher must not be started; a periodic
    /// sweep becomes the sole consistency mechanism.
    fn supports_change_feed(&self) -> bool;

    /// Subscribes to delete events on the Identity collection
    async fn watch_identity_deletes(&self) -> Result<Box<dyn DeleteFeed>, StoreError>;

    // --- health ---------------------------------------------------------

    /// Cheap connectivity check for health endpoints
    async fn ping(&self) -> Result<(), StoreError>;
}
