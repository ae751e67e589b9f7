/// Error types shared across the workspace
///
/// Two layers, matching the propagation policy:
///
/// - [`StoreError`] is what the record store surfaces: availability problems
///   (always retryable) and change-feed invalidation (drives the watcher's
///   Degraded state, never fatal).
/// - [`CoreError`] is what the consistency engine surfaces to callers:
///   `NotFound` and `AlreadyExists` are expected outcomes carried as typed
///   results, not exceptions-as-control-flow.

use thiserror::Error;

/// Errors surfaced by a [`RecordStore`](crate::store::RecordStore)
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O failure talking to the store; retryable with backoff
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    /// A unique index rejected a write
    #[error("duplicate key: {0}")]
    Duplicate(String),

    /// The change-feed subscription was invalidated (cursor expired,
    /// connection dropped). Triggers the watcher's Degraded state.
    #[error("change feed subscription lost: {0}")]
    SubscriptionLost(String),
}

/// Errors surfaced by the consistency engine
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced Identity/Membership/Payment is absent
    #[error("not found: {0}")]
    NotFound(String),

    /// A Membership already exists for the email
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The record store failed
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            // A unique-index rejection on insert is the store telling us the
            // record already exists; surface it as the typed outcome.
            StoreError::Duplicate(key) => CoreError::AlreadyExists(key),
            other => CoreError::Store(other),
        }
    }
}
