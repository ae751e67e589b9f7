/// Postgres record store
///
/// Production implementation of [`RecordStore`] over sqlx. The change feed
/// is Postgres LISTEN/NOTIFY: an `AFTER DELETE` trigger on `identities`
/// (see `migrations/`) publishes a JSON payload with the deleted row's id
/// and email on the [`IDENTITY_DELETE_CHANNEL`] channel, and
/// [`watch_identity_deletes`](RecordStore::watch_identity_deletes) hands
/// out a `PgListener` subscribed to it.
///
/// Every call is bounded: the pool's acquire timeout caps waiting for a
/// connection, and the per-connection `statement_timeout` caps query
/// execution (see [`crate::db::pool`]). A lost listener connection
/// surfaces as `SubscriptionLost` and is the watcher's cue to resubscribe.

use async_trait::async_trait;
use serde::Deserialize;
use sqlx::postgres::{PgListener, PgPool};
use uuid::Uuid;

use super::{DeleteEvent, DeleteFeed, RecordStore};
use crate::error::StoreError;
use crate::models::{Identity, Membership, Payment, PaymentFilter};

/// NOTIFY channel the identity delete trigger publishes on
pub const IDENTITY_DELETE_CHANNEL: &str = "staynest_identity_deleted";

/// Postgres-backed implementation of [`RecordStore`]
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wraps an existing connection pool
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    /// The underlying pool, for shutdown handling
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn map_sqlx(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Duplicate(db.constraint().unwrap_or("unique index").to_string())
        }
        _ => StoreError::Unavailable(err.to_string()),
    }
}

/// Wraps a free-text search term in `%…%` for ILIKE
///
/// `%`, `_` and `\` are escaped first, so the term matches as a literal
/// substring (the same semantics a plain `contains` gives the in-memory
/// store) rather than as a pattern.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Trigger payload: `json_build_object('id', OLD.id, 'email', OLD.email)`
#[derive(Debug, Deserialize)]
struct DeletePayload {
    id: Uuid,
    email: Option<String>,
}

struct PgFeed {
    listener: PgListener,
}

#[async_trait]
impl DeleteFeed for PgFeed {
    async fn next_event(&mut self) -> Result<DeleteEvent, StoreError> {
        loop {
            let notification = self
                .listener
                .recv()
                .await
                .map_err(|e| StoreError::SubscriptionLost(e.to_string()))?;

            match serde_json::from_str::<DeletePayload>(notification.payload()) {
                Ok(payload) => {
                    return Ok(DeleteEvent {
                        id: payload.id,
                        email: payload.email,
                    })
                }
                Err(e) => {
                    // A malformed payload is not a reason to drop the
                    // subscription; skip it and let the next sweep heal.
                    tracing::warn!(error = %e, payload = notification.payload(), "Skipping malformed delete notification");
                    continue;
                }
            }
        }
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        sqlx::query_as::<_, Identity>(
            r#"
            SELECT id, email, name, password_hash, is_member, created_at
            FROM identities
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn find_identities_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Identity>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, Identity>(
            r#"
            SELECT id, email, name, password_hash, is_member, created_at
            FROM identities
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn insert_identity(&self, identity: &Identity) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO identities (id, email, name, password_hash, is_member, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(identity.id)
        .bind(&identity.email)
        .bind(&identity.name)
        .bind(&identity.password_hash)
        .bind(identity.is_member)
        .bind(identity.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(())
    }

    async fn set_membership_flag(&self, email: &str, is_member: bool) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE identities SET is_member = $2 WHERE email = $1")
            .bind(email)
            .bind(is_member)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_identity(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM identities WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_membership_by_email(&self, email: &str) -> Result<Option<Membership>, StoreError> {
        sqlx::query_as::<_, Membership>(
            r#"
            SELECT id, email, member_name, plan, amount_cents, payment_method,
                   payment_metadata, joined_at
            FROM memberships
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn find_memberships_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Membership>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, Membership>(
            r#"
            SELECT id, email, member_name, plan, amount_cents, payment_method,
                   payment_metadata, joined_at
            FROM memberships
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn insert_membership(&self, membership: &Membership) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO memberships (id, email, member_name, plan, amount_cents,
                                     payment_method, payment_metadata, joined_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(membership.id)
        .bind(&membership.email)
        .bind(&membership.member_name)
        .bind(membership.plan)
        .bind(membership.amount_cents)
        .bind(&membership.payment_method)
        .bind(&membership.payment_metadata)
        .bind(membership.joined_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(())
    }

    async fn delete_membership_by_email(&self, email: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM memberships WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_membership_emails(
        &self,
        after: Option<&str>,
        limit: u32,
    ) -> Result<Vec<String>, StoreError> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT email FROM memberships
            WHERE $1::text IS NULL OR email > $1
            ORDER BY email ASC
            LIMIT $2
            "#,
        )
        .bind(after)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO payments (id, transaction_id, amount_cents, payer_id, payer_kind,
                                  payer_name, property_name, status, method, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(payment.id)
        .bind(&payment.transaction_id)
        .bind(payment.amount_cents)
        .bind(payment.payer_id)
        .bind(payment.payer_kind)
        .bind(&payment.payer_name)
        .bind(&payment.property_name)
        .bind(payment.status)
        .bind(&payment.method)
        .bind(&payment.metadata)
        .bind(payment.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(())
    }

    async fn list_payments(&self, filter: &PaymentFilter) -> Result<Vec<Payment>, StoreError> {
        let pattern = filter
            .search
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(like_pattern);

        sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, transaction_id, amount_cents, payer_id, payer_kind,
                   payer_name, property_name, status, method, metadata, created_at
            FROM payments
            WHERE ($1::payment_status IS NULL OR status = $1)
              AND ($2::text IS NULL
                   OR transaction_id ILIKE $2
                   OR payer_name ILIKE $2
                   OR property_name ILIKE $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.status)
        .bind(pattern)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    fn supports_change_feed(&self) -> bool {
        true
    }

    async fn watch_identity_deletes(&self) -> Result<Box<dyn DeleteFeed>, StoreError> {
        let mut listener = PgListener::connect_with(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        listener
            .listen(IDENTITY_DELETE_CHANNEL)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        tracing::debug!(channel = IDENTITY_DELETE_CHANNEL, "Subscribed to identity delete feed");
        Ok(Box::new(PgFeed { listener }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(map_sqlx)
    }
}

// Integration tests for PgStore require a running PostgreSQL database and
// live alongside the migration tests; everything above is also covered
// indirectly by the MemoryStore-backed suites, which exercise the same
// trait surface.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("beach"), "%beach%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("txn_1"), "%txn\\_1%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
