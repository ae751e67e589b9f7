/// Identity model
///
/// The Identity is the primary account record of the marketplace: login
/// credentials plus the `is_member` flag that mirrors whether a Membership
/// extension record exists for the same email.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE identities (
///     id UUID PRIMARY KEY,
///     email TEXT NOT NULL UNIQUE,
///     name TEXT NOT NULL,
///     password_hash TEXT NOT NULL,
///     is_member BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Consistency
///
/// `is_member` is not authoritative on its own: the Membership collection is
/// the source of truth, and the flag is repaired lazily by the reconciler
/// (`crate::reconcile`) and by the orphan sweep. Identity and Membership are
/// linked only by email equality; there is no structural foreign key between
/// the two collections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Primary account record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Identity {
    /// Unique identity ID (UUID v4)
    pub id: Uuid,

    /// Email address; unique, compared case-sensitively as stored
    pub email: String,

    /// Display name
    pub name: String,

    /// Argon2id credential hash, never plaintext
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Mirror of "a Membership exists for this email"
    ///
    /// Mutated only by the membership reconciler and the enrollment path.
    pub is_member: bool,

    /// When the account was registered
    pub created_at: DateTime<Utc>,
}

impl Identity {
    /// Builds a new identity record with a fresh id and timestamp
    ///
    /// The record is not persisted; pass it to
    /// [`RecordStore::insert_identity`](crate::store::RecordStore::insert_identity).
    pub fn new(
        email: impl Into<String>,
        name: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Identity {
            id: Uuid::new_v4(),
            email: email.into(),
            name: name.into(),
            password_hash: password_hash.into(),
            is_member: false,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_identity_defaults() {
        let identity = Identity::new("ana@example.com", "Ana", "$argon2id$fake");
        assert_eq!(identity.email, "ana@example.com");
        assert_eq!(identity.name, "Ana");
        assert!(!identity.is_member);
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let identity = Identity::new("ana@example.com", "Ana", "$argon2id$fake");
        let json = serde_json::to_string(&identity).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("$argon2id$fake"));
    }
}
