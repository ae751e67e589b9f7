/// Membership model
///
/// A Membership is an extension record for an Identity: it exists only while
/// the account holds an active paid tier. The two records share nothing but
/// the email (a soft relation), so at most one Membership may exist per
/// email, and a Membership whose Identity is gone is an orphan that the
/// sweep deletes.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE plan_tier AS ENUM ('silver', 'gold', 'platinum');
///
/// CREATE TABLE memberships (
///     id UUID PRIMARY KEY,
///     email TEXT NOT NULL UNIQUE,
///     member_name TEXT NOT NULL,
///     plan plan_tier NOT NULL,
///     amount_cents BIGINT NOT NULL,
///     payment_method TEXT NOT NULL,
///     payment_metadata JSONB NOT NULL DEFAULT '{}',
///     joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Paid membership tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "plan_tier", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    /// Entry tier: extra listing slots
    Silver,

    /// Mid tier: featured listings and priority support
    Gold,

    /// Top tier: everything, plus zero booking fees
    Platinum,
}

impl PlanTier {
    /// Converts the tier to its wire string
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Silver => "silver",
            PlanTier::Gold => "gold",
            PlanTier::Platinum => "platinum",
        }
    }
}

/// Membership extension record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    /// Unique membership ID (UUID v4)
    pub id: Uuid,

    /// Owning identity's email; functionally unique (at most one membership
    /// per email)
    pub email: String,

    /// Display name, copied from the owning Identity at purchase time
    pub member_name: String,

    /// Purchased tier
    pub plan: PlanTier,

    /// Amount paid for the tier, in cents
    pub amount_cents: i64,

    /// Payment method tag (e.g. "card", "paypal")
    pub payment_method: String,

    /// Opaque gateway metadata captured at purchase time
    pub payment_metadata: JsonValue,

    /// When the membership was purchased
    pub joined_at: DateTime<Utc>,
}

impl Membership {
    /// Builds a new membership record with a fresh id and timestamp
    ///
    /// Callers must pass the owning Identity's canonical email and name, not
    /// caller-supplied values; `crate::enroll` enforces this.
    pub fn new(
        email: impl Into<String>,
        member_name: impl Into<String>,
        plan: PlanTier,
        amount_cents: i64,
        payment_method: impl Into<String>,
        payment_metadata: JsonValue,
    ) -> Self {
        Membership {
            id: Uuid::new_v4(),
            email: email.into(),
            member_name: member_name.into(),
            plan,
            amount_cents,
            payment_method: payment_method.into(),
            payment_metadata,
            joined_at: Utc::now(),
        }
    }
}
