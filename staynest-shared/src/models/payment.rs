/// Payment model and normalized payment view
///
/// A Payment's payer reference is polymorphic: `(payer_id, payer_kind)`
/// where the kind discriminates between the Identity and Membership
/// collections. The record never owns the payer's lifecycle; a payer that
/// has since been deleted simply fails to resolve (the join degrades to the
/// "N/A" sentinel, it never errors).
///
/// # Schema
///
/// ```sql
/// CREATE TYPE payer_kind AS ENUM ('identity', 'membership');
/// CREATE TYPE payment_status AS ENUM ('completed', 'pending', 'failed');
///
/// CREATE TABLE payments (
///     id UUID PRIMARY KEY,
///     transaction_id TEXT NOT NULL UNIQUE,
///     amount_cents BIGINT NOT NULL,
///     payer_id UUID NOT NULL,
///     payer_kind payer_kind NOT NULL,
///     payer_name TEXT,
///     property_name TEXT,
///     status payment_status NOT NULL,
///     method TEXT,
///     metadata JSONB,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::membership::PlanTier;

/// Sentinel payer name for payments whose payer cannot be resolved
pub const UNRESOLVED_PAYER: &str = "N/A";

/// Which collection the payer reference points into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payer_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PayerKind {
    /// Payer is an Identity record (e.g. a booking payment)
    Identity,

    /// Payer is a Membership record (e.g. a tier purchase)
    Membership,
}

impl fmt::Display for PayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayerKind::Identity => write!(f, "identity"),
            PayerKind::Membership => write!(f, "membership"),
        }
    }
}

/// Payment lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Funds captured
    Completed,

    /// Awaiting gateway confirmation
    Pending,

    /// Gateway rejected or timed out
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Completed => "completed",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(PaymentStatus::Completed),
            "pending" => Ok(PaymentStatus::Pending),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(format!("unknown payment status: {}", other)),
        }
    }
}

/// Payment record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    /// Unique payment ID (UUID v4)
    pub id: Uuid,

    /// Gateway transaction id, unique
    pub transaction_id: String,

    /// Amount in cents
    pub amount_cents: i64,

    /// Polymorphic payer reference: target record id
    pub payer_id: Uuid,

    /// Polymorphic payer reference: target collection discriminator
    pub payer_kind: PayerKind,

    /// Denormalized payer-name snapshot taken at payment time, if any
    pub payer_name: Option<String>,

    /// Denormalized property-name snapshot, if the payment was for a booking
    pub property_name: Option<String>,

    /// Lifecycle status
    pub status: PaymentStatus,

    /// Payment method tag; may be absent for membership-purchase payments
    /// (the Membership record carries it instead)
    pub method: Option<String>,

    /// Opaque gateway metadata; same caveat as `method`
    pub metadata: Option<JsonValue>,

    /// When the payment was recorded
    pub created_at: DateTime<Utc>,
}

/// Input for recording a new payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePayment {
    /// Gateway transaction id
    pub transaction_id: String,

    /// Amount in cents
    pub amount_cents: i64,

    /// Payer record id
    pub payer_id: Uuid,

    /// Payer collection discriminator
    pub payer_kind: PayerKind,

    /// Optional payer-name snapshot
    pub payer_name: Option<String>,

    /// Optional property-name snapshot
    pub property_name: Option<String>,

    /// Lifecycle status
    pub status: PaymentStatus,

    /// Optional payment method tag
    pub method: Option<String>,

    /// Optional gateway metadata
    pub metadata: Option<JsonValue>,
}

impl Payment {
    /// Builds a new payment record with a fresh id and timestamp
    pub fn new(data: CreatePayment) -> Self {
        Payment {
            id: Uuid::new_v4(),
            transaction_id: data.transaction_id,
            amount_cents: data.amount_cents,
            payer_id: data.payer_id,
            payer_kind: data.payer_kind,
            payer_name: data.payer_name,
            property_name: data.property_name,
            status: data.status,
            method: data.method,
            metadata: data.metadata,
            created_at: Utc::now(),
        }
    }
}

/// Filter for the payment listing
///
/// The status constraint is AND'd with the free-text search; the search term
/// itself is OR'd across transaction id, payer-name snapshot and
/// property-name snapshot (case-insensitive substring match).
#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    /// Restricts to one status; `None` means all statuses
    pub status: Option<PaymentStatus>,

    /// Free-text search term; `None` or empty means no search constraint
    pub search: Option<String>,
}

impl PaymentFilter {
    /// Filter matching every payment
    pub fn all() -> Self {
        PaymentFilter::default()
    }

    /// Restricts the filter to one status
    pub fn with_status(mut self, status: PaymentStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Adds a free-text search term
    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }
}

/// Normalized payment view produced by the join resolver
///
/// Every view carries a best-effort `payer_name` (falling back to the
/// [`UNRESOLVED_PAYER`] sentinel), and membership-kind payers additionally
/// surface their plan plus method/metadata fallbacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentView {
    /// Payment id
    pub id: Uuid,

    /// Gateway transaction id
    pub transaction_id: String,

    /// Amount in cents
    pub amount_cents: i64,

    /// Payer collection the reference resolved against
    pub payer_kind: PayerKind,

    /// Snapshot name if present, else the resolved payer's name, else "N/A"
    pub payer_name: String,

    /// Resolved payer's email, when the payer still exists
    pub payer_email: Option<String>,

    /// Property-name snapshot, if any
    pub property_name: Option<String>,

    /// Plan tier, surfaced only when the payer is a Membership
    #[serde(skip_serializing_if = "Option::is_none")]
    pub membership_plan: Option<PlanTier>,

    /// Lifecycle status
    pub status: PaymentStatus,

    /// Payment method; falls back to the Membership's own method when the
    /// payment record lacks one
    pub method: Option<String>,

    /// Gateway metadata, with the same Membership fallback as `method`
    pub metadata: Option<JsonValue>,

    /// When the payment was recorded
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_status_parse() {
        assert_eq!("completed".parse::<PaymentStatus>().unwrap(), PaymentStatus::Completed);
        assert_eq!("pending".parse::<PaymentStatus>().unwrap(), PaymentStatus::Pending);
        assert_eq!("failed".parse::<PaymentStatus>().unwrap(), PaymentStatus::Failed);
        assert!("refunded".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn test_payer_kind_display() {
        assert_eq!(PayerKind::Identity.to_string(), "identity");
        assert_eq!(PayerKind::Membership.to_string(), "membership");
    }

    #[test]
    fn test_filter_builder() {
        let filter = PaymentFilter::all()
            .with_status(PaymentStatus::Pending)
            .with_search("TXN-1");
        assert_eq!(filter.status, Some(PaymentStatus::Pending));
        assert_eq!(filter.search.as_deref(), Some("TXN-1"));

        let all = PaymentFilter::all();
        assert!(all.status.is_none());
        assert!(all.search.is_none());
    }

    #[test]
    fn test_new_payment_keeps_reference() {
        let payer_id = Uuid::new_v4();
        let payment = Payment::new(CreatePayment {
            transaction_id: "TXN-42".to_string(),
            amount_cents: 5_000,
            payer_id,
            payer_kind: PayerKind::Membership,
            payer_name: None,
            property_name: None,
            status: PaymentStatus::Completed,
            method: None,
            metadata: None,
        });
        assert_eq!(payment.payer_id, payer_id);
        assert_eq!(payment.payer_kind, PayerKind::Membership);
        assert_eq!(payment.transaction_id, "TXN-42");
    }
}
