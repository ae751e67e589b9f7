/// Database models for StayNest
///
/// The three collections the consistency engine works over:
///
/// - `identity`: the primary account record with its `is_member` flag
/// - `membership`: the optional paid-tier extension record, linked to an
///   Identity by email only
/// - `payment`: payment records with a polymorphic payer reference
///   discriminated by `PayerKind`

pub mod identity;
pub mod membership;
pub mod payment;

pub use identity::Identity;
pub use membership::{Membership, PlanTier};
pub use payment::{
    CreatePayment, PayerKind, Payment, PaymentFilter, PaymentStatus, PaymentView,
    UNRESOLVED_PAYER,
};
