/// Membership endpoints
///
/// # Endpoints
///
/// - `POST /v1/memberships` - Purchase a membership tier
/// - `GET /v1/memberships/status/:email` - Reconciled membership status
///
/// A purchase does two things: enrolls the Membership (which also flips
/// the Identity's `is_member` flag) and records the payment with the
/// membership as the payer.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use validator::Validate;

use crate::{app::AppState, error::ApiResult, routes::validation_error};
use staynest_shared::enroll::{enroll, NewMembership};
use staynest_shared::models::{
    CreatePayment, Membership, PayerKind, Payment, PaymentStatus, PlanTier,
};
use staynest_shared::reconcile::reconcile;

/// Purchase request
#[derive(Debug, Deserialize, Validate)]
pub struct PurchaseRequest {
    /// Email of the account buying the tier
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Tier to purchase
    pub plan: PlanTier,

    /// Amount paid, in cents
    #[validate(range(min = 1, message = "Amount must be positive"))]
    pub amount_cents: i64,

    /// Payment method (e.g., "card", "paypal")
    #[validate(length(min = 1, message = "Payment method is required"))]
    pub payment_method: String,

    /// Gateway metadata for the payment
    #[serde(default)]
    pub payment_metadata: Option<JsonValue>,

    /// Gateway transaction reference
    #[validate(length(min = 1, message = "Transaction id is required"))]
    pub transaction_id: String,
}

/// Purchase response
#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub membership: Membership,
    pub payment: Payment,
}

/// Membership status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub email: String,
    pub is_member: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub membership: Option<Membership>,
}

/// Purchase a membership tier
///
/// # Errors
///
/// - `404 Not Found`: No identity with this email
/// - `409 Conflict`: A membership already exists for this email, or the
///   transaction id was already recorded
/// - `422 Unprocessable Entity`: Validation failed
/// - `503 Service Unavailable`: Record store unreachable
pub async fn purchase_membership(
    State(state): State<AppState>,
    Json(req): Json<PurchaseRequest>,
) -> ApiResult<(StatusCode, Json<PurchaseResponse>)> {
    req.validate().map_err(validation_error)?;

    let metadata = req.payment_metadata.unwrap_or_else(|| serde_json::json!({}));

    let membership = enroll(
        state.store.as_ref(),
        NewMembership {
            email: req.email,
            plan: req.plan,
            amount_cents: req.amount_cents,
            payment_method: req.payment_method.clone(),
            payment_metadata: metadata.clone(),
        },
    )
    .await?;

    let payment = Payment::new(CreatePayment {
        transaction_id: req.transaction_id,
        amount_cents: req.amount_cents,
        payer_id: membership.id,
        payer_kind: PayerKind::Membership,
        payer_name: Some(membership.member_name.clone()),
        property_name: None,
        status: PaymentStatus::Completed,
        method: Some(req.payment_method),
        metadata: Some(metadata),
    });
    state.store.insert_payment(&payment).await?;

    tracing::info!(
        membership_id = %membership.id,
        email = %membership.email,
        plan = %membership.plan.as_str(),
        "Membership purchased"
    );

    Ok((
        StatusCode::CREATED,
        Json(PurchaseResponse {
            membership,
            payment,
        }),
    ))
}

/// Reconciled membership status for an email
///
/// Always runs the consistency pass, so a drifted `is_member` flag is
/// repaired as a side effect of asking.
pub async fn membership_status(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let reconciled = reconcile(state.store.as_ref(), &email).await?;

    Ok(Json(StatusResponse {
        email,
        is_member: reconciled.is_member,
        membership: reconciled.membership,
    }))
}
