/// Payment endpoints
///
/// # Endpoints
///
/// - `GET /v1/payments?status=&search=` - Resolved payment views
///
/// The listing goes through the join resolver, so every row carries a
/// payer name (the `"N/A"` sentinel when the payer is gone) and membership
/// payers surface their plan.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use staynest_shared::models::{PaymentFilter, PaymentStatus, PaymentView};
use staynest_shared::payments::resolve_payments;

/// Payment listing query parameters
#[derive(Debug, Deserialize)]
pub struct PaymentQuery {
    /// Status filter; omitted, empty or `all` means no filter
    pub status: Option<String>,

    /// Case-insensitive substring match over transaction id, payer name
    /// and property name
    pub search: Option<String>,
}

/// Payment listing response
#[derive(Debug, Serialize)]
pub struct PaymentListResponse {
    pub payments: Vec<PaymentView>,
    pub count: usize,
}

/// List payments with resolved payer details
///
/// # Errors
///
/// - `400 Bad Request`: Unknown status value
/// - `503 Service Unavailable`: Record store unreachable
pub async fn list_payments(
    State(state): State<AppState>,
    Query(query): Query<PaymentQuery>,
) -> ApiResult<Json<PaymentListResponse>> {
    let mut filter = PaymentFilter::all();

    if let Some(status) = query.status.as_deref() {
        if !status.is_empty() && status != "all" {
            let status: PaymentStatus = status.parse().map_err(|_| {
                ApiError::BadRequest(format!(
                    "Unknown status '{}', expected completed, pending or failed",
                    status
                ))
            })?;
            filter = filter.with_status(status);
        }
    }

    if let Some(search) = query.search {
        if !search.trim().is_empty() {
            filter = filter.with_search(search.trim());
        }
    }

    let payments = resolve_payments(state.store.as_ref(), &filter).await?;
    let count = payments.len();

    Ok(Json(PaymentListResponse { payments, count }))
}
