/// Profile endpoint
///
/// # Endpoints
///
/// - `GET /v1/profile/:email` - Profile with reconciled membership status
///
/// The profile always reflects the reconciled membership state, except
/// when the store fails mid-reconcile: then the response degrades to the
/// identity's last-known flag rather than erroring, since a profile read
/// should survive a transient store outage.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use staynest_shared::error::CoreError;
use staynest_shared::models::PlanTier;
use staynest_shared::reconcile::reconcile;

/// Profile response
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub is_member: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_since: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fetch a profile by email
///
/// # Errors
///
/// - `404 Not Found`: No identity with this email
/// - `503 Service Unavailable`: Record store unreachable for the identity
///   lookup itself (the membership reconcile degrades instead)
pub async fn get_profile(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Json<ProfileResponse>> {
    let identity = state
        .store
        .find_identity_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))?;

    let (is_member, membership) = match reconcile(state.store.as_ref(), &email).await {
        Ok(reconciled) => (reconciled.is_member, reconciled.membership),
        Err(CoreError::Store(err)) => {
            tracing::warn!(
                email,
                error = %err,
                "Reconcile failed, serving last-known membership flag"
            );
            (identity.is_member, None)
        }
        Err(other) => return Err(other.into()),
    };

    Ok(Json(ProfileResponse {
        id: identity.id,
        email: identity.email,
        name: identity.name,
        is_member,
        plan: membership.as_ref().map(|m| m.plan),
        member_since: membership.as_ref().map(|m| m.joined_at),
        created_at: identity.created_at,
    }))
}
