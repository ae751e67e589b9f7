/// Account endpoints
///
/// # Endpoints
///
/// - `POST /v1/identities` - Sign up a new account
/// - `DELETE /v1/identities/:id` - Delete an account
///
/// Deleting an account does not touch the Membership collection here; the
/// cascade watcher reacts to the store's delete event (or, failing that,
/// the sweep catches the orphan).

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::validation_error,
};
use staynest_shared::models::Identity;

/// Sign-up request
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    /// Email address; the natural key shared with the Membership collection
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// Display name
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
}

/// Sign-up response; never carries the password hash
#[derive(Debug, Serialize)]
pub struct IdentityResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub is_member: bool,
    pub created_at: DateTime<Utc>,
}

/// Sign up a new account
///
/// # Errors
///
/// - `409 Conflict`: Email already registered
/// - `422 Unprocessable Entity`: Validation failed
/// - `503 Service Unavailable`: Record store unreachable
pub async fn create_identity(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<(StatusCode, Json<IdentityResponse>)> {
    req.validate().map_err(validation_error)?;

    if state
        .store
        .find_identity_by_email(&req.email)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("Email already registered".to_string()));
    }

    let password_hash = hash_password(&req.password)?;
    let identity = Identity::new(&req.email, &req.name, &password_hash);

    // The unique index backstops the pre-check under concurrent sign-ups.
    state.store.insert_identity(&identity).await?;

    tracing::info!(identity_id = %identity.id, email = %identity.email, "Identity created");

    Ok((
        StatusCode::CREATED,
        Json(IdentityResponse {
            id: identity.id,
            email: identity.email,
            name: identity.name,
            is_member: identity.is_member,
            created_at: identity.created_at,
        }),
    ))
}

/// Delete an account by id
///
/// # Errors
///
/// - `404 Not Found`: No identity with this id
/// - `503 Service Unavailable`: Record store unreachable
pub async fn delete_identity(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if state.store.delete_identity(id).await? {
        tracing::info!(identity_id = %id, "Identity deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Identity not found".to_string()))
    }
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::InternalError(format!("Password hashing failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password_produces_phc_string() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2"));
    }

    #[test]
    fn test_signup_request_validation() {
        let bad = SignupRequest {
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            name: String::new(),
        };
        let errors = bad.validate().unwrap_err();
        assert_eq!(errors.field_errors().len(), 3);

        let good = SignupRequest {
            email: "alice@example.com".to_string(),
            password: "long enough password".to_string(),
            name: "Alice".to_string(),
        };
        assert!(good.validate().is_ok());
    }
}
