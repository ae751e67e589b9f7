/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `identities`: Account sign-up and deletion
/// - `profile`: Profile view with reconciled membership status
/// - `memberships`: Tier purchase and membership status
/// - `payments`: Resolved payment views
/// - `admin`: On-demand orphan sweep

pub mod admin;
pub mod health;
pub mod identities;
pub mod memberships;
pub mod payments;
pub mod profile;

use crate::error::{ApiError, ValidationErrorDetail};

/// Flattens `validator` errors into the API's validation-error shape
pub(crate) fn validation_error(e: validator::ValidationErrors) -> ApiError {
    let errors: Vec<ValidationErrorDetail> = e
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| ValidationErrorDetail {
                field: field.to_string(),
                message: error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Validation failed".to_string()),
            })
        })
        .collect();
    ApiError::ValidationError(errors)
}
