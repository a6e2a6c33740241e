//! API error types and helpers.
//!
//! # Purpose
//! Keeps error response shapes uniform across the JSON endpoints and maps
//! directory faults onto HTTP statuses.
//!
//! # Key invariants
//! - Every error body carries a stable `code` and a human-readable `message`.
//! - Store faults are logged server side; clients only see a generic message.
//!
//! # Security considerations
//! - Messages may echo guest-supplied names and slugs, never store internals.
//! - Request IDs are optional and currently left unset.
use crate::api::types::ErrorResponse;
use crate::directory::DirectoryError;
use crate::store::StoreError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;

/// Structured API error returned by handlers.
///
/// # What it does
/// Couples an HTTP status code with a JSON error body.
///
/// # Invariants
/// - `status` must match the semantics of `body.code`.
///
/// # Example
/// ```rust
/// use axum::http::StatusCode;
/// use invitations::api::error::ApiError;
/// use invitations::api::types::ErrorResponse;
///
/// let err = ApiError {
///     status: StatusCode::CONFLICT,
///     body: ErrorResponse {
///         code: "slug_taken".to_string(),
///         message: "a guest with the invitation link 'john-smith' already exists".to_string(),
///         request_id: None,
///     },
/// };
/// assert_eq!(err.status, StatusCode::CONFLICT);
/// ```
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Map directory faults onto HTTP responses.
///
/// # What it does
/// - `Validation` and `Slug` become 400 `validation_error`.
/// - `SlugTaken` becomes 409 `slug_taken` naming the contested link.
/// - `NotFound` becomes 404 `not_found`.
/// - `Store` is logged and becomes a generic 500 `internal`.
impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Validation(message) => api_validation_error(&message),
            DirectoryError::Slug(err) => api_validation_error(&err.to_string()),
            DirectoryError::SlugTaken(slug) => api_conflict(
                "slug_taken",
                &format!("a guest with the invitation link '{slug}' already exists"),
            ),
            DirectoryError::NotFound => api_not_found("guest not found"),
            DirectoryError::Store(err) => api_internal("guest directory unavailable", &err),
        }
    }
}

fn api_error(status: StatusCode, code: &str, message: &str) -> ApiError {
    ApiError {
        status,
        body: ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
            request_id: None,
        },
    }
}

/// Build a 404 Not Found error.
///
/// # What it does
/// Returns an `ApiError` with code `not_found` and the provided message.
///
/// # Errors
/// - Does not fail.
pub fn api_not_found(message: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, "not_found", message)
}

/// Build a 409 Conflict error.
///
/// # What it does
/// Returns an `ApiError` with the caller-provided `code`, so clients can tell
/// a taken invitation link apart from other conflicts.
///
/// # Errors
/// - Does not fail.
pub fn api_conflict(code: &str, message: &str) -> ApiError {
    api_error(StatusCode::CONFLICT, code, message)
}

/// Build a 500 Internal Server Error from a store fault.
///
/// # What it does
/// Logs `err` at error level and returns code `internal` with `message`.
/// The store error text is not copied into the response.
///
/// # Errors
/// - Does not fail.
pub fn api_internal(message: &str, err: &StoreError) -> ApiError {
    tracing::error!(error = ?err, "invitations storage error");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

/// Build a 400 Bad Request error for rejected input.
///
/// # What it does
/// Returns an `ApiError` with code `validation_error`, used for blank names,
/// names with no usable slug, and malformed query parameters.
///
/// # Errors
/// - Does not fail.
pub fn api_validation_error(message: &str) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, "validation_error", message)
}
