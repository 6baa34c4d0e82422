use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use clair_core::error::CoreError;
use clair_worker::dispatcher::SubmitError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce consistent JSON error responses
/// of the form `{"error": "...", "code": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `clair_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Admission was refused.
    #[error(transparent)]
    Submit(#[from] SubmitError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => match core {
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Config(msg) => {
                    tracing::error!(error = %msg, "Configuration error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            AppError::Submit(err) => classify_submit_error(err),

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Map an admission refusal to an HTTP status, error code, and message.
///
/// Store failures are reported without their underlying cause.
fn classify_submit_error(err: &SubmitError) -> (StatusCode, &'static str, String) {
    match err {
        SubmitError::EmptyPrompt => (StatusCode::BAD_REQUEST, "EMPTY_PROMPT", err.to_string()),
        SubmitError::Unsafe => (StatusCode::UNPROCESSABLE_ENTITY, "UNSAFE", err.to_string()),
        SubmitError::QuotaExceeded { .. } => {
            (StatusCode::TOO_MANY_REQUESTS, "QUOTA_EXCEEDED", err.to_string())
        }
        SubmitError::QueueClosed => {
            (StatusCode::SERVICE_UNAVAILABLE, "QUEUE_CLOSED", err.to_string())
        }
        SubmitError::StoreUnavailable(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "STORE_UNAVAILABLE",
            "Quota store unavailable, try again later".to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use clair_core::job::JobKind;

    use super::*;

    #[test]
    fn quota_exceeded_maps_to_429() {
        let (status, code, message) = classify_submit_error(&SubmitError::QuotaExceeded {
            kind: JobKind::Image,
            limit: 3,
        });
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(code, "QUOTA_EXCEEDED");
        assert!(message.contains("3/3"));
    }

    #[test]
    fn unsafe_maps_to_422() {
        let (status, code, _) = classify_submit_error(&SubmitError::Unsafe);
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(code, "UNSAFE");
    }
}
