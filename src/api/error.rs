use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::usage::UsageError;

/// Error type for API handlers
///
/// Every failure is reported as a 500 with a `{"error": "..."}` body; the
/// dashboard treats any non-2xx response the same way.
#[derive(Debug)]
pub enum ApiError {
    /// Sampling failed (missing accounting file, no GPU, ...)
    Usage(UsageError),
    /// Metrics could not be encoded
    Metrics(prometheus::Error),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Usage(e) => write!(f, "{}", e),
            ApiError::Metrics(e) => write!(f, "metrics error: {}", e),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<UsageError> for ApiError {
    fn from(e: UsageError) -> Self {
        ApiError::Usage(e)
    }
}

impl From<prometheus::Error> for ApiError {
    fn from(e: prometheus::Error) -> Self {
        ApiError::Metrics(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        error!(error = %message, "Request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": message }))).into_response()
    }
}
