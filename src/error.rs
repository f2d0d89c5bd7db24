use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Error taxonomy for the check-in gate
///
/// Every failure a handler can produce maps onto one of these variants, and
/// each variant maps onto exactly one HTTP status. Backing-store detail is
/// logged at the point of failure and never leaks into the response body.
#[derive(Error, Debug)]
pub enum GateError {
    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("{0}")]
    Validation(String),

    #[error("QR code not found in database")]
    NotFound,

    #[error("QR already used")]
    AlreadyUsed { used_by: String, used_at: String },

    #[error("Too many requests")]
    RateLimited,

    #[error("Backing store error: {0}")]
    BackingStore(String),
}

impl GateError {
    pub fn status(&self) -> StatusCode {
        match self {
            GateError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            GateError::Validation(_) => StatusCode::BAD_REQUEST,
            GateError::NotFound => StatusCode::NOT_FOUND,
            GateError::AlreadyUsed { .. } => StatusCode::CONFLICT,
            GateError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            GateError::BackingStore(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            GateError::AlreadyUsed { used_by, used_at } => json!({
                "error": "QR already used",
                "used_by": used_by,
                "used_at": used_at,
            }),
            // Internal detail stays in the log.
            GateError::BackingStore(detail) => {
                log::error!("Backing store failure surfaced as 500: {}", detail);
                json!({ "error": "Internal server error" })
            }
            other => json!({ "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, GateError>;
