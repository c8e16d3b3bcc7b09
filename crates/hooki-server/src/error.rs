use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hooki_shared::HookiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Persistence failed; the client may retry.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Too many realtime connections (max {0})")]
    TooManyConnections(usize),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<HookiError> for ServerError {
    fn from(err: HookiError) -> Self {
        match err {
            HookiError::NotFound { .. } => ServerError::NotFound(err.to_string()),
            HookiError::Authorization { .. } => ServerError::Forbidden(err.to_string()),
            HookiError::Validation(msg) => ServerError::BadRequest(msg),
            HookiError::Store(msg) => ServerError::Unavailable(msg),
            HookiError::TransientDelivery(_) => ServerError::Internal(err.to_string()),
        }
    }
}

impl From<hooki_store::StoreError> for ServerError {
    fn from(err: hooki_store::StoreError) -> Self {
        ServerError::from(HookiError::from(err))
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ServerError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::Unavailable(detail) => {
                tracing::error!(error = %detail, "Store operation failed");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Storage temporarily unavailable, please retry".to_string(),
                )
            }
            ServerError::TooManyConnections(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
            ServerError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
