use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

/// Every failure a handler or gate can surface.
///
/// Store and gateway causes are logged and replaced with a generic message;
/// clients only ever see the status code and an `{"error": ...}` body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No token provided")]
    Unauthenticated,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Forbidden access")]
    Forbidden,

    #[error("{0}")]
    Validation(String),

    #[error("store failure: {0:#}")]
    Store(#[from] anyhow::Error),

    #[error("payment gateway failure: {0:#}")]
    Gateway(anyhow::Error),

    #[error("internal error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            // Signature and expiry failures have always been answered with 403
            Self::InvalidToken | Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Store(_) | Self::Gateway(_) | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!("{}", self);
            "Internal Server Error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
