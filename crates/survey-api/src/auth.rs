use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::Value;
use tracing::{error, info};

use survey_db::DocumentStore;
use survey_types::api::TokenResponse;

use crate::error::ApiError;
use crate::extract::AppJson;
use crate::gateway::PaymentGateway;
use crate::token::TokenService;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<dyn DocumentStore>,
    pub tokens: TokenService,
    /// `None` when no gateway key is configured; payment intents then fail.
    pub payments: Option<Arc<dyn PaymentGateway>>,
    /// ISO currency code sent with payment intents.
    pub currency: String,
}

impl AppStateInner {
    /// Runs blocking store work off the async runtime.
    pub async fn with_store<F, T>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&dyn DocumentStore) -> Result<T, ApiError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(db.as_ref()))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ApiError::Internal
            })?
    }
}

/// POST /jwt: signs whatever identity the client logged in with.
pub async fn issue_token(
    State(state): State<AppState>,
    AppJson(identity): AppJson<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let token = state.tokens.issue(&identity)?;
    if let Some(email) = identity.get("email").and_then(Value::as_str) {
        info!("Issued token for {}", email);
    }
    Ok(Json(TokenResponse { token }))
}
