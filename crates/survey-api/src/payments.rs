use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::Value;
use tracing::{error, info};

use survey_db::{DocumentStore, PaymentLedger, UserStore};
use survey_types::api::{PaymentIntentRequest, PaymentIntentResponse, PaymentReceipt};
use survey_types::models::{Document, Role};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::AppJson;

/// Converts a decimal price to integer minor units (19.99 -> 1999).
pub fn to_minor_units(price: f64) -> Result<i64, ApiError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(ApiError::Validation("price must be a positive amount".to_string()));
    }
    let minor = (price * 100.0).round();
    if minor < 1.0 || minor > i64::MAX as f64 {
        return Err(ApiError::Validation("price out of range".to_string()));
    }
    Ok(minor as i64)
}

/// Records the payment, then promotes the payer to pro-user.
///
/// The writes are independent. If the promotion fails the payment stays
/// recorded and the payer is left un-upgraded; the error says so in the log.
pub fn settle(db: &dyn DocumentStore, payment: Document) -> Result<PaymentReceipt, ApiError> {
    let email = match payment.get("email") {
        Some(Value::String(email)) if !email.is_empty() => email.clone(),
        _ => return Err(ApiError::Validation("payment has no email".to_string())),
    };

    let payment_result = PaymentLedger::new(db).record(payment)?;

    let user_update_result = UserStore::new(db)
        .set_role_by_email(&email, Role::ProUser)
        .map_err(|e| {
            error!(
                "Payment {} recorded but {} was not promoted to {}: {:#}",
                payment_result.inserted_id,
                email,
                Role::ProUser,
                e
            );
            ApiError::Store(e)
        })?;

    info!(
        "Payment {} settled for {} (role updates: {})",
        payment_result.inserted_id, email, user_update_result.modified_count
    );
    Ok(PaymentReceipt {
        payment_result,
        user_update_result,
    })
}

/// POST /create-payment-intent
pub async fn create_payment_intent(
    State(state): State<AppState>,
    AppJson(req): AppJson<PaymentIntentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let amount = to_minor_units(req.price)?;
    let gateway = state
        .payments
        .as_ref()
        .ok_or_else(|| ApiError::Gateway(anyhow::anyhow!("no payment gateway configured")))?;

    let intent = gateway
        .create_intent(amount, &state.currency)
        .await
        .map_err(ApiError::Gateway)?;

    Ok(Json(PaymentIntentResponse {
        client_secret: intent.client_secret,
    }))
}

/// POST /payments
pub async fn record_payment(
    State(state): State<AppState>,
    AppJson(payment): AppJson<Document>,
) -> Result<impl IntoResponse, ApiError> {
    let receipt = state.with_store(move |db| settle(db, payment)).await?;
    Ok(Json(receipt))
}

/// GET /payments
pub async fn list_payments(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let payments = state
        .with_store(|db| Ok(PaymentLedger::new(db).list_all()?))
        .await?;
    Ok(Json(payments))
}

/// GET /payments/{email}
pub async fn payments_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let payments = state
        .with_store(move |db| Ok(PaymentLedger::new(db).by_email(&email)?))
        .await?;
    Ok(Json(payments))
}
