use std::time::Duration;

use anyhow::{Context, bail};
use futures_util::future::BoxFuture;
use serde::Deserialize;
use tracing::info;

/// What the client needs to finish a card payment in the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub client_secret: String,
}

/// External payment processor. Amounts are integer minor units (cents).
pub trait PaymentGateway: Send + Sync {
    fn create_intent<'a>(
        &'a self,
        amount_minor: i64,
        currency: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<PaymentIntent>>;
}

pub const STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Stripe `PaymentIntents` over plain form-encoded HTTP.
pub struct StripeGateway {
    http: reqwest::Client,
    secret_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct StripeIntent {
    id: String,
    client_secret: String,
}

impl StripeGateway {
    pub fn new(secret_key: String) -> anyhow::Result<Self> {
        Self::with_base_url(secret_key, STRIPE_API_BASE.to_string())
    }

    pub fn with_base_url(secret_key: String, base_url: String) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            http,
            secret_key,
            base_url,
        })
    }
}

impl PaymentGateway for StripeGateway {
    fn create_intent<'a>(
        &'a self,
        amount_minor: i64,
        currency: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<PaymentIntent>> {
        Box::pin(async move {
            let response = self
                .http
                .post(format!("{}/v1/payment_intents", self.base_url))
                .bearer_auth(&self.secret_key)
                .form(&[
                    ("amount", amount_minor.to_string()),
                    ("currency", currency.to_string()),
                    ("payment_method_types[]", "card".to_string()),
                ])
                .send()
                .await
                .context("payment intent request failed")?;

            let status = response.status();
            let body = response.bytes().await?;
            if !status.is_success() {
                bail!(
                    "gateway answered {}: {}",
                    status,
                    String::from_utf8_lossy(&body)
                );
            }

            let intent: StripeIntent =
                serde_json::from_slice(&body).context("unexpected payment intent body")?;
            info!("Created payment intent {} for {} {}", intent.id, amount_minor, currency);
            Ok(PaymentIntent {
                client_secret: intent.client_secret,
            })
        })
    }
}
