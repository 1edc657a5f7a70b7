use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use futures_util::future::BoxFuture;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use survey_api::gateway::{PaymentGateway, PaymentIntent};
use survey_api::token::TokenService;
use survey_api::{AppState, AppStateInner, router};
use survey_db::{Database, DocumentStore};

/// Gateway that answers every intent with a predictable secret.
pub struct FixedGateway;

impl PaymentGateway for FixedGateway {
    fn create_intent<'a>(
        &'a self,
        amount_minor: i64,
        currency: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<PaymentIntent>> {
        Box::pin(async move {
            Ok(PaymentIntent {
                client_secret: format!("pi_{}_{}_secret", amount_minor, currency),
            })
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_store(Arc::new(Database::open_in_memory().unwrap()), true)
    }

    pub fn with_store(db: Arc<dyn DocumentStore>, gateway: bool) -> Self {
        let payments: Option<Arc<dyn PaymentGateway>> = if gateway {
            Some(Arc::new(FixedGateway))
        } else {
            None
        };
        let state: AppState = Arc::new(AppStateInner {
            db,
            tokens: TokenService::new("integration-secret"),
            payments,
            currency: "usd".into(),
        });
        Self {
            router: router(state.clone()),
            state,
        }
    }

    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    /// Registers the account (if new) and returns a fresh token for it.
    pub async fn login(&self, email: &str) -> String {
        let (status, _) = self
            .call("PUT", "/users", None, Some(json!({ "email": email, "name": "Tester" })))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = self
            .call("POST", "/jwt", None, Some(json!({ "email": email })))
            .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    /// Logs in and sets the account's role directly in the store.
    pub async fn login_as(&self, email: &str, role: survey_types::models::Role) -> String {
        let token = self.login(email).await;
        let target = email.to_string();
        self.state
            .with_store(move |db| Ok(survey_db::UserStore::new(db).set_role_by_email(&target, role)?))
            .await
            .unwrap();
        token
    }
}
