use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde_json::Value;
use tracing::{debug, error};

use survey_types::api::Claims;

use crate::error::ApiError;

/// Tokens are valid for two hours. There is no refresh; clients log in again.
pub const TOKEN_TTL_SECS: i64 = 2 * 60 * 60;

/// Claims the server sets itself. Client-supplied values are dropped.
const RESERVED_CLAIMS: &[&str] = &["iat", "exp", "nbf", "aud"];

/// Issues and verifies stateless HS256 identity tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is exact: a token is dead the second it turns two hours old
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Signs the identity sent at login. It must be an object with a
    /// non-empty `email`; its other fields travel in the token as profile.
    pub fn issue(&self, identity: &Value) -> Result<String, ApiError> {
        self.issue_at(identity, Utc::now())
    }

    pub fn issue_at(&self, identity: &Value, issued_at: DateTime<Utc>) -> Result<String, ApiError> {
        let Value::Object(fields) = identity else {
            return Err(invalid_user_data());
        };
        let mut profile = fields.clone();
        let email = match profile.remove("email") {
            Some(Value::String(email)) if !email.trim().is_empty() => email,
            _ => return Err(invalid_user_data()),
        };
        for reserved in RESERVED_CLAIMS {
            profile.remove(*reserved);
        }

        let iat = issued_at.timestamp();
        let claims = Claims {
            email,
            iat,
            exp: iat + TOKEN_TTL_SECS,
            profile,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| {
            error!("Error generating token: {}", e);
            ApiError::Internal
        })
    }

    pub fn verify(&self, token: Option<&str>) -> Result<Claims, ApiError> {
        let token = token.ok_or(ApiError::Unauthenticated)?;
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Token rejected: {}", e);
                ApiError::InvalidToken
            })
    }
}

fn invalid_user_data() -> ApiError {
    ApiError::Validation("Invalid user data".to_string())
}
