use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub stripe_secret_key: Option<String>,
    pub currency: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, so tests need not touch the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = lookup("SURVEY_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("SURVEY_JWT_SECRET is unset or still a placeholder; set it in .env and restart");
        }

        let port = match lookup("SURVEY_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("SURVEY_PORT is not a port number: {}", raw))?,
            None => 5000,
        };

        Ok(Self {
            jwt_secret,
            db_path: lookup("SURVEY_DB_PATH")
                .unwrap_or_else(|| "survey.db".into())
                .into(),
            host: lookup("SURVEY_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            stripe_secret_key: lookup("STRIPE_SECRET_KEY").filter(|k| !k.is_empty()),
            currency: lookup("SURVEY_CURRENCY").unwrap_or_else(|| "usd".into()),
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}
