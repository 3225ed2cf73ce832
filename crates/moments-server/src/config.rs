use std::path::PathBuf;

use anyhow::Context;

/// Placeholder JWT secrets that are only acceptable for local development.
pub const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    /// Where unauthenticated requests are redirected.
    pub identity_url: String,
    pub jwt_secret: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let port = var_or("MOMENTS_PORT", "8081")
            .parse()
            .context("MOMENTS_PORT must be a port number")?;

        Ok(Self {
            db_path: var_or("MOMENTS_DB_PATH", "moments.db").into(),
            host: var_or("MOMENTS_HOST", "0.0.0.0"),
            port,
            identity_url: var_or("MOMENTS_IDENTITY_URL", "http://localhost:8080/login"),
            jwt_secret: var_or("MOMENTS_JWT_SECRET", "dev-secret-change-me"),
        })
    }

    pub fn uses_placeholder_secret(&self) -> bool {
        PLACEHOLDER_SECRETS.contains(&self.jwt_secret.as_str())
    }
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}
