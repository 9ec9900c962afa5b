use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub port: u16,
    pub rust_log: String,
    /// Remote similarity service. Unset means the local TF-IDF scorer.
    pub scoring_api_url: Option<String>,
    pub scoring_strategy: String,
    pub scoring_concurrency: usize,
    pub scoring_timeout_secs: u64,
    /// Allowed CORS origin. Unset means permissive CORS.
    pub frontend_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            port: env_or("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
            scoring_api_url: optional_env("SCORING_API_URL"),
            scoring_strategy: env_or("SCORING_STRATEGY", "sequential"),
            scoring_concurrency: env_or("SCORING_CONCURRENCY", "4")
                .parse::<usize>()
                .context("SCORING_CONCURRENCY must be a positive integer")?,
            scoring_timeout_secs: env_or("SCORING_TIMEOUT_SECS", "30")
                .parse::<u64>()
                .context("SCORING_TIMEOUT_SECS must be a whole number of seconds")?,
            frontend_url: optional_env("FRONTEND_URL"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
