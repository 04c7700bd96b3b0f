use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub s3_region: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    /// Bearer tokens accepted by `POST /generate`.
    pub api_tokens: HashSet<String>,
    pub layout_config_path: PathBuf,
    pub options_config_path: PathBuf,
    pub signed_url_ttl: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let api_tokens = parse_tokens(&require_env("API_TOKENS")?);
        if api_tokens.is_empty() {
            anyhow::bail!("API_TOKENS must contain at least one token");
        }

        Ok(Config {
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            s3_region: env_or("S3_REGION", "us-east-1"),
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            api_tokens,
            layout_config_path: env_or("LAYOUT_CONFIG_PATH", "config/layout.json").into(),
            options_config_path: env_or("OPTIONS_CONFIG_PATH", "config/options.json").into(),
            signed_url_ttl: Duration::from_secs(
                env_or("SIGNED_URL_TTL_SECS", "3600")
                    .parse::<u64>()
                    .context("SIGNED_URL_TTL_SECS must be a number of seconds")?,
            ),
            port: env_or("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Splits a comma-separated token list, dropping blanks.
pub fn parse_tokens(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reads one of the worksheet JSON documents. A missing options file is allowed and
/// resolves to defaults; a missing layout file is not.
pub fn read_json_document(path: &Path, required: bool) -> Result<Value> {
    match std::fs::read_to_string(path) {
        Ok(raw) => serde_json::from_str(&raw)
            .with_context(|| format!("'{}' is not valid JSON", path.display())),
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => Ok(Value::Null),
        Err(e) => Err(e).with_context(|| format!("Failed to read '{}'", path.display())),
    }
}
