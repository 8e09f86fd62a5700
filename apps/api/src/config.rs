use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub run_migrations: bool,
    pub redis_url: String,
    pub fit_cache_ttl_secs: u64,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub s3_region: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub anthropic_api_key: String,
    pub embedding: EmbeddingConfig,
    pub port: u16,
    pub rust_log: String,
}

/// Remote embedding endpoint. When `api_url` is unset the service falls back
/// to the local hashing embedder.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // .env is optional

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("Required environment variable '{key}' is not set"))
        };
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Config {
            database_url: require("DATABASE_URL")?,
            db_max_connections: optional("DB_MAX_CONNECTIONS")
                .map(|v| v.parse::<u32>())
                .transpose()
                .context("DB_MAX_CONNECTIONS must be a positive integer")?
                .unwrap_or(10),
            run_migrations: optional("RUN_MIGRATIONS")
                .map(|v| parse_bool(&v))
                .transpose()
                .context("RUN_MIGRATIONS must be true or false")?
                .unwrap_or(true),
            redis_url: require("REDIS_URL")?,
            fit_cache_ttl_secs: optional("FIT_CACHE_TTL_SECS")
                .map(|v| v.parse::<u64>())
                .transpose()
                .context("FIT_CACHE_TTL_SECS must be a number of seconds")?
                .unwrap_or(86_400),
            s3_bucket: require("S3_BUCKET")?,
            s3_endpoint: require("S3_ENDPOINT")?,
            s3_region: optional("S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            aws_access_key_id: require("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: require("ANTHROPIC_API_KEY")?,
            embedding: EmbeddingConfig {
                api_url: optional("EMBEDDING_API_URL"),
                api_key: optional("EMBEDDING_API_KEY"),
                model: optional("EMBEDDING_MODEL")
                    .unwrap_or_else(|| "text-embedding-3-small".to_string()),
            },
            port: optional("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("invalid boolean '{other}'"),
    }
}
