use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use redis::Client as RedisClient;
use sqlx::PgPool;

use crate::config::Config;
use crate::fit::scoring::FitScorer;
use crate::knowledge::embedding::Embedder;
use crate::llm_client::LlmClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Fit result cache.
    pub redis: RedisClient,
    pub s3: S3Client,
    pub llm: LlmClient,
    pub config: Config,
    /// Pluggable fit scorer. Default: RubricFitScorer.
    pub fit_scorer: Arc<dyn FitScorer>,
    /// Hashing embedder unless EMBEDDING_API_URL is set.
    pub embedder: Arc<dyn Embedder>,
}
