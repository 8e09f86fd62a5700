//! Text embeddings for semantic university search.
//!
//! Default: `HashingEmbedder` (pure Rust, deterministic, no network).
//! `HttpEmbedder` calls an OpenAI-compatible `/embeddings` endpoint when one is configured.
//! `AppState` holds an `Arc<dyn Embedder>` chosen at startup.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EmbeddingConfig;
use crate::errors::AppError;
use crate::knowledge::text::tokenize;

pub const HASHING_DIMENSIONS: usize = 256;

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AppError>;

    /// Label stored alongside results, for transparency.
    fn backend(&self) -> &'static str;
}

/// Feature-hashing embedder over unigrams and bigrams, L2-normalized.
///
/// Captures lexical overlap rather than meaning, but is stable across
/// restarts so stored vectors stay comparable with query vectors.
pub struct HashingEmbedder {
    dimensions: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dimensions: HASHING_DIMENSIONS,
        }
    }
}

impl HashingEmbedder {
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimensions];
        let tokens = tokenize(text);

        let bigrams = tokens.windows(2).map(|w| format!("{} {}", w[0], w[1]));
        let features = tokens.iter().cloned().chain(bigrams);

        for feature in features {
            let hash = fnv1a(feature.as_bytes());
            let index = (hash % self.dimensions as u64) as usize;
            // High bit picks the sign so collisions cancel instead of pile up.
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[index] += sign;
        }

        normalize(&mut vector);
        vector
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AppError> {
        Ok(self.embed_sync(text))
    }

    fn backend(&self) -> &'static str {
        "hashing"
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    bytes.iter().fold(OFFSET, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(PRIME)
    })
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
}

/// Cosine similarity; 0.0 for empty, zero or mismatched vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Client for an OpenAI-compatible embeddings API.
pub struct HttpEmbedder {
    client: Client,
    url: String,
    api_key: Option<String>,
    model: String,
}

impl HttpEmbedder {
    pub fn new(base_url: &str, api_key: Option<String>, model: String) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            url: format!("{}/embeddings", base_url.trim_end_matches('/')),
            api_key,
            model,
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AppError> {
        let mut request = self.client.post(&self.url).json(&EmbeddingRequest {
            model: &self.model,
            input: text,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("request to {} failed: {e}", self.url)))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Embedding(format!("status {status}: {body}")));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("invalid response body: {e}")))?;
        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| AppError::Embedding("response contained no embeddings".to_string()))?;

        debug!("Embedded {} chars into {} dims", text.len(), embedding.len());
        Ok(embedding)
    }

    fn backend(&self) -> &'static str {
        "http"
    }
}

/// Picks the embedder for the configured environment.
pub fn build_embedder(config: &EmbeddingConfig) -> anyhow::Result<std::sync::Arc<dyn Embedder>> {
    Ok(match &config.api_url {
        Some(url) => std::sync::Arc::new(HttpEmbedder::new(
            url,
            config.api_key.clone(),
            config.model.clone(),
        )?),
        None => std::sync::Arc::new(HashingEmbedder::default()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashing_embedding_is_deterministic_and_normalized() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed_sync("strong computer science program");
        let b = embedder.embed_sync("strong computer science program");
        assert_eq!(a, b);
        assert_eq!(a.len(), HASHING_DIMENSIONS);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_related_text_is_closer() {
        let embedder = HashingEmbedder::default();
        let query = embedder.embed_sync("computer science engineering");
        let close = embedder.embed_sync("top computer science and engineering school");
        let far = embedder.embed_sync("liberal arts college for music and theater");
        assert!(cosine_similarity(&query, &close) > cosine_similarity(&query, &far));
    }

    #[test]
    fn test_empty_text_gives_zero_vector() {
        let v = HashingEmbedder::default().embed_sync("the of and");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_cosine_handles_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 1.0], &[2.0, 2.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_fnv1a_known_vector() {
        assert_eq!(fnv1a(b""), 0xcbf29ce484222325);
        assert_eq!(fnv1a(b"a"), 0xaf63dc4c8601ec8c);
    }

    #[test]
    fn test_build_embedder_defaults_to_hashing() {
        let embedder = build_embedder(&EmbeddingConfig::default()).unwrap();
        assert_eq!(embedder.backend(), "hashing");
    }
}
