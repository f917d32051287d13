//! Text embeddings for similarity recall
//!
//! `GeminiEmbedder` calls the Gemini `batchEmbedContents` endpoint.
//! `LocalEmbedder` is a deterministic feature-hashing embedder used when no
//! provider key is configured.

use crate::error::AdvisorError;
use crate::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, error};

/// Dimension of `LocalEmbedder` vectors
pub const LOCAL_EMBEDDING_DIM: usize = 256;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";

#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    fn name(&self) -> &str;

    /// One vector per input text, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AdvisorError::EmbeddingError("No embedding returned".to_string()))
    }
}

/// Calculate cosine similarity between two vectors.
pub fn cosine_similarity(v1: &[f32], v2: &[f32]) -> f32 {
    if v1.len() != v2.len() || v1.is_empty() {
        return 0.0;
    }
    let dot_product: f32 = v1.iter().zip(v2).map(|(a, b)| a * b).sum();
    let mag1: f32 = v1.iter().map(|a| a * a).sum::<f32>().sqrt();
    let mag2: f32 = v2.iter().map(|a| a * a).sum::<f32>().sqrt();
    if mag1 == 0.0 || mag2 == 0.0 {
        return 0.0;
    }
    dot_product / (mag1 * mag2)
}

// =============================
// Gemini
// =============================

pub struct GeminiEmbedder {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiEmbedder {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(20))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model,
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedRequest<'a>>,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: String,
    content: EmbedContent<'a>,
}

#[derive(Debug, Serialize)]
struct EmbedContent<'a> {
    parts: Vec<EmbedPart<'a>>,
}

#[derive(Debug, Serialize)]
struct EmbedPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[async_trait::async_trait]
impl Embedder for GeminiEmbedder {
    fn name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let model_path = format!("models/{}", self.model);
        let request = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedRequest {
                    model: model_path.clone(),
                    content: EmbedContent {
                        parts: vec![EmbedPart { text }],
                    },
                })
                .collect(),
        };

        let url = format!("{}/{}:batchEmbedContents", self.base_url, model_path);

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                AdvisorError::EmbeddingError(format!(
                    "Embedding request failed: {}",
                    e.without_url()
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Embedding API error response ({}): {}", status, error_text);
            return Err(AdvisorError::EmbeddingError(format!(
                "Embedding API error ({}): {}",
                status, error_text
            )));
        }

        let parsed: BatchEmbedResponse = response.json().await.map_err(|e| {
            AdvisorError::EmbeddingError(format!("Embedding parse error: {}", e.without_url()))
        })?;

        if parsed.embeddings.len() != texts.len() {
            return Err(AdvisorError::EmbeddingError(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                parsed.embeddings.len()
            )));
        }

        Ok(parsed.embeddings.into_iter().map(|e| e.values).collect())
    }
}

// =============================
// Local feature hashing
// =============================

/// Hashes lowercase word unigrams and bigrams into a fixed-size,
/// L2-normalized vector. Texts sharing vocabulary land close together.
#[derive(Debug, Clone)]
pub struct LocalEmbedder {
    dim: usize,
}

impl LocalEmbedder {
    pub fn new() -> Self {
        Self::with_dim(LOCAL_EMBEDDING_DIM)
    }

    pub fn with_dim(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let words: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 1)
            .map(str::to_lowercase)
            .collect();

        let mut vector = vec![0f32; self.dim];

        for word in &words {
            self.bump(&mut vector, word, 1.0);
        }
        for pair in words.windows(2) {
            self.bump(&mut vector, &format!("{} {}", pair[0], pair[1]), 0.5);
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }

        vector
    }

    fn bump(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let hash = Sha256::digest(feature.as_bytes());
        let mut bucket_bytes = [0u8; 8];
        bucket_bytes.copy_from_slice(&hash[..8]);
        let bucket = (u64::from_le_bytes(bucket_bytes) % self.dim as u64) as usize;
        let sign = if hash[8] & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

impl Default for LocalEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Embedder for LocalEmbedder {
    fn name(&self) -> &str {
        "local-hash"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_gemini_embed_error_omits_key() {
        let embedder = GeminiEmbedder::new(
            "SECRET-KEY-123".to_string(),
            "text-embedding-004".to_string(),
        )
        .unwrap()
        .with_base_url("http://127.0.0.1:1");

        let err = embedder.embed(&["Stripe pricing".to_string()]).await.unwrap_err();
        assert!(matches!(err, AdvisorError::EmbeddingError(_)));
        assert!(!err.to_string().contains("SECRET-KEY-123"));
    }

    #[test]
    fn test_cosine_similarity_edges() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_local_embedder_is_deterministic_and_normalized() {
        let embedder = LocalEmbedder::new();
        let a = embedder.embed_text("Stripe pricing changes in Europe");
        let b = embedder.embed_text("Stripe pricing changes in Europe");

        assert_eq!(a, b);
        assert_eq!(a.len(), LOCAL_EMBEDDING_DIM);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_local_embedder_groups_shared_vocabulary() {
        let embedder = LocalEmbedder::new();
        let query = embedder.embed_text("latest news about Stripe pricing");
        let related = embedder.embed_text("Stripe announced new pricing for payments");
        let unrelated = embedder.embed_text("weather forecast for the weekend hiking trip");

        assert!(
            cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated)
        );
    }

    #[test]
    fn test_local_embedder_empty_text_is_zero_vector() {
        let embedder = LocalEmbedder::with_dim(8);
        assert_eq!(embedder.embed_text("  "), vec![0.0; 8]);
    }

    #[tokio::test]
    async fn test_embed_one() {
        let embedder = LocalEmbedder::new();
        let vector = embedder.embed_one("Figma vs Canva").await.unwrap();
        assert_eq!(vector.len(), LOCAL_EMBEDDING_DIM);
    }
}
