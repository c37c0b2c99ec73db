//! Embedding provider clients.
//!
//! `GeminiEmbedder` talks to the Google Generative Language embedding API;
//! `MockEmbedder` produces deterministic vectors for offline development and
//! tests. Provider failures are not retried: at index-build time they abort
//! startup, at request time they surface to the caller.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, Result};

/// Default API root for the Google Generative Language REST API.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Maximum texts per batchEmbedContents request.
const BATCH_LIMIT: usize = 100;

/// Trait for embedding generation
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed many texts, preserving input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Model identifier, recorded in the index manifest.
    fn model_name(&self) -> &str;
}

/// Client for the `embedContent` / `batchEmbedContents` endpoints.
pub struct GeminiEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct EmbedContent<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    content: EmbedContent<'a>,
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedRequest<'a>>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

impl GeminiEmbedder {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self> {
        Self::with_base_url(api_key, model, timeout, DEFAULT_API_BASE.to_string())
    }

    /// Point the client at a different API root (used by contract tests).
    pub fn with_base_url(
        api_key: String,
        model: String,
        timeout: Duration,
        base_url: String,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            api_key,
            model,
            base_url,
        })
    }

    fn request<'a>(&'a self, text: &'a str) -> EmbedRequest<'a> {
        EmbedRequest {
            model: &self.model,
            content: EmbedContent {
                parts: vec![TextPart { text }],
            },
        }
    }

    async fn post_json<B, R>(&self, endpoint: &str, body: &B) -> Result<R>
    where
        B: Serialize,
        R: serde::de::DeserializeOwned,
    {
        let url = format!(
            "{}/{}:{}?key={}",
            self.base_url, self.model, endpoint, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Embedding {
                message: format!("request failed: {e}"),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Embedding {
                message: format!("API error {status}: {body}"),
            });
        }

        response.json().await.map_err(|e| AppError::Embedding {
            message: format!("failed to parse response: {e}"),
        })
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let response: EmbedResponse = self.post_json("embedContent", &self.request(text)).await?;
        if response.embedding.values.is_empty() {
            return Err(AppError::Embedding {
                message: "empty embedding in response".to_string(),
            });
        }
        Ok(response.embedding.values)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut all = Vec::with_capacity(texts.len());
        for slice in texts.chunks(BATCH_LIMIT) {
            let request = BatchEmbedRequest {
                requests: slice.iter().map(|text| self.request(text)).collect(),
            };
            let response: BatchEmbedResponse =
                self.post_json("batchEmbedContents", &request).await?;
            if response.embeddings.len() != slice.len() {
                return Err(AppError::Embedding {
                    message: format!(
                        "expected {} embeddings, got {}",
                        slice.len(),
                        response.embeddings.len()
                    ),
                });
            }
            all.extend(response.embeddings.into_iter().map(|e| e.values));
        }
        Ok(all)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Deterministic embedder for offline development and tests.
///
/// Vectors are a normalized fold of the input bytes, so identical text always
/// maps to the identical vector and persisted indexes round-trip exactly.
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for (i, byte) in text.bytes().enumerate() {
            vector[i % self.dimension] += f32::from(byte) / 255.0;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vectorize(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.vectorize(text)).collect())
    }

    fn model_name(&self) -> &str {
        "mock-embedding"
    }
}
