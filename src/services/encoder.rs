use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::config::EncoderSettings;

/// Errors that can occur while turning text into vectors
#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Embedding service returned {status}: {body}")]
    ApiError { status: StatusCode, body: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Expected {expected} vectors, got {actual}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("Expected embedding dimension {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid encoder configuration: {0}")]
    Config(String),
}

/// A text embedding model, treated as a black box
///
/// Implementations must return exactly one vector per input text, in input
/// order.
pub trait TextEncoder: Send + Sync {
    fn encode(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, EncoderError>> + Send;
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a [String],
    truncate: bool,
}

/// Client for a text-embeddings-inference compatible `/embed` endpoint
pub struct HttpEncoder {
    base_url: String,
    api_key: Option<String>,
    batch_size: usize,
    client: Client,
}

impl HttpEncoder {
    /// Create a new embedding client
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        batch_size: usize,
        timeout: Duration,
    ) -> Result<Self, EncoderError> {
        if batch_size == 0 {
            return Err(EncoderError::Config("batch_size must be positive".into()));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            api_key,
            batch_size,
            client,
        })
    }

    pub fn from_settings(settings: &EncoderSettings) -> Result<Self, EncoderError> {
        Self::new(
            settings.endpoint.clone(),
            settings.api_key.clone(),
            settings.batch_size,
            Duration::from_secs(settings.timeout_secs),
        )
    }

    async fn encode_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, EncoderError> {
        let url = format!("{}/embed", self.base_url.trim_end_matches('/'));

        tracing::debug!("Encoding {} texts via {}", batch.len(), url);

        let mut request = self.client.post(&url).json(&EmbedRequest {
            inputs: batch,
            truncate: true,
        });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EncoderError::ApiError { status, body });
        }

        let vectors: Vec<Vec<f32>> = response
            .json()
            .await
            .map_err(|e| EncoderError::InvalidResponse(format!("Failed to parse embeddings: {}", e)))?;

        if vectors.len() != batch.len() {
            return Err(EncoderError::CountMismatch {
                expected: batch.len(),
                actual: vectors.len(),
            });
        }
        Ok(vectors)
    }
}

impl TextEncoder for HttpEncoder {
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EncoderError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            vectors.extend(self.encode_batch(batch).await?);
        }
        Ok(vectors)
    }
}

/// Offline bag-of-words encoder hashing tokens into a fixed number of buckets
///
/// Used for dry runs without an embedding server. Empty text encodes to the
/// zero vector.
#[derive(Debug, Clone)]
pub struct HashingEncoder {
    dimension: usize,
}

impl HashingEncoder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimension];
        for token in text.split_whitespace() {
            let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
            for byte in token.to_lowercase().bytes() {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(0x0100_0000_01b3);
            }
            vector[(hash % self.dimension as u64) as usize] += 1.0;
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

impl TextEncoder for HashingEncoder {
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EncoderError> {
        Ok(texts.iter().map(|text| self.embed(text)).collect())
    }
}
