//! Embedding generation providers.

use crate::error::MemoryError;
use crate::Result;
use async_trait::async_trait;
use pinemem_core::config::{EmbeddingFallback, EmbeddingsConfig};
use pinemem_core::SecretString;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Get the embedding dimension.
    fn dimension(&self) -> usize;

    /// Generate embeddings for texts.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Generate embedding for a single text.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| MemoryError::Embedding("No embedding returned".to_string()))
    }
}

/// OpenAI-compatible embeddings provider.
pub struct OpenAIEmbeddings {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
    timeout: Duration,
}

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

impl OpenAIEmbeddings {
    /// Create a new OpenAI embeddings provider.
    pub fn new(api_key: SecretString) -> Result<Self> {
        let client = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key,
            model: "text-embedding-3-small".to_string(),
            base_url: "https://api.openai.com".to_string(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Build from the embeddings config section. `None` when no key is set.
    pub fn from_config(config: &EmbeddingsConfig) -> Result<Option<Self>> {
        let Some(key) = config.api_key.clone().filter(|k| !k.is_empty()) else {
            return Ok(None);
        };
        Ok(Some(
            Self::new(key)?
                .with_timeout(Duration::from_secs(config.timeout_secs))?
                .with_model(&config.model)
                .with_base_url(&config.base_url),
        ))
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = Client::builder().timeout(timeout).build()?;
        self.timeout = timeout;
        Ok(self)
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Model name.
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddings {
    fn dimension(&self) -> usize {
        match self.model.as_str() {
            "text-embedding-3-large" => 3072,
            _ => 1536,
        }
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        #[derive(Serialize)]
        struct Request<'a> {
            model: &'a str,
            input: &'a [String],
        }

        #[derive(Deserialize)]
        struct Response {
            data: Vec<EmbeddingData>,
        }

        #[derive(Deserialize)]
        struct EmbeddingData {
            embedding: Vec<f32>,
        }

        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&Request {
                model: &self.model,
                input: texts,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(MemoryError::Embedding(format!("API error ({}): {}", status, text)));
        }

        let response: Response = response.json().await?;
        if response.data.len() != texts.len() {
            return Err(MemoryError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                response.data.len()
            )));
        }
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }
}

/// Deterministic pseudo-embeddings derived from a hash of the text.
///
/// Used offline and as the fallback when the real provider fails. The same
/// text always maps to the same unit-length vector.
#[derive(Debug, Clone)]
pub struct HashEmbeddings {
    dimension: usize,
}

impl HashEmbeddings {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    /// Pseudo-vector for `text`.
    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&Sha256::digest(text.as_bytes()));
        let mut rng = StdRng::from_seed(seed);
        let mut values: Vec<f32> = (0..self.dimension)
            .map(|_| rng.gen_range(-1.0f32..1.0))
            .collect();

        let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            values.iter_mut().for_each(|v| *v /= norm);
        }
        values
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddings {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }
}

/// Embedding façade that never fails.
///
/// Calls the configured provider when there is one; on any provider error
/// (or when no provider is configured) returns the fallback vector instead.
#[derive(Clone)]
pub struct EmbeddingGateway {
    provider: Option<Arc<dyn EmbeddingProvider>>,
    fallback: EmbeddingFallback,
    pseudo: HashEmbeddings,
}

impl EmbeddingGateway {
    /// Gateway backed by `provider`.
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        fallback: EmbeddingFallback,
        dimension: usize,
    ) -> Self {
        Self {
            provider: Some(provider),
            fallback,
            pseudo: HashEmbeddings::new(dimension),
        }
    }

    /// Gateway with no provider; every call returns the fallback vector.
    pub fn offline(fallback: EmbeddingFallback, dimension: usize) -> Self {
        Self {
            provider: None,
            fallback,
            pseudo: HashEmbeddings::new(dimension),
        }
    }

    /// Build from config. Without an API key the gateway runs offline.
    pub fn from_config(config: &EmbeddingsConfig, dimension: usize) -> Result<Self> {
        match OpenAIEmbeddings::from_config(config)? {
            Some(provider) => {
                debug!("Using embedding model {}", provider.model());
                Ok(Self::new(Arc::new(provider), config.fallback, dimension))
            }
            None => {
                warn!("No embedding API key configured; using deterministic fallback embeddings");
                Ok(Self::offline(config.fallback, dimension))
            }
        }
    }

    /// Whether a real provider is configured.
    pub fn is_live(&self) -> bool {
        self.provider.is_some()
    }

    /// Vector dimension.
    pub fn dimension(&self) -> usize {
        self.pseudo.dimension
    }

    /// Embed `text`, falling back instead of failing.
    pub async fn embed(&self, text: &str) -> Vec<f32> {
        let Some(provider) = &self.provider else {
            return self.fallback_vector(text);
        };
        match provider.embed_one(text).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!("Embedding provider failed, using fallback vector: {}", e);
                self.fallback_vector(text)
            }
        }
    }

    fn fallback_vector(&self, text: &str) -> Vec<f32> {
        match self.fallback {
            EmbeddingFallback::Pseudo => self.pseudo.vector(text),
            EmbeddingFallback::Zero => vec![0.0; self.pseudo.dimension],
        }
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
