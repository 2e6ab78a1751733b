//! Embedding providers
//!
//! [`EmbeddingProvider`] is the capability the ranking core depends on.
//! Two implementations ship with the crate: [`EmbeddingClient`] talks to
//! an OpenAI-compatible `/embeddings` endpoint, [`HashingEmbedder`] is a
//! deterministic offline fallback.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use async_trait::async_trait;
use twox_hash::XxHash64;

use super::config::{EmbeddingConfig, ProviderKind};
use super::error::SearchResult;
use super::similarity::cosine_similarity;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// One-time setup (model load, credential check). Returns the
    /// dimensionality every vector from this provider will have.
    async fn initialize(&self) -> SearchResult<usize>;

    /// Embed a single text
    async fn embed(&self, text: &str) -> SearchResult<Vec<f32>>;

    /// Embed several texts, one vector per text in input order.
    /// The default issues one `embed` call per text.
    async fn embed_batch(&self, texts: &[String]) -> SearchResult<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Similarity between two embeddings produced by this provider
    fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        cosine_similarity(a, b)
    }
}

/// Build the provider selected by `config.provider`
pub fn build_provider(config: &EmbeddingConfig) -> SearchResult<Arc<dyn EmbeddingProvider>> {
    match config.provider {
        #[cfg(feature = "openai")]
        ProviderKind::OpenAi => Ok(Arc::new(EmbeddingClient::new(config.clone())?)),
        #[cfg(not(feature = "openai"))]
        ProviderKind::OpenAi => Err(super::error::SearchError::Config(
            "the openai embedding provider requires the `openai` feature".to_string(),
        )),
        ProviderKind::Hashing => Ok(Arc::new(HashingEmbedder::new(config.dimensions))),
    }
}

/// Feature-hashing embedder.
///
/// Each whitespace token is lower-cased and hashed into one of `dimensions`
/// buckets; the result is L2-normalized. Texts sharing vocabulary end up
/// close together, which is enough for development and tests without a
/// model or network access.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn hash_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dimensions];
        for token in text.split_whitespace() {
            let token = token
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if token.is_empty() {
                continue;
            }
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dimensions as u64) as usize;
            v[idx] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn initialize(&self) -> SearchResult<usize> {
        Ok(self.dimensions)
    }

    async fn embed(&self, text: &str) -> SearchResult<Vec<f32>> {
        Ok(self.hash_text(text))
    }
}

#[cfg(feature = "openai")]
pub use openai::EmbeddingClient;

#[cfg(feature = "openai")]
mod openai {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use reqwest::Client;
    use serde::{Deserialize, Serialize};

    use super::super::config::EmbeddingConfig;
    use super::super::error::{SearchError, SearchResult};
    use super::EmbeddingProvider;

    /// OpenAI-compatible embedding API client
    pub struct EmbeddingClient {
        config: EmbeddingConfig,
        client: Client,
        /// Actual dimensions detected from API response (0 = not yet detected)
        actual_dimensions: AtomicUsize,
    }

    #[derive(Debug, Serialize)]
    struct EmbeddingRequest<'a> {
        model: &'a str,
        input: &'a [String],
        /// Only sent for models that support it (e.g. text-embedding-3-*)
        #[serde(skip_serializing_if = "Option::is_none")]
        dimensions: Option<usize>,
    }

    #[derive(Debug, Deserialize)]
    struct EmbeddingResponse {
        data: Vec<EmbeddingData>,
    }

    #[derive(Debug, Deserialize)]
    struct EmbeddingData {
        embedding: Vec<f32>,
        index: usize,
    }

    #[derive(Debug, Deserialize)]
    struct ErrorResponse {
        error: ErrorDetail,
    }

    #[derive(Debug, Deserialize)]
    struct ErrorDetail {
        message: String,
    }

    impl EmbeddingClient {
        pub fn new(config: EmbeddingConfig) -> SearchResult<Self> {
            let client = Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .map_err(SearchError::Http)?;

            Ok(Self {
                config,
                client,
                actual_dimensions: AtomicUsize::new(0),
            })
        }

        /// Get embedding dimensions (returns actual detected dimensions if available)
        pub fn dimensions(&self) -> usize {
            let actual = self.actual_dimensions.load(Ordering::Relaxed);
            if actual > 0 {
                actual
            } else {
                self.config.dimensions
            }
        }

        /// Generate embeddings for multiple texts, batched per `batch_size`
        pub async fn embed_many(&self, texts: &[String]) -> SearchResult<Vec<Vec<f32>>> {
            if texts.is_empty() {
                return Ok(vec![]);
            }

            let api_key = self.config.get_api_key()?;
            let url = format!("{}/embeddings", self.config.api_base.trim_end_matches('/'));

            let mut all_embeddings = Vec::with_capacity(texts.len());
            for batch in texts.chunks(self.config.batch_size.max(1)) {
                let batch_embeddings = self.post_batch(batch, &api_key, &url).await?;
                all_embeddings.extend(batch_embeddings);
            }

            Ok(all_embeddings)
        }

        async fn post_batch(
            &self,
            texts: &[String],
            api_key: &str,
            url: &str,
        ) -> SearchResult<Vec<Vec<f32>>> {
            // Only OpenAI text-embedding-3 models accept a dimensions parameter
            let dimensions = if self.config.model.starts_with("text-embedding-3") {
                Some(self.config.dimensions)
            } else {
                None
            };

            let request = EmbeddingRequest {
                model: &self.config.model,
                input: texts,
                dimensions,
            };

            let response = self
                .client
                .post(url)
                .bearer_auth(api_key)
                .json(&request)
                .send()
                .await
                .map_err(SearchError::Http)?;

            let status = response.status();
            let body = response.text().await.map_err(SearchError::Http)?;

            if !status.is_success() {
                if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&body) {
                    return Err(SearchError::Embedding(error_response.error.message));
                }
                return Err(SearchError::Embedding(format!(
                    "API error ({}): {}",
                    status, body
                )));
            }

            let response: EmbeddingResponse = serde_json::from_str(&body)?;

            if response.data.len() != texts.len() {
                return Err(SearchError::Embedding(format!(
                    "Embedding count mismatch: sent {} texts, got {} embeddings",
                    texts.len(),
                    response.data.len()
                )));
            }

            let mut data = response.data;
            data.sort_by_key(|d| d.index);

            if let Some(first) = data.first() {
                let detected_dim = first.embedding.len();
                let current = self.actual_dimensions.load(Ordering::Relaxed);
                if current == 0 {
                    self.actual_dimensions.store(detected_dim, Ordering::Relaxed);
                    log::info!("[Embedding] Auto-detected embedding dimensions: {}", detected_dim);
                } else if current != detected_dim {
                    return Err(SearchError::DimensionMismatch {
                        expected: current,
                        actual: detected_dim,
                    });
                }
            }

            Ok(data.into_iter().map(|d| d.embedding).collect())
        }
    }

    #[async_trait]
    impl EmbeddingProvider for EmbeddingClient {
        async fn initialize(&self) -> SearchResult<usize> {
            self.config.get_api_key()?;
            log::info!(
                "[Embedding] Probing {} at {}",
                self.config.model,
                self.config.api_base
            );
            self.embed_many(&["dimension check".to_string()]).await?;
            Ok(self.dimensions())
        }

        async fn embed(&self, text: &str) -> SearchResult<Vec<f32>> {
            self.embed_many(&[text.to_string()])
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| SearchError::Embedding("No embedding returned".to_string()))
        }

        async fn embed_batch(&self, texts: &[String]) -> SearchResult<Vec<Vec<f32>>> {
            self.embed_many(texts).await
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_dimensions_fall_back_to_config() {
            let config = EmbeddingConfig {
                dimensions: 256,
                ..EmbeddingConfig::default()
            };
            let client = EmbeddingClient::new(config).unwrap();
            assert_eq!(client.dimensions(), 256);
        }

        #[test]
        fn test_request_omits_dimensions_when_unset() {
            let input = vec!["hello".to_string()];
            let request = EmbeddingRequest {
                model: "text-embedding-v4",
                input: &input,
                dimensions: None,
            };
            let json = serde_json::to_value(&request).unwrap();
            assert!(json.get("dimensions").is_none());
            assert_eq!(json["input"][0], "hello");
        }

        #[tokio::test]
        async fn test_empty_batch_needs_no_api_key() {
            let client = EmbeddingClient::new(EmbeddingConfig {
                api_key: None,
                ..EmbeddingConfig::default()
            })
            .unwrap();
            assert!(client.embed_many(&[]).await.unwrap().is_empty());
        }
    }
}
