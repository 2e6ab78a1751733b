//! Search error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "openai")]
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Embedding API key is not configured (set EMBEDDING_API_KEY or OPENAI_API_KEY)")]
    ApiKeyMissing,

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Corpus error: {0}")]
    Corpus(String),

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Index error: {0}")]
    Index(String),
}

impl SearchError {
    /// Collapse a provider failure into an `Embedding` error that keeps only
    /// the failure message. Dimension mismatches pass through untouched.
    pub fn into_embedding_error(self) -> Self {
        match self {
            SearchError::Embedding(_) | SearchError::DimensionMismatch { .. } => self,
            SearchError::ApiKeyMissing => SearchError::Embedding(self.to_string()),
            #[cfg(feature = "openai")]
            SearchError::Http(err) => SearchError::Embedding(err.without_url().to_string()),
            other => SearchError::Embedding(other.to_string()),
        }
    }
}

pub type SearchResult<T> = Result<T, SearchError>;
