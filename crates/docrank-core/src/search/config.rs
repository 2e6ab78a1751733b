//! Search configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::error::{SearchError, SearchResult};

/// Main search configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Embedding provider configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Ranking and result-shaping configuration
    #[serde(default)]
    pub search: SearchBehaviorConfig,

    /// Paths configuration
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Which embedding backend to build
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI-compatible `/embeddings` endpoint
    #[default]
    OpenAi,
    /// Deterministic offline feature hashing
    Hashing,
}

impl std::str::FromStr for ProviderKind {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "hashing" | "hash" => Ok(ProviderKind::Hashing),
            other => Err(SearchError::Config(format!(
                "unknown embedding provider \"{other}\""
            ))),
        }
    }
}

/// Embedding API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Backend used to compute embeddings
    #[serde(default)]
    pub provider: ProviderKind,

    /// API key (can also use EMBEDDING_API_KEY / OPENAI_API_KEY env vars)
    #[serde(default)]
    pub api_key: Option<String>,

    /// API base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Embedding dimensions
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Batch size for embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Texts are cut to this many characters before they reach the provider
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            api_key: None,
            api_base: default_api_base(),
            model: default_model(),
            dimensions: default_dimensions(),
            batch_size: default_batch_size(),
            max_input_chars: default_max_input_chars(),
        }
    }
}

impl EmbeddingConfig {
    /// Get API key from config or environment
    pub fn get_api_key(&self) -> SearchResult<String> {
        if let Some(ref key) = self.api_key {
            if !key.is_empty() {
                return Ok(key.clone());
            }
        }

        std::env::var("EMBEDDING_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .map_err(|_| SearchError::ApiKeyMissing)
    }
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_dimensions() -> usize {
    // Auto-detected from the first response when the API disagrees
    1536
}

fn default_batch_size() -> usize {
    10
}

fn default_max_input_chars() -> usize {
    8000
}

/// Ranking and result-shaping configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchBehaviorConfig {
    /// Result limit used when the caller does not ask for one
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Hard ceiling on the number of results, whatever the caller asks for
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    /// Keyword-mode minimum score
    #[serde(default = "default_min_score")]
    pub min_score: f32,

    /// Hybrid-mode minimum cosine similarity
    #[serde(default = "default_similarity_floor")]
    pub similarity_floor: f32,

    /// Weight of the normalized keyword score in hybrid mode
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f32,

    /// Weight of the cosine similarity in hybrid mode
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f32,

    /// Raw keyword scores are divided by this before weighting
    #[serde(default = "default_keyword_normalizer")]
    pub keyword_normalizer: f32,

    /// Whether searches default to hybrid ranking
    #[serde(default = "default_use_semantic_search")]
    pub use_semantic_search: bool,

    /// Characters of context on each side of a snippet match
    #[serde(default = "default_snippet_context_chars")]
    pub snippet_context_chars: usize,

    /// Body prefix length used when no term matches and there is no description
    #[serde(default = "default_snippet_fallback_chars")]
    pub snippet_fallback_chars: usize,

    /// Body prefix length that goes into a document's embedding text
    #[serde(default = "default_embedding_body_chars")]
    pub embedding_body_chars: usize,
}

impl Default for SearchBehaviorConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            min_score: default_min_score(),
            similarity_floor: default_similarity_floor(),
            keyword_weight: default_keyword_weight(),
            semantic_weight: default_semantic_weight(),
            keyword_normalizer: default_keyword_normalizer(),
            use_semantic_search: default_use_semantic_search(),
            snippet_context_chars: default_snippet_context_chars(),
            snippet_fallback_chars: default_snippet_fallback_chars(),
            embedding_body_chars: default_embedding_body_chars(),
        }
    }
}

impl SearchBehaviorConfig {
    /// Resolve a caller-requested limit against the default and the ceiling
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default_limit).min(self.max_limit)
    }

    fn validate(&self) -> SearchResult<()> {
        if self.keyword_normalizer <= 0.0 {
            return Err(SearchError::Config(
                "search.keyword_normalizer must be positive".to_string(),
            ));
        }
        if self.keyword_weight < 0.0 || self.semantic_weight < 0.0 {
            return Err(SearchError::Config(
                "search weights must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_limit() -> usize {
    10
}

fn default_max_limit() -> usize {
    50
}

fn default_min_score() -> f32 {
    0.1
}

fn default_similarity_floor() -> f32 {
    0.3
}

fn default_keyword_weight() -> f32 {
    0.3
}

fn default_semantic_weight() -> f32 {
    0.7
}

fn default_keyword_normalizer() -> f32 {
    100.0
}

fn default_use_semantic_search() -> bool {
    true
}

fn default_snippet_context_chars() -> usize {
    75
}

fn default_snippet_fallback_chars() -> usize {
    150
}

fn default_embedding_body_chars() -> usize {
    1000
}

/// Paths configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root directory of the document corpus
    #[serde(default)]
    pub corpus_root: Option<PathBuf>,

    /// File extensions (without the dot) that count as documents
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            corpus_root: None,
            extensions: default_extensions(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec!["md".to_string(), "mdx".to_string()]
}

impl PathsConfig {
    /// Get the corpus root, using `<config dir>/docs` if not specified
    pub fn get_corpus_root(&self) -> PathBuf {
        if let Some(ref path) = self.corpus_root {
            return path.clone();
        }
        SearchConfig::config_dir().join("docs")
    }
}

impl SearchConfig {
    /// Load configuration from file and environment
    /// Priority: environment variables > config.toml > defaults
    pub fn load() -> SearchResult<Self> {
        let toml_path = Self::config_path();
        let mut config = if toml_path.exists() {
            let content = std::fs::read_to_string(&toml_path)?;
            Self::from_toml_str(&content)?
        } else {
            Self::default()
        };

        config.apply_env()?;
        config.search.validate()?;
        Ok(config)
    }

    /// Parse a TOML document; missing keys fall back to defaults
    pub fn from_toml_str(content: &str) -> SearchResult<Self> {
        let config: SearchConfig =
            toml::from_str(content).map_err(|e| SearchError::Config(e.to_string()))?;
        config.search.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> SearchResult<()> {
        if let Ok(root) = std::env::var("DOCRANK_CORPUS_ROOT") {
            self.paths.corpus_root = Some(PathBuf::from(root));
        }
        if let Ok(flag) = std::env::var("DOCRANK_SEMANTIC_SEARCH") {
            self.search.use_semantic_search = parse_flag(&flag)?;
        }
        if let Ok(provider) = std::env::var("EMBEDDING_PROVIDER") {
            self.embedding.provider = provider.parse()?;
        }
        // New naming takes precedence over the OpenAI-specific names
        if let Ok(api_base) =
            std::env::var("EMBEDDING_API_BASE").or_else(|_| std::env::var("OPENAI_API_BASE"))
        {
            self.embedding.api_base = api_base;
        }
        if let Ok(api_key) =
            std::env::var("EMBEDDING_API_KEY").or_else(|_| std::env::var("OPENAI_API_KEY"))
        {
            self.embedding.api_key = Some(api_key);
        }
        if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        Ok(())
    }

    /// Get base config directory
    fn config_dir() -> PathBuf {
        if let Ok(root) = std::env::var("DOCRANK_ROOT") {
            return PathBuf::from(root);
        }

        dirs::home_dir()
            .map(|h| h.join(".docrank"))
            .unwrap_or_else(|| PathBuf::from(".docrank"))
    }

    /// Get config file path (config.toml)
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

fn parse_flag(value: &str) -> SearchResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(SearchError::Config(format!(
            "expected a boolean flag, got \"{other}\""
        ))),
    }
}
