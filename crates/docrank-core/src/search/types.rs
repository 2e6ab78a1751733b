//! Common types for search module

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// One indexed document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Normalized identifier: forward slashes, no leading slash, no extension
    pub path: String,
    /// Title from front matter or the first heading
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Short summary from front matter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Plain text content with markup stripped
    pub body: String,
    /// Embedding vector, attached by the embedding pass
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
}

impl Document {
    pub fn new(
        path: &str,
        title: Option<String>,
        description: Option<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            path: normalize_path(path),
            title,
            description,
            body: body.into(),
            embedding: None,
        }
    }

    /// The first path segment
    pub fn section(&self) -> &str {
        self.path.split('/').next().unwrap_or_default()
    }

    pub fn in_section(&self, section: &str) -> bool {
        self.section().eq_ignore_ascii_case(section.trim())
    }
}

/// Normalize a document identifier.
///
/// `"docs\\guide.md"`, `"/docs/guide.mdx"` and `"docs/guide"` all become
/// `"docs/guide"`. Only the extension of the last segment is stripped, and
/// a leading dot (`.hidden`) is not treated as one.
pub fn normalize_path(raw: &str) -> String {
    let unified = raw.trim().replace('\\', "/");
    let trimmed = unified.trim_start_matches('/').trim_end_matches('/');

    let (dir, file) = match trimmed.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, trimmed),
    };
    let stem = match file.rfind('.') {
        Some(idx) if idx > 0 => &file[..idx],
        _ => file,
    };

    match dir {
        Some(dir) => format!("{dir}/{stem}"),
        None => stem.to_string(),
    }
}

/// Search mode
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Keyword search only
    Keyword,
    /// Keyword score blended with embedding similarity
    #[default]
    Hybrid,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Keyword => "keyword",
            SearchMode::Hybrid => "hybrid",
        }
    }
}

/// How a result was matched
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Keyword,
    #[serde(rename = "keyword+semantic")]
    Hybrid,
}

/// Search options
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    /// The search query
    pub query: String,
    /// Restrict results to one section (case-insensitive)
    pub section: Option<String>,
    /// Maximum number of results, clamped to the configured ceiling
    pub limit: Option<usize>,
    /// Keyword-mode minimum score
    pub min_score: Option<f32>,
    /// Use hybrid ranking; falls back to the configured default
    pub use_semantic_search: Option<bool>,
}

impl SearchOptions {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn mode(&self, semantic_by_default: bool) -> SearchMode {
        if self.use_semantic_search.unwrap_or(semantic_by_default) {
            SearchMode::Hybrid
        } else {
            SearchMode::Keyword
        }
    }
}

/// A single search result
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// The matched document, shared with the store
    pub document: Arc<Document>,
    /// Relevance score (keyword score or hybrid score, higher is better)
    pub score: f32,
    /// Excerpt showing why the document matched
    pub snippet: String,
    /// How this result was matched
    pub matched_by: MatchType,
}

/// Search results response
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    /// The original query
    pub query: String,
    /// Search results
    pub results: Vec<SearchHit>,
    /// Total number of results
    pub count: usize,
    /// Search mode used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

impl SearchResults {
    pub fn empty(query: String) -> Self {
        Self {
            query,
            results: vec![],
            count: 0,
            mode: None,
        }
    }

    pub fn new(query: String, results: Vec<SearchHit>, mode: SearchMode) -> Self {
        Self {
            query,
            count: results.len(),
            results,
            mode: Some(mode.as_str().to_string()),
        }
    }
}

/// Lifecycle of the document store
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IndexState {
    #[default]
    Empty,
    Building,
    Ready,
}

/// Lifecycle of the embedding pass
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum EmbeddingState {
    #[default]
    NotEmbedded,
    Embedding,
    Embedded,
}

/// Index build statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    /// Identifiers returned by the corpus
    pub total_docs: usize,
    /// Documents that made it into the store
    pub indexed_docs: usize,
    /// Documents skipped because they could not be read or parsed
    pub skipped_docs: usize,
    /// Documents dropped because a later one normalized to the same path;
    /// `total_docs == indexed_docs + skipped_docs + replaced_docs`
    pub replaced_docs: usize,
    /// Time elapsed in milliseconds
    pub elapsed_ms: u64,
    /// Build completion time (RFC 3339)
    pub last_updated: String,
}

/// Embedding pass statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingStats {
    /// Documents embedded by this pass
    pub embedded: usize,
    /// Documents that already carried an embedding
    pub already_embedded: usize,
    /// Provider dimensionality
    pub dimensions: usize,
    /// Time elapsed in milliseconds
    pub elapsed_ms: u64,
}

/// Snapshot of the engine's state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStatus {
    pub index_state: IndexState,
    pub embedding_state: EmbeddingState,
    pub document_count: usize,
    pub embedded_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_build: Option<IndexStats>,
}
