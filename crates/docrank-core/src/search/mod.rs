//! docrank search module
//!
//! Ranks an in-memory set of documents against a free-text query.
//!
//! ## Features
//!
//! - Keyword scoring over title, path, description and body
//! - Hybrid ranking: keyword score blended with embedding similarity
//! - OpenAI-compatible embedding API or offline feature hashing
//! - Query-centred snippets
//! - Lazy, single-flight index build and embedding pass
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docrank_core::search::{SearchConfig, SearchOptions, Searcher};
//!
//! let searcher = Searcher::from_config(SearchConfig::load()?)?;
//! let results = searcher.search(&SearchOptions {
//!     query: "use state".into(),
//!     limit: Some(5),
//!     ..Default::default()
//! }).await?;
//! ```

mod config;
mod embedding;
mod error;
mod hybrid;
pub mod keyword;
mod searcher;
pub mod similarity;
mod snippet;
mod store;
mod types;


pub use config::{EmbeddingConfig, PathsConfig, ProviderKind, SearchBehaviorConfig, SearchConfig};
#[cfg(feature = "openai")]
pub use embedding::EmbeddingClient;
pub use embedding::{build_provider, EmbeddingProvider, HashingEmbedder};
pub use error::{SearchError, SearchResult};
pub use hybrid::HybridCombiner;
pub use searcher::Searcher;
pub use snippet::SnippetExtractor;
pub use store::DocumentStore;
pub use types::*;
