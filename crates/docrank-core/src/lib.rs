//! docrank core library
//!
//! In-memory hybrid keyword + embedding ranking for documentation corpora.
//! A [`search::Searcher`] pulls documents from a [`corpus::Corpus`], turns
//! them into plain-text records with a [`markdown::DocumentParser`] and ranks
//! them with an [`search::EmbeddingProvider`].

pub mod corpus;
pub mod markdown;
pub mod search;


pub use corpus::{Corpus, FsCorpus};
pub use markdown::{DocumentParser, MarkdownParser};
pub use search::{
    Document, SearchConfig, SearchError, SearchOptions, SearchResult, SearchResults, Searcher,
};
