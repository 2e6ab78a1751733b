//! In-memory document store

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::{SecondsFormat, Utc};

use crate::corpus::Corpus;
use crate::markdown::DocumentParser;

use super::error::{SearchError, SearchResult};
use super::types::{normalize_path, Document, EmbeddingState, IndexState, IndexStats};

/// Documents keyed by normalized path, plus the lifecycle state of the
/// index and of its embeddings.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: BTreeMap<String, Arc<Document>>,
    index_state: IndexState,
    embedding_state: EmbeddingState,
    last_build: Option<IndexStats>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fresh, `Ready` store from every document the corpus lists.
    ///
    /// Documents that cannot be read or parsed are logged and skipped.
    /// Only a failure to list the corpus aborts the build.
    pub async fn build(
        corpus: &dyn Corpus,
        parser: &dyn DocumentParser,
    ) -> SearchResult<(Self, IndexStats)> {
        let start = Instant::now();
        let ids = corpus.list_documents().await?;
        let total_docs = ids.len();
        let mut store = Self::new();
        let mut skipped_docs = 0;
        let mut replaced_docs = 0;

        for id in &ids {
            let document = corpus
                .read_document(id)
                .await
                .and_then(|raw| parser.parse(&raw, id));

            match document {
                Ok(document) => {
                    if let Some(previous) = store.insert(document) {
                        replaced_docs += 1;
                        log::warn!(
                            "[Store] Duplicate path {} (from {}), keeping the later document",
                            previous.path,
                            id
                        );
                    }
                }
                Err(e) => {
                    log::warn!("[Store] Skipping {}: {}", id, e);
                    skipped_docs += 1;
                }
            }
        }

        let stats = IndexStats {
            total_docs,
            indexed_docs: store.len(),
            skipped_docs,
            replaced_docs,
            elapsed_ms: start.elapsed().as_millis() as u64,
            last_updated: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };

        store.index_state = IndexState::Ready;
        store.last_build = Some(stats.clone());
        Ok((store, stats))
    }

    /// Insert a document, returning the one it replaced
    pub fn insert(&mut self, document: Document) -> Option<Arc<Document>> {
        self.documents
            .insert(document.path.clone(), Arc::new(document))
    }

    /// Drop every document and return to `Empty` / `NotEmbedded`
    pub fn clear(&mut self) {
        self.documents.clear();
        self.index_state = IndexState::Empty;
        self.embedding_state = EmbeddingState::NotEmbedded;
    }

    /// Look up a document; the path is normalized first
    pub fn get(&self, path: &str) -> Option<Arc<Document>> {
        self.documents.get(&normalize_path(path)).cloned()
    }

    /// All documents in path order
    pub fn all(&self) -> impl Iterator<Item = &Arc<Document>> {
        self.documents.values()
    }

    pub fn by_section(&self, section: &str) -> Vec<Arc<Document>> {
        self.all()
            .filter(|d| d.in_section(section))
            .cloned()
            .collect()
    }

    pub fn sections(&self) -> BTreeSet<String> {
        self.all().map(|d| d.section().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn embedded_count(&self) -> usize {
        self.all().filter(|d| d.embedding.is_some()).count()
    }

    /// Paths of documents that still need an embedding
    pub fn missing_embeddings(&self) -> Vec<String> {
        self.all()
            .filter(|d| d.embedding.is_none())
            .map(|d| d.path.clone())
            .collect()
    }

    /// Attach an embedding to the document at `path`
    pub fn set_embedding(&mut self, path: &str, embedding: Vec<f32>) -> SearchResult<()> {
        let document = self
            .documents
            .get_mut(path)
            .ok_or_else(|| SearchError::Index(format!("Document not in store: {}", path)))?;
        Arc::make_mut(document).embedding = Some(embedding);
        Ok(())
    }

    pub fn index_state(&self) -> IndexState {
        self.index_state
    }

    pub fn set_index_state(&mut self, state: IndexState) {
        self.index_state = state;
    }

    pub fn embedding_state(&self) -> EmbeddingState {
        self.embedding_state
    }

    pub fn set_embedding_state(&mut self, state: EmbeddingState) {
        self.embedding_state = state;
    }

    pub fn last_build(&self) -> Option<&IndexStats> {
        self.last_build.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct MapCorpus(Vec<(&'static str, &'static str)>);

    #[async_trait]
    impl Corpus for MapCorpus {
        async fn list_documents(&self) -> SearchResult<Vec<String>> {
            Ok(self.0.iter().map(|(id, _)| id.to_string()).collect())
        }

        async fn read_document(&self, id: &str) -> SearchResult<String> {
            self.0
                .iter()
                .find(|(doc_id, _)| *doc_id == id)
                .map(|(_, raw)| raw.to_string())
                .ok_or_else(|| SearchError::Corpus(format!("unreadable: {id}")))
        }
    }

    /// First line is the title, the rest is the body; "!" marks a parse failure
    struct LineParser;

    impl DocumentParser for LineParser {
        fn parse(&self, raw: &str, id: &str) -> SearchResult<Document> {
            if raw.starts_with('!') {
                return Err(SearchError::Parse {
                    path: id.to_string(),
                    message: "bad document".to_string(),
                });
            }
            let (title, body) = raw.split_once('\n').unwrap_or((raw, ""));
            Ok(Document::new(id, Some(title.to_string()), None, body))
        }
    }

    struct BrokenListing;

    #[async_trait]
    impl Corpus for BrokenListing {
        async fn list_documents(&self) -> SearchResult<Vec<String>> {
            Err(SearchError::Corpus("listing unavailable".to_string()))
        }

        async fn read_document(&self, _id: &str) -> SearchResult<String> {
            unreachable!()
        }
    }

    fn corpus() -> MapCorpus {
        MapCorpus(vec![
            ("learn/state.md", "State\nuseState stores state"),
            ("learn/effects.md", "Effects\nsync with systems"),
            ("Reference/hooks.md", "Hooks\nall the hooks"),
            ("blog/broken.md", "!not markdown"),
        ])
    }

    #[tokio::test]
    async fn test_build_skips_failures() {
        let (store, stats) = DocumentStore::build(&corpus(), &LineParser).await.unwrap();

        assert_eq!(stats.total_docs, 4);
        assert_eq!(stats.indexed_docs, 3);
        assert_eq!(stats.skipped_docs, 1);
        assert_eq!(store.len(), 3);
        assert_eq!(store.index_state(), IndexState::Ready);
        assert_eq!(store.embedding_state(), EmbeddingState::NotEmbedded);
        assert!(store.get("blog/broken").is_none());
    }

    #[tokio::test]
    async fn test_build_counts_replaced_duplicates() {
        let corpus = MapCorpus(vec![
            ("learn/state.md", "State\nfirst"),
            ("learn/state.mdx", "State\nsecond"),
            ("learn/effects.md", "Effects\nbody"),
        ]);
        let (store, stats) = DocumentStore::build(&corpus, &LineParser).await.unwrap();

        assert_eq!(stats.total_docs, 3);
        assert_eq!(stats.indexed_docs, 2);
        assert_eq!(stats.skipped_docs, 0);
        assert_eq!(stats.replaced_docs, 1);
        assert_eq!(
            stats.total_docs,
            stats.indexed_docs + stats.skipped_docs + stats.replaced_docs
        );
        assert_eq!(store.get("learn/state").unwrap().body, "second");
    }

    #[tokio::test]
    async fn test_build_fails_when_listing_fails() {
        let err = DocumentStore::build(&BrokenListing, &LineParser).await.unwrap_err();
        assert!(matches!(err, SearchError::Corpus(_)));
    }

    #[tokio::test]
    async fn test_lookup_normalizes_path() {
        let (store, _) = DocumentStore::build(&corpus(), &LineParser).await.unwrap();
        let with_ext = store.get("learn/state.md").unwrap();
        let without = store.get("/learn/state").unwrap();
        assert!(Arc::ptr_eq(&with_ext, &without));
        assert!(store.get("learn/missing").is_none());
    }

    #[tokio::test]
    async fn test_sections() {
        let (store, _) = DocumentStore::build(&corpus(), &LineParser).await.unwrap();
        let sections: Vec<String> = store.sections().into_iter().collect();
        assert_eq!(sections, vec!["Reference", "learn"]);
        assert_eq!(store.by_section("LEARN").len(), 2);
        assert_eq!(store.by_section("reference").len(), 1);
        assert!(store.by_section("unknown").is_empty());
    }

    #[tokio::test]
    async fn test_set_embedding_and_clear() {
        let (mut store, _) = DocumentStore::build(&corpus(), &LineParser).await.unwrap();
        assert_eq!(store.missing_embeddings().len(), 3);

        store.set_embedding("learn/state", vec![1.0, 0.0]).unwrap();
        assert_eq!(store.embedded_count(), 1);
        assert!(store.set_embedding("nope", vec![1.0]).is_err());

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.index_state(), IndexState::Empty);
    }
}
