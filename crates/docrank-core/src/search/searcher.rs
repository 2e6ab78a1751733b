//! Search engine: owns the document store and drives its lifecycle

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, OnceCell, RwLock, RwLockReadGuard};

use crate::corpus::{Corpus, FsCorpus};
use crate::markdown::{DocumentParser, MarkdownParser};

use super::config::SearchConfig;
use super::embedding::{build_provider, EmbeddingProvider};
use super::error::{SearchError, SearchResult};
use super::hybrid::HybridCombiner;
use super::keyword;
use super::similarity::{embedding_text, truncate_chars};
use super::store::DocumentStore;
use super::types::{
    Document, EmbeddingState, EmbeddingStats, IndexState, IndexStats, IndexStatus, SearchMode,
    SearchOptions, SearchResults,
};

/// Hybrid keyword + embedding searcher over an in-memory document store.
///
/// The store is built lazily on the first read and embeddings are generated
/// lazily on the first hybrid search. Both transitions, plus `dispose`, run
/// behind one work gate: callers arriving while a build or embedding pass is
/// in flight wait for it and reuse its result.
pub struct Searcher {
    config: SearchConfig,
    corpus: Arc<dyn Corpus>,
    parser: Arc<dyn DocumentParser>,
    provider: Arc<dyn EmbeddingProvider>,
    combiner: HybridCombiner,
    store: RwLock<DocumentStore>,
    work_gate: Mutex<()>,
    /// Provider dimensionality, set once by the first successful `initialize`
    dimensions: OnceCell<usize>,
}

impl Searcher {
    pub fn new(
        config: SearchConfig,
        corpus: Arc<dyn Corpus>,
        parser: Arc<dyn DocumentParser>,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        let combiner = HybridCombiner::new(config.search.clone());
        Self {
            config,
            corpus,
            parser,
            provider,
            combiner,
            store: RwLock::new(DocumentStore::new()),
            work_gate: Mutex::new(()),
            dimensions: OnceCell::new(),
        }
    }

    /// Searcher over the configured corpus root, parsed as markdown, with
    /// the configured embedding provider
    pub fn from_config(config: SearchConfig) -> SearchResult<Self> {
        let corpus = FsCorpus::new(config.paths.get_corpus_root(), config.paths.extensions.clone());
        let provider = build_provider(&config.embedding)?;
        log::info!(
            "[Searcher] Corpus root: {}, provider: {:?}",
            corpus.root().display(),
            config.embedding.provider
        );
        Ok(Self::new(
            config,
            Arc::new(corpus),
            Arc::new(MarkdownParser::new()),
            provider,
        ))
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Rebuild the store from scratch
    pub async fn rebuild(&self) -> SearchResult<IndexStats> {
        let _gate = self.work_gate.lock().await;
        self.rebuild_locked().await
    }

    /// Attach an embedding to every document that lacks one.
    ///
    /// Builds the store first if needed. A second call after a successful
    /// pass does no work. On failure, embeddings attached so far are kept
    /// and the next call resumes with the rest.
    pub async fn generate_embeddings(&self) -> SearchResult<EmbeddingStats> {
        let _gate = self.work_gate.lock().await;
        self.embed_locked().await
    }

    pub async fn search(&self, options: &SearchOptions) -> SearchResult<SearchResults> {
        let query = options.query.trim();
        if query.is_empty() {
            return Ok(SearchResults::empty(options.query.clone()));
        }

        let start = Instant::now();
        let terms = keyword::tokenize(query);
        let mode = options.mode(self.config.search.use_semantic_search);
        let section = options.section.as_deref();

        let results = match mode {
            SearchMode::Keyword => {
                let store = self.ready_store().await?;
                self.combiner
                    .rank_keyword(store.all(), &terms, section, options.min_score, options.limit)
            }
            SearchMode::Hybrid => {
                let query_embedding = self.embed_query(query).await?;
                let store = self.embedded_store().await?;
                self.combiner.rank_hybrid(
                    store.all(),
                    &terms,
                    &query_embedding,
                    self.provider.as_ref(),
                    section,
                    options.limit,
                )
            }
        };

        log::debug!(
            "[Searcher] \"{}\" ({}) -> {} results in {}ms",
            query,
            mode.as_str(),
            results.len(),
            start.elapsed().as_millis()
        );
        Ok(SearchResults::new(options.query.clone(), results, mode))
    }

    /// Find a document by path; extension, leading slash and backslashes
    /// are ignored. A miss is `Ok(None)`.
    pub async fn lookup(&self, path: &str) -> SearchResult<Option<Arc<Document>>> {
        Ok(self.ready_store().await?.get(path))
    }

    /// Section names in order
    pub async fn list_sections(&self) -> SearchResult<Vec<String>> {
        Ok(self.ready_store().await?.sections().into_iter().collect())
    }

    pub async fn by_section(&self, section: &str) -> SearchResult<Vec<Arc<Document>>> {
        Ok(self.ready_store().await?.by_section(section))
    }

    /// Every document in path order
    pub async fn documents(&self) -> SearchResult<Vec<Arc<Document>>> {
        Ok(self.ready_store().await?.all().cloned().collect())
    }

    /// Current state; never triggers a build
    pub async fn status(&self) -> IndexStatus {
        let store = self.store.read().await;
        IndexStatus {
            index_state: store.index_state(),
            embedding_state: store.embedding_state(),
            document_count: store.len(),
            embedded_count: store.embedded_count(),
            last_build: store.last_build().cloned(),
        }
    }

    /// Drop every document. The next read rebuilds.
    pub async fn dispose(&self) {
        let _gate = self.work_gate.lock().await;
        self.store.write().await.clear();
        self.corpus.invalidate();
        log::info!("[Searcher] Disposed document store");
    }

    /// Read access to a `Ready` store, building it first when needed
    async fn ready_store(&self) -> SearchResult<RwLockReadGuard<'_, DocumentStore>> {
        loop {
            let store = self.store.read().await;
            if store.index_state() == IndexState::Ready {
                return Ok(store);
            }
            drop(store);

            let _gate = self.work_gate.lock().await;
            // Another caller may have finished the build while we waited
            if self.store.read().await.index_state() != IndexState::Ready {
                self.rebuild_locked().await?;
            }
        }
    }

    /// Read access to a `Ready` store whose embeddings are complete. A
    /// rebuild or dispose that slipped in after the embedding pass is
    /// waited out and the pass is run again.
    async fn embedded_store(&self) -> SearchResult<RwLockReadGuard<'_, DocumentStore>> {
        loop {
            let store = self.store.read().await;
            if store.index_state() == IndexState::Ready
                && store.embedding_state() == EmbeddingState::Embedded
            {
                return Ok(store);
            }
            drop(store);

            let _gate = self.work_gate.lock().await;
            self.embed_locked().await?;
        }
    }

    async fn ensure_embedded(&self) -> SearchResult<()> {
        if self.store.read().await.embedding_state() == EmbeddingState::Embedded {
            return Ok(());
        }
        let _gate = self.work_gate.lock().await;
        self.embed_locked().await.map(|_| ())
    }

    async fn embed_query(&self, query: &str) -> SearchResult<Vec<f32>> {
        self.ensure_embedded().await?;
        let dimensions = self.provider_dimensions().await?;

        let text = truncate_chars(query, self.config.embedding.max_input_chars);
        let embedding = self
            .provider
            .embed(text)
            .await
            .map_err(SearchError::into_embedding_error)?;
        if embedding.len() != dimensions {
            return Err(SearchError::DimensionMismatch {
                expected: dimensions,
                actual: embedding.len(),
            });
        }
        Ok(embedding)
    }

    async fn provider_dimensions(&self) -> SearchResult<usize> {
        self.dimensions
            .get_or_try_init(|| async move {
                let dimensions = self.provider.initialize().await?;
                log::info!("[Searcher] Embedding provider ready ({} dimensions)", dimensions);
                Ok::<_, SearchError>(dimensions)
            })
            .await
            .copied()
            .map_err(SearchError::into_embedding_error)
    }

    /// Caller must hold the work gate
    async fn rebuild_locked(&self) -> SearchResult<IndexStats> {
        {
            let mut store = self.store.write().await;
            store.clear();
            store.set_index_state(IndexState::Building);
        }
        self.corpus.invalidate();
        log::info!("[Searcher] Rebuilding document store");

        match DocumentStore::build(self.corpus.as_ref(), self.parser.as_ref()).await {
            Ok((fresh, stats)) => {
                *self.store.write().await = fresh;
                log::info!(
                    "[Searcher] Indexed {}/{} documents ({} skipped, {} replaced) in {}ms",
                    stats.indexed_docs,
                    stats.total_docs,
                    stats.skipped_docs,
                    stats.replaced_docs,
                    stats.elapsed_ms
                );
                Ok(stats)
            }
            Err(e) => {
                self.store.write().await.set_index_state(IndexState::Empty);
                log::warn!("[Searcher] Rebuild failed: {}", e);
                Err(e)
            }
        }
    }

    /// Caller must hold the work gate
    async fn embed_locked(&self) -> SearchResult<EmbeddingStats> {
        let start = Instant::now();

        if self.store.read().await.index_state() != IndexState::Ready {
            self.rebuild_locked().await?;
        }
        let dimensions = self.provider_dimensions().await?;

        let pending: Vec<(String, String)> = {
            let mut store = self.store.write().await;
            if store.embedding_state() == EmbeddingState::Embedded {
                return Ok(EmbeddingStats {
                    embedded: 0,
                    already_embedded: store.embedded_count(),
                    dimensions,
                    elapsed_ms: start.elapsed().as_millis() as u64,
                });
            }
            store.set_embedding_state(EmbeddingState::Embedding);
            store
                .all()
                .filter(|d| d.embedding.is_none())
                .map(|d| (d.path.clone(), self.document_text(d)))
                .collect()
        };
        let already_embedded = self.store.read().await.len() - pending.len();

        log::info!(
            "[Searcher] Embedding {} documents ({} already embedded)",
            pending.len(),
            already_embedded
        );

        match self.embed_pending(pending, dimensions).await {
            Ok(embedded) => {
                self.store
                    .write()
                    .await
                    .set_embedding_state(EmbeddingState::Embedded);
                let stats = EmbeddingStats {
                    embedded,
                    already_embedded,
                    dimensions,
                    elapsed_ms: start.elapsed().as_millis() as u64,
                };
                log::info!(
                    "[Searcher] Embedded {} documents in {}ms",
                    stats.embedded,
                    stats.elapsed_ms
                );
                Ok(stats)
            }
            Err(e) => {
                self.store
                    .write()
                    .await
                    .set_embedding_state(EmbeddingState::NotEmbedded);
                log::warn!("[Searcher] Embedding pass aborted: {}", e);
                Err(e.into_embedding_error())
            }
        }
    }

    /// Embed `pending` in chunks of `batch_size`, attaching each chunk as it
    /// arrives so a later failure keeps the earlier chunks
    async fn embed_pending(
        &self,
        pending: Vec<(String, String)>,
        dimensions: usize,
    ) -> SearchResult<usize> {
        let mut embedded = 0;
        for batch in pending.chunks(self.config.embedding.batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|(_, text)| text.clone()).collect();
            let embeddings = self.provider.embed_batch(&texts).await?;
            if embeddings.len() != batch.len() {
                return Err(SearchError::Embedding(format!(
                    "Embedding count mismatch: sent {} texts, got {} embeddings",
                    batch.len(),
                    embeddings.len()
                )));
            }
            if let Some(bad) = embeddings.iter().find(|e| e.len() != dimensions) {
                return Err(SearchError::DimensionMismatch {
                    expected: dimensions,
                    actual: bad.len(),
                });
            }

            let mut store = self.store.write().await;
            for ((path, _), embedding) in batch.iter().zip(embeddings) {
                store.set_embedding(path, embedding)?;
                embedded += 1;
            }
            log::debug!("[Searcher] Embedded {}/{} documents", embedded, pending.len());
        }
        Ok(embedded)
    }

    fn document_text(&self, document: &Document) -> String {
        let text = embedding_text(document, self.config.search.embedding_body_chars);
        truncate_chars(&text, self.config.embedding.max_input_chars).to_string()
    }
}
