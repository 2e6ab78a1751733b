//! Ranking: keyword-only and hybrid (keyword + embedding similarity)

use std::cmp::Ordering;
use std::sync::Arc;

use super::config::SearchBehaviorConfig;
use super::embedding::EmbeddingProvider;
use super::keyword;
use super::snippet::SnippetExtractor;
use super::types::{Document, MatchType, SearchHit};

/// Scores a candidate set, applies the qualification rule of the mode,
/// then sorts, truncates and attaches snippets.
#[derive(Debug, Clone)]
pub struct HybridCombiner {
    config: SearchBehaviorConfig,
    snippets: SnippetExtractor,
}

impl HybridCombiner {
    pub fn new(config: SearchBehaviorConfig) -> Self {
        let snippets =
            SnippetExtractor::new(config.snippet_context_chars, config.snippet_fallback_chars);
        Self { config, snippets }
    }

    /// Keyword-only ranking: a document qualifies when its raw keyword score
    /// reaches `min_score` (the configured default when `None`).
    pub fn rank_keyword<'a>(
        &self,
        documents: impl IntoIterator<Item = &'a Arc<Document>>,
        terms: &[String],
        section: Option<&str>,
        min_score: Option<f32>,
        limit: Option<usize>,
    ) -> Vec<SearchHit> {
        let min_score = min_score.unwrap_or(self.config.min_score);

        let scored = documents
            .into_iter()
            .filter(|d| section.map_or(true, |s| d.in_section(s)))
            .filter_map(|d| {
                let score = keyword::score(d, terms);
                (score >= min_score).then(|| (Arc::clone(d), score))
            })
            .collect();

        self.finish(scored, terms, limit, MatchType::Keyword)
    }

    /// Hybrid ranking. A document qualifies only when its similarity to the
    /// query reaches `similarity_floor`; the keyword signal adjusts the order
    /// but cannot admit a document on its own. Documents without an
    /// embedding are not ranked.
    pub fn rank_hybrid<'a>(
        &self,
        documents: impl IntoIterator<Item = &'a Arc<Document>>,
        terms: &[String],
        query_embedding: &[f32],
        provider: &dyn EmbeddingProvider,
        section: Option<&str>,
        limit: Option<usize>,
    ) -> Vec<SearchHit> {
        let scored = documents
            .into_iter()
            .filter(|d| section.map_or(true, |s| d.in_section(s)))
            .filter_map(|d| {
                let Some(embedding) = d.embedding.as_deref() else {
                    log::debug!("[Searcher] {} has no embedding, not ranked", d.path);
                    return None;
                };
                let semantic = provider.similarity(query_embedding, embedding);
                if semantic < self.config.similarity_floor {
                    return None;
                }
                let keyword = keyword::score(d, terms) / self.config.keyword_normalizer;
                let combined =
                    self.config.keyword_weight * keyword + self.config.semantic_weight * semantic;
                Some((Arc::clone(d), combined))
            })
            .collect();

        self.finish(scored, terms, limit, MatchType::Hybrid)
    }

    fn finish(
        &self,
        mut scored: Vec<(Arc<Document>, f32)>,
        terms: &[String],
        limit: Option<usize>,
        matched_by: MatchType,
    ) -> Vec<SearchHit> {
        scored.sort_by(|(a, score_a), (b, score_b)| {
            score_b
                .partial_cmp(score_a)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.path.cmp(&b.path))
        });
        scored.truncate(self.config.effective_limit(limit));

        scored
            .into_iter()
            .map(|(document, score)| SearchHit {
                snippet: self.snippets.extract(&document, terms),
                document,
                score,
                matched_by,
            })
            .collect()
    }
}
