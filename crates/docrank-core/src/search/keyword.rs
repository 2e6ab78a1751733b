//! Keyword scoring
//!
//! Exact substring matching against a document's metadata plus a
//! term-frequency signal from the body. Every term contributes
//! independently and contributions are summed, so documents matching more
//! distinct terms, or the same term more often, score higher.

use super::types::Document;

pub const TITLE_WEIGHT: f32 = 10.0;
pub const PATH_WEIGHT: f32 = 5.0;
pub const DESCRIPTION_WEIGHT: f32 = 3.0;
pub const BODY_OCCURRENCE_WEIGHT: f32 = 0.5;

/// Lower-case one character, keeping only the first char of expansions
/// (`'İ'` folds to `'i'`) so folded text stays index-aligned with the input
pub fn fold_char(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Case folding shared by scoring and snippet extraction
pub fn fold_case(text: &str) -> String {
    text.chars().map(fold_char).collect()
}

/// Lower-case the query and split it on whitespace
pub fn tokenize(query: &str) -> Vec<String> {
    fold_case(query)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Raw keyword score of `document` for already-tokenized `terms`
pub fn score(document: &Document, terms: &[String]) -> f32 {
    if terms.is_empty() {
        return 0.0;
    }

    let title = document
        .title
        .as_deref()
        .map(fold_case)
        .unwrap_or_default();
    let description = document
        .description
        .as_deref()
        .map(fold_case)
        .unwrap_or_default();
    let path = fold_case(&document.path);
    let body = fold_case(&document.body);

    terms
        .iter()
        .filter(|term| !term.is_empty())
        .map(|term| {
            let term = term.as_str();
            let mut total = 0.0;
            if title.contains(term) {
                total += TITLE_WEIGHT;
            }
            if path.contains(term) {
                total += PATH_WEIGHT;
            }
            if description.contains(term) {
                total += DESCRIPTION_WEIGHT;
            }
            total + BODY_OCCURRENCE_WEIGHT * body.matches(term).count() as f32
        })
        .sum()
}
