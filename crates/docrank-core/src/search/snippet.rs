//! Snippet extraction
//!
//! Positions are counted in characters so multi-byte text never gets cut
//! inside a code point.

use super::keyword::fold_char;
use super::types::Document;

const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, Copy)]
pub struct SnippetExtractor {
    /// Characters kept on each side of the match
    pub context_chars: usize,
    /// Body prefix length used when nothing matches and there is no description
    pub fallback_chars: usize,
}

impl Default for SnippetExtractor {
    fn default() -> Self {
        Self {
            context_chars: 75,
            fallback_chars: 150,
        }
    }
}

impl SnippetExtractor {
    pub fn new(context_chars: usize, fallback_chars: usize) -> Self {
        Self {
            context_chars,
            fallback_chars,
        }
    }

    pub fn extract(&self, document: &Document, terms: &[String]) -> String {
        let body: Vec<char> = document.body.chars().collect();
        let folded: Vec<char> = body.iter().map(|&c| fold_char(c)).collect();

        let earliest = terms
            .iter()
            .filter(|term| !term.is_empty())
            .filter_map(|term| {
                let needle: Vec<char> = term.chars().map(fold_char).collect();
                find(&folded, &needle).map(|pos| (pos, needle.len()))
            })
            .min_by_key(|&(pos, _)| pos);

        let Some((pos, len)) = earliest else {
            return self.fallback(document, &body);
        };

        let start = pos.saturating_sub(self.context_chars);
        let end = (pos + len + self.context_chars).min(body.len());

        let mut snippet = String::new();
        if start > 0 {
            snippet.push_str(ELLIPSIS);
        }
        snippet.extend(&body[start..end]);
        if end < body.len() {
            snippet.push_str(ELLIPSIS);
        }
        snippet
    }

    fn fallback(&self, document: &Document, body: &[char]) -> String {
        if let Some(description) = document.description.as_deref() {
            if !description.trim().is_empty() {
                return description.to_string();
            }
        }
        let mut snippet: String = body.iter().take(self.fallback_chars).collect();
        snippet.push_str(ELLIPSIS);
        snippet
    }
}

fn find(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}
