//! Vector similarity and embedding input construction

use super::types::Document;

/// Cosine similarity of two embeddings.
///
/// Returns 0.0 when either vector has zero magnitude.
///
/// # Panics
///
/// Panics if the vectors differ in length: mixing dimensions means the
/// index and the query came from different models.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(
        a.len(),
        b.len(),
        "cosine_similarity called with vectors of different dimensions"
    );

    let dot: f32 = a.iter().zip(b.iter()).map(|(&x, &y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|y| y * y).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}

/// Cut `text` to at most `max_chars` characters
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Text a document is embedded from: title, description, then the start of the body
pub fn embedding_text(document: &Document, body_chars: usize) -> String {
    [
        document.title.as_deref().unwrap_or_default(),
        document.description.as_deref().unwrap_or_default(),
        truncate_chars(&document.body, body_chars),
    ]
    .join("\n")
}
