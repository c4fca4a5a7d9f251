//! Deterministic string-similarity metrics for duplicate detection
//!
//! Two metrics, both symmetric and confined to `[0, 1]`:
//! - `field_similarity`: normalized Levenshtein over normalized text, for
//!   short identifying fields (email, product model, company name)
//! - `text_similarity`: Jaccard token overlap, for free-text descriptions
//!
//! An empty value on either side scores 0.0. The caller still counts the
//! field's weight, so sparse submissions cannot inflate a score.

use std::collections::HashSet;

/// Normalize form text for comparison: trim, lowercase, collapse runs of
/// whitespace to single spaces.
pub fn normalize(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Similarity of two short identifying fields (normalized Levenshtein).
pub fn field_similarity(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    strsim::normalized_levenshtein(&a, &b)
}

/// Similarity of two free-text fields (Jaccard overlap of their tokens).
///
/// Tokens are whitespace-separated words with surrounding punctuation
/// stripped, so "¡frenos!" and "frenos" compare equal.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    let ta = tokens(a);
    let tb = tokens(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let intersection = ta.intersection(&tb).count();
    let union = ta.union(&tb).count();
    intersection as f64 / union as f64
}

fn tokens(s: &str) -> HashSet<String> {
    normalize(s)
        .split(' ')
        .filter_map(|t| {
            let t = t.trim_matches(|c: char| !c.is_alphanumeric());
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .collect()
}
