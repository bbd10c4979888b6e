//! Near-duplicate removal by title similarity.

use crate::types::PaperRecord;
use tracing::{debug, info};

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;

/// Lowercase and collapse whitespace so "Attention  Is All You Need " and
/// "attention is all you need" compare equal.
pub fn normalize_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Normalized Levenshtein similarity of two titles, in `0.0..=1.0`.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(&normalize_title(a), &normalize_title(b))
}

/// Keep the first of every group of near-identical titles, in input order.
///
/// A candidate is dropped when its similarity to any already accepted title
/// is strictly greater than `threshold`. Quadratic in the batch size, which is
/// tens of records per run.
pub fn deduplicate(papers: Vec<PaperRecord>, threshold: f64) -> Vec<PaperRecord> {
    let total = papers.len();
    let mut seen_titles: Vec<String> = Vec::with_capacity(total);
    let mut unique = Vec::with_capacity(total);

    for paper in papers {
        let title = normalize_title(&paper.title);

        let duplicate_of = seen_titles
            .iter()
            .find(|seen| strsim::normalized_levenshtein(&title, seen) > threshold);

        match duplicate_of {
            Some(seen) => {
                debug!(title = %paper.title, similar_to = %seen, "Dropping near-duplicate paper");
            }
            None => {
                seen_titles.push(title);
                unique.push(paper);
            }
        }
    }

    let removed = total - unique.len();
    if removed > 0 {
        info!(removed, kept = unique.len(), "Removed near-duplicate papers");
    }

    unique
}
