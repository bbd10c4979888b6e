//! Last stop before the store: trim, default and reject.

use crate::classify::classify;
use crate::parser::collapse_whitespace;
use crate::text::{dedup_preserving_order, split_author_list};
use crate::types::PaperRecord;
use tracing::{info, warn};

/// Clean one record for storage, or `None` when it has no title or abstract.
///
/// Required fields come out populated: authors as a list of names,
/// `primary_category` recomputed when empty, `technical_summary` defaulted to
/// an empty string. Optional enrichment fields are kept only if present.
pub fn clean(mut paper: PaperRecord) -> Option<PaperRecord> {
    paper.title = collapse_whitespace(&paper.title);
    paper.abstract_text = collapse_whitespace(&paper.abstract_text);

    if paper.title.is_empty() || paper.abstract_text.is_empty() {
        warn!(paper_url = %paper.paper_url, "Dropping paper without title or abstract");
        return None;
    }

    paper.paper_url = paper.paper_url.trim().to_string();
    paper.pdf_url = trim_optional(paper.pdf_url.take());
    paper.arxiv_id = trim_optional(paper.arxiv_id.take());
    paper.authors = split_author_list(&paper.authors);
    paper.categories = dedup_preserving_order(&paper.categories);

    paper.primary_category = paper.primary_category.trim().to_string();
    if paper.primary_category.is_empty() {
        paper.primary_category = classify(&paper.categories, &paper.title, &paper.abstract_text);
    }

    paper.technical_summary = Some(
        paper
            .technical_summary
            .take()
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    );

    paper.key_contributions = paper.key_contributions.take().map(|items| {
        items
            .iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    });
    paper.methodology = paper.methodology.take().map(|s| s.trim().to_string());
    paper.significance = paper.significance.take().map(|s| s.trim().to_string());
    paper.practical_applications = paper.practical_applications.take().map(|s| s.trim().to_string());
    paper.limitations = paper.limitations.take().map(|s| s.trim().to_string());
    paper.keywords = paper.keywords.take().map(|k| dedup_preserving_order(&k));

    Some(paper)
}

fn trim_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Clean a batch, returning the survivors in order and the number dropped.
pub fn clean_batch(papers: Vec<PaperRecord>) -> (Vec<PaperRecord>, usize) {
    let total = papers.len();
    let cleaned: Vec<PaperRecord> = papers.into_iter().filter_map(clean).collect();
    let dropped = total - cleaned.len();

    if dropped > 0 {
        info!(dropped, kept = cleaned.len(), "Dropped invalid papers");
    }
    (cleaned, dropped)
}
