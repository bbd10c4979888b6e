use crate::config::SourceMix;
use crate::dedup::deduplicate;
use crate::types::{FetchPapers, PaperRecord};
use tracing::info;

/// Combines a primary and a secondary paper source under a [`SourceMix`],
/// then removes near-duplicate titles.
pub struct PaperAggregator<P, S> {
    primary: P,
    secondary: S,
    mix: SourceMix,
}

impl<P: FetchPapers, S: FetchPapers> PaperAggregator<P, S> {
    pub fn new(primary: P, secondary: S, mix: SourceMix) -> Self {
        Self { primary, secondary, mix }
    }

    /// At most `total_limit` papers, primary source first. Sources run one
    /// after the other; one coming back empty does not stop the other.
    pub async fn fetch(&self, total_limit: usize) -> Vec<PaperRecord> {
        if total_limit == 0 {
            return Vec::new();
        }

        let primary_limit = self.mix.primary_count(total_limit);
        let mut papers = self.primary.fetch_papers(primary_limit).await;
        papers.truncate(primary_limit);
        let primary_delivered = papers.len();

        let secondary_limit = self.mix.secondary_count(total_limit, primary_delivered);
        let mut secondary = self.secondary.fetch_papers(secondary_limit).await;
        secondary.truncate(secondary_limit);
        let secondary_delivered = secondary.len();
        papers.extend(secondary);

        let mut unique = deduplicate(papers, self.mix.similarity_threshold);
        unique.truncate(total_limit);

        info!(
            primary = %self.primary.source_name(),
            primary_delivered,
            secondary = %self.secondary.source_name(),
            secondary_delivered,
            total = unique.len(),
            total_limit,
            "Aggregated papers"
        );

        unique
    }
}

impl<P: FetchPapers, S: FetchPapers> FetchPapers for PaperAggregator<P, S> {
    async fn fetch_papers(&self, limit: usize) -> Vec<PaperRecord> {
        self.fetch(limit).await
    }

    fn source_name(&self) -> String {
        format!("{} + {}", self.primary.source_name(), self.secondary.source_name())
    }
}
