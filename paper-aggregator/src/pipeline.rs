use crate::normalizer::clean_batch;
use crate::types::{FetchPapers, PaperRecord, Persist, Summarize};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub fetched: usize,
    pub already_stored: usize,
    pub enriched: usize,
    pub dropped_invalid: usize,
    pub stored: usize,
    pub success: bool,
    pub status: String,
}

/// fetch → skip already stored → enrich → clean → store.
///
/// Each run is independent; scheduling is left to the caller.
pub struct ResearchPipeline<F, S, P> {
    fetcher: F,
    enricher: Option<S>,
    store: P,
    total_limit: usize,
}

impl<F, S, P> ResearchPipeline<F, S, P>
where
    F: FetchPapers,
    S: Summarize,
    P: Persist,
{
    /// `enricher: None` stores papers without generated summaries.
    pub fn new(fetcher: F, enricher: Option<S>, store: P, total_limit: usize) -> Self {
        Self {
            fetcher,
            enricher,
            store,
            total_limit,
        }
    }

    pub fn store(&self) -> &P {
        &self.store
    }

    pub async fn run_once(&self) -> RunReport {
        info!(source = %self.fetcher.source_name(), total_limit = self.total_limit, "Starting pipeline run");

        let fetched = self.fetcher.fetch_papers(self.total_limit).await;
        let mut report = RunReport {
            fetched: fetched.len(),
            ..RunReport::default()
        };

        let fresh = self.drop_already_stored(fetched).await;
        report.already_stored = report.fetched - fresh.len();

        let enriched = match &self.enricher {
            Some(enricher) if !fresh.is_empty() => enricher.summarize(fresh).await,
            _ => fresh,
        };
        report.enriched = enriched.iter().filter(|p| p.is_enriched()).count();

        let (cleaned, dropped) = clean_batch(enriched);
        report.dropped_invalid = dropped;

        if cleaned.is_empty() {
            report.success = true;
            report.status = "Successfully stored 0 papers".to_string();
            info!(?report, "Pipeline run finished with nothing to store");
            return report;
        }

        match self.store.store(&cleaned).await {
            Ok(stored) => {
                report.stored = stored;
                report.success = true;
                report.status = format!("Successfully stored {} papers", stored);
                info!(
                    fetched = report.fetched,
                    already_stored = report.already_stored,
                    enriched = report.enriched,
                    dropped_invalid = report.dropped_invalid,
                    stored,
                    "Pipeline run finished"
                );
            }
            Err(e) => {
                report.status = format!("Error storing papers: {}", e);
                error!(error = %e, papers = cleaned.len(), "Storing papers failed");
            }
        }

        report
    }

    // A failed lookup counts as "not stored"; the insert skips conflicts anyway.
    async fn drop_already_stored(&self, papers: Vec<PaperRecord>) -> Vec<PaperRecord> {
        let mut fresh = Vec::with_capacity(papers.len());
        for paper in papers {
            match self.store.exists(&paper.paper_url).await {
                Ok(true) => info!(paper_url = %paper.paper_url, "Paper already stored, skipping"),
                Ok(false) => fresh.push(paper),
                Err(e) => {
                    warn!(paper_url = %paper.paper_url, error = %e, "Duplicate check failed, keeping paper");
                    fresh.push(paper);
                }
            }
        }
        fresh
    }
}
