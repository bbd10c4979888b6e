use crate::classify::TRENDING_CATEGORY;
use crate::config::TrendingConfig;
use crate::text::{extract_text_from_html, truncate_with_ellipsis};
use crate::types::{FetchConfig, FetchPapers, ParsedEntry, PaperRecord, PaperSource, PipelineError, Result};
use crate::{FeedParser, Fetcher};
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

/// HuggingFace "trending papers" RSS feed.
pub struct TrendingSource {
    config: TrendingConfig,
    fetcher: Fetcher,
    parser: FeedParser,
}

impl TrendingSource {
    pub fn new(fetch_config: FetchConfig, config: TrendingConfig) -> Result<Self> {
        Ok(Self {
            config,
            fetcher: Fetcher::new(fetch_config)?,
            parser: FeedParser::new(),
        })
    }

    /// First `limit` usable entries of the feed, in feed order. Failures of
    /// the whole request yield an empty list.
    pub async fn fetch(&self, limit: usize) -> Vec<PaperRecord> {
        if limit == 0 {
            return Vec::new();
        }

        match self.try_fetch(limit).await {
            Ok(papers) => papers,
            Err(e) => {
                error!(source = "huggingface", error = %e, "Trending feed fetch failed, continuing without it");
                Vec::new()
            }
        }
    }

    async fn try_fetch(&self, limit: usize) -> Result<Vec<PaperRecord>> {
        let fetch_result = self.fetcher.fetch_feed(&self.config.feed_url).await?;

        if !fetch_result.success {
            return Err(PipelineError::General(
                fetch_result.error.unwrap_or_else(|| "Fetch failed".to_string()),
            ));
        }
        let content = match fetch_result.content {
            Some(content) => content,
            None => {
                warn!(source = "huggingface", "No content returned for trending feed");
                return Ok(Vec::new());
            }
        };

        let parsed = self.parser.parse_feed(&content)?;
        let fetched_at = Utc::now();

        let papers: Vec<PaperRecord> = parsed
            .entries
            .into_iter()
            .filter_map(|entry| match self.to_record(entry, fetched_at) {
                Ok(paper) => Some(paper),
                Err(e) => {
                    warn!(source = "huggingface", error = %e, "Skipping unusable trending entry");
                    None
                }
            })
            .take(limit)
            .collect();

        info!(
            source = "huggingface",
            url = %fetch_result.url,
            http_status = ?fetch_result.http_status,
            response_time_ms = fetch_result.response_time_ms,
            skipped = parsed.skipped,
            count = papers.len(),
            limit,
            "Fetched trending papers"
        );
        Ok(papers)
    }

    fn to_record(&self, entry: ParsedEntry, fetched_at: DateTime<Utc>) -> Result<PaperRecord> {
        let paper_url = entry
            .link
            .filter(|l| !l.trim().is_empty())
            .or_else(|| (!entry.id.trim().is_empty()).then(|| entry.id.clone()))
            .ok_or_else(|| PipelineError::Parse(format!("trending entry {:?} has no link", entry.title)))?;

        let abstract_text = extract_text_from_html(&entry.summary);
        let preview = truncate_with_ellipsis(&abstract_text, self.config.summary_preview_chars);

        let mut paper = PaperRecord::new(entry.title, abstract_text, PaperSource::HuggingfaceTrending, paper_url);
        paper.pdf_url = entry.pdf_link;
        paper.authors = entry.authors;
        paper.published = entry.published_at;
        paper.categories = entry.categories;
        paper.primary_category = TRENDING_CATEGORY.to_string();
        paper.technical_summary = Some(preview);
        paper.fetched_at = fetched_at;
        Ok(paper)
    }
}

impl FetchPapers for TrendingSource {
    async fn fetch_papers(&self, limit: usize) -> Vec<PaperRecord> {
        self.fetch(limit).await
    }

    fn source_name(&self) -> String {
        "HuggingFace Trending".to_string()
    }
}
