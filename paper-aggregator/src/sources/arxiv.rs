use crate::classify::classify;
use crate::config::ArxivConfig;
use crate::types::{FetchConfig, FetchPapers, ParsedEntry, PaperRecord, PaperSource, PipelineError, Result};
use crate::{FeedParser, Fetcher};
use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, warn};
use url::Url;

/// arXiv API adapter: a category-restricted, date-windowed query sorted by
/// submission date.
pub struct ArxivSource {
    config: ArxivConfig,
    fetcher: Fetcher,
    parser: FeedParser,
}

impl ArxivSource {
    pub fn new(fetch_config: FetchConfig, config: ArxivConfig) -> Result<Self> {
        Ok(Self {
            config,
            fetcher: Fetcher::new(fetch_config)?,
            parser: FeedParser::new(),
        })
    }

    /// Fetch at most `limit` papers submitted in the last `days_back` days.
    ///
    /// Asks the API for twice as many entries as needed so that entries
    /// dropped while parsing do not leave the batch short. Any request or
    /// document failure yields an empty list.
    pub async fn fetch(&self, limit: usize, days_back: i64) -> Vec<PaperRecord> {
        if limit == 0 {
            return Vec::new();
        }

        match self.try_fetch(limit, days_back).await {
            Ok(papers) => papers,
            Err(e) => {
                error!(source = "arxiv", error = %e, "ArXiv fetch failed, continuing without it");
                Vec::new()
            }
        }
    }

    async fn try_fetch(&self, limit: usize, days_back: i64) -> Result<Vec<PaperRecord>> {
        let url = self.query_url(limit, days_back, Utc::now())?;
        let fetch_result = self.fetcher.fetch_feed(url.as_str()).await?;

        if !fetch_result.success {
            return Err(PipelineError::General(
                fetch_result.error.unwrap_or_else(|| "Fetch failed".to_string()),
            ));
        }
        let content = fetch_result
            .content
            .ok_or_else(|| PipelineError::General("ArXiv returned no content".to_string()))?;

        let parsed = self.parser.parse_feed(&content)?;
        let fetched_at = Utc::now();

        let mut papers = Vec::with_capacity(limit);
        for entry in parsed.entries {
            if papers.len() >= limit {
                break;
            }
            match to_record(entry, fetched_at) {
                Ok(paper) => papers.push(paper),
                Err(e) => warn!(source = "arxiv", error = %e, "Skipping unusable arXiv entry"),
            }
        }

        info!(
            source = "arxiv",
            http_status = ?fetch_result.http_status,
            response_time_ms = fetch_result.response_time_ms,
            skipped = parsed.skipped,
            count = papers.len(),
            limit,
            "Fetched arXiv papers"
        );
        Ok(papers)
    }

    pub fn query_url(&self, limit: usize, days_back: i64, now: DateTime<Utc>) -> Result<Url> {
        let mut url = Url::parse(&self.config.api_url)?;
        let max_results = (limit * 2).to_string();
        url.query_pairs_mut()
            .append_pair("search_query", &self.search_query(days_back, now))
            .append_pair("start", "0")
            .append_pair("max_results", &max_results)
            .append_pair("sortBy", "submittedDate")
            .append_pair("sortOrder", "descending");
        Ok(url)
    }

    /// `(cat:cs.AI OR cat:cs.LG ...) AND submittedDate:[FROM TO TO]`
    pub fn search_query(&self, days_back: i64, now: DateTime<Utc>) -> String {
        let categories = self
            .config
            .categories
            .iter()
            .map(|c| format!("cat:{}", c))
            .collect::<Vec<_>>()
            .join(" OR ");
        let start = now - Duration::days(days_back.max(0));

        format!(
            "({}) AND submittedDate:[{}0000 TO {}2359]",
            categories,
            start.format("%Y%m%d"),
            now.format("%Y%m%d"),
        )
    }
}

impl FetchPapers for ArxivSource {
    async fn fetch_papers(&self, limit: usize) -> Vec<PaperRecord> {
        self.fetch(limit, self.config.days_back).await
    }

    fn source_name(&self) -> String {
        "ArXiv".to_string()
    }
}

/// `http://arxiv.org/abs/2405.00001v1` → `2405.00001v1`; old-style ids keep
/// their archive prefix (`math/0601001v1`).
pub fn arxiv_id_from_entry_id(entry_id: &str) -> Option<String> {
    let id = match entry_id.split_once("/abs/") {
        Some((_, rest)) => rest,
        None => entry_id.rsplit('/').next().unwrap_or_default(),
    };
    let id = id.trim().trim_end_matches('/');
    (!id.is_empty()).then(|| id.to_string())
}

fn to_record(entry: ParsedEntry, fetched_at: DateTime<Utc>) -> Result<PaperRecord> {
    let arxiv_id = arxiv_id_from_entry_id(&entry.id)
        .ok_or_else(|| PipelineError::Parse(format!("entry id {:?} has no arXiv identifier", entry.id)))?;
    if entry.summary.is_empty() {
        return Err(PipelineError::Parse(format!("entry {} has no abstract", arxiv_id)));
    }

    let primary_category = classify(&entry.categories, &entry.title, &entry.summary);

    let mut paper = PaperRecord::new(
        entry.title,
        entry.summary,
        PaperSource::Arxiv,
        format!("https://arxiv.org/abs/{}", arxiv_id),
    );
    paper.pdf_url = Some(format!("https://arxiv.org/pdf/{}.pdf", arxiv_id));
    paper.arxiv_id = Some(arxiv_id);
    paper.authors = entry.authors;
    paper.published = entry.published_at;
    paper.categories = entry.categories;
    paper.primary_category = primary_category;
    paper.fetched_at = fetched_at;
    Ok(paper)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn source() -> ArxivSource {
        ArxivSource::new(FetchConfig::default(), ArxivConfig::default()).unwrap()
    }

    #[test]
    fn test_query_url_parameters() {
        let now = Utc.with_ymd_and_hms(2024, 5, 8, 12, 0, 0).unwrap();
        let url = source().query_url(5, 7, now).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        let get = |key: &str| pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone()).unwrap();
        assert_eq!(get("max_results"), "10");
        assert_eq!(get("start"), "0");
        assert_eq!(get("sortBy"), "submittedDate");
        assert_eq!(get("sortOrder"), "descending");
        assert_eq!(
            get("search_query"),
            "(cat:cs.CV OR cat:cs.CL OR cat:cs.LG OR cat:cs.AI OR cat:cs.NE OR cat:stat.ML) \
             AND submittedDate:[202405010000 TO 202405082359]"
        );
    }

    #[test]
    fn test_arxiv_id_extraction() {
        assert_eq!(arxiv_id_from_entry_id("http://arxiv.org/abs/2405.00001v1").as_deref(), Some("2405.00001v1"));
        assert_eq!(arxiv_id_from_entry_id("http://arxiv.org/abs/math/0601001v1").as_deref(), Some("math/0601001v1"));
        assert_eq!(arxiv_id_from_entry_id("2405.00001").as_deref(), Some("2405.00001"));
        assert_eq!(arxiv_id_from_entry_id(""), None);
    }

    #[test]
    fn test_entry_without_abstract_is_rejected() {
        let entry = ParsedEntry {
            id: "http://arxiv.org/abs/2405.00009v1".to_string(),
            title: "No abstract".to_string(),
            summary: String::new(),
            link: None,
            pdf_link: None,
            authors: vec![],
            published_at: None,
            categories: vec![],
        };
        assert!(to_record(entry, Utc::now()).is_err());
    }
}
