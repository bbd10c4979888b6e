use std::fmt;
use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperSource {
    Arxiv,
    HuggingfaceTrending,
}

impl PaperSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaperSource::Arxiv => "arxiv",
            PaperSource::HuggingfaceTrending => "huggingface_trending",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "arxiv" => Some(PaperSource::Arxiv),
            "huggingface_trending" => Some(PaperSource::HuggingfaceTrending),
            _ => None,
        }
    }
}

impl fmt::Display for PaperSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DifficultyLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl DifficultyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyLevel::Beginner => "Beginner",
            DifficultyLevel::Intermediate => "Intermediate",
            DifficultyLevel::Advanced => "Advanced",
        }
    }

    /// Case-insensitive; models sometimes answer "advanced" or " Beginner ".
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "beginner" => Some(DifficultyLevel::Beginner),
            "intermediate" => Some(DifficultyLevel::Intermediate),
            "advanced" => Some(DifficultyLevel::Advanced),
            _ => None,
        }
    }
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One research paper moving through the pipeline.
///
/// Enrichment fields stay `None` until a summary has been merged in, so an
/// untouched record can be told apart from one that was enriched with empty
/// values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub authors: Vec<String>,
    pub source: PaperSource,
    pub arxiv_id: Option<String>,
    pub paper_url: String,
    pub pdf_url: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub categories: Vec<String>,
    pub primary_category: String,
    pub fetched_at: DateTime<Utc>,

    pub technical_summary: Option<String>,
    pub key_contributions: Option<Vec<String>>,
    pub methodology: Option<String>,
    pub significance: Option<String>,
    pub practical_applications: Option<String>,
    pub limitations: Option<String>,
    pub difficulty_level: Option<DifficultyLevel>,
    pub keywords: Option<Vec<String>>,
}

impl PaperRecord {
    pub fn new(title: impl Into<String>, abstract_text: impl Into<String>, source: PaperSource, paper_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            abstract_text: abstract_text.into(),
            authors: Vec::new(),
            source,
            arxiv_id: None,
            paper_url: paper_url.into(),
            pdf_url: None,
            published: None,
            categories: Vec::new(),
            primary_category: String::new(),
            fetched_at: Utc::now(),
            technical_summary: None,
            key_contributions: None,
            methodology: None,
            significance: None,
            practical_applications: None,
            limitations: None,
            difficulty_level: None,
            keywords: None,
        }
    }

    pub fn is_enriched(&self) -> bool {
        self.key_contributions.is_some() || self.methodology.is_some() || self.difficulty_level.is_some()
    }
}

// Capability seams between the pipeline stages.
//
// Implementations are concrete adapters chosen at build time and passed in by
// value, so the traits use plain `async fn` and static dispatch.

pub trait FetchPapers {
    /// Fetch up to `limit` papers. Sources absorb their own failures and return
    /// an empty list rather than an error.
    fn fetch_papers(&self, limit: usize) -> impl Future<Output = Vec<PaperRecord>>;

    fn source_name(&self) -> String;
}

pub trait Summarize {
    /// One output per input, same order. Never drops a record.
    fn summarize(&self, papers: Vec<PaperRecord>) -> impl Future<Output = Vec<PaperRecord>>;
}

pub trait Persist {
    fn exists(&self, paper_url: &str) -> impl Future<Output = anyhow::Result<bool>>;

    /// All-or-nothing insert; returns the number of rows written.
    fn store(&self, papers: &[PaperRecord]) -> impl Future<Output = anyhow::Result<usize>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_labels() {
        assert_eq!(DifficultyLevel::from_label(" advanced "), Some(DifficultyLevel::Advanced));
        assert_eq!(DifficultyLevel::from_label("BEGINNER"), Some(DifficultyLevel::Beginner));
        assert_eq!(DifficultyLevel::from_label("expert"), None);
        assert_eq!(DifficultyLevel::default(), DifficultyLevel::Intermediate);
    }

    #[test]
    fn test_source_labels() {
        for source in [PaperSource::Arxiv, PaperSource::HuggingfaceTrending] {
            assert_eq!(PaperSource::from_label(source.as_str()), Some(source));
        }
        assert_eq!(PaperSource::from_label("rss"), None);
    }

    #[test]
    fn test_record_json_shape() {
        let paper = PaperRecord::new("Title", "Abstract", PaperSource::HuggingfaceTrending, "https://example.org/p");
        let json = serde_json::to_value(&paper).unwrap();

        assert_eq!(json["abstract"], "Abstract");
        assert_eq!(json["source"], "huggingface_trending");
        assert!(json["technical_summary"].is_null());
        assert!(!paper.is_enriched());
    }
}
