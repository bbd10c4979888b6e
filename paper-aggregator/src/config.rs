use crate::classify::CATEGORY_LABELS;
use crate::types::{FetchConfig, PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

pub const ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";
pub const HF_TRENDING_FEED_URL: &str = "https://jamesg.blog/hf-papers.xml";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArxivConfig {
    pub api_url: String,
    pub categories: Vec<String>,
    pub days_back: i64,
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            api_url: ARXIV_API_URL.to_string(),
            categories: CATEGORY_LABELS.iter().map(|(tag, _)| tag.to_string()).collect(),
            days_back: 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendingConfig {
    pub feed_url: String,
    /// Length of the placeholder technical summary cut from the abstract.
    pub summary_preview_chars: usize,
}

impl Default for TrendingConfig {
    fn default() -> Self {
        Self {
            feed_url: HF_TRENDING_FEED_URL.to_string(),
            summary_preview_chars: 500,
        }
    }
}

/// How a run's `total_limit` is split between the primary (arXiv) and the
/// secondary (HuggingFace trending) source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceMix {
    pub primary_share: f64,
    pub similarity_threshold: f64,
}

impl Default for SourceMix {
    fn default() -> Self {
        Self {
            primary_share: 0.8,
            similarity_threshold: crate::dedup::DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

impl SourceMix {
    /// Records requested from the primary source: at least one whenever
    /// anything is requested, never more than `total_limit`.
    pub fn primary_count(&self, total_limit: usize) -> usize {
        if total_limit == 0 {
            return 0;
        }
        let share = self.primary_share.clamp(0.0, 1.0);
        ((total_limit as f64 * share).floor() as usize).clamp(1, total_limit)
    }

    /// The secondary source fills whatever the primary did not deliver.
    pub fn secondary_count(&self, total_limit: usize, primary_delivered: usize) -> usize {
        total_limit.saturating_sub(primary_delivered)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub api_base: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
    pub concurrency: usize,
    pub category_prompts: BTreeMap<String, String>,
    pub generic_prompt: String,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        let category_prompts = [
            ("Computer Vision", "Focus on datasets used, model architecture, and visual tasks addressed."),
            ("Natural Language Processing", "Highlight language tasks, model types, and performance metrics."),
            ("Machine Learning", "Emphasize methodology, algorithms, and theoretical contributions."),
            ("Reinforcement Learning", "Focus on environment, reward structure, and learning algorithms."),
            ("Deep Learning", "Highlight architecture innovations, training techniques, and applications."),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            api_base: OPENAI_BASE_URL.to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            timeout_seconds: 60,
            concurrency: 4,
            category_prompts,
            generic_prompt: "Focus on methodology and key contributions.".to_string(),
        }
    }
}

impl EnrichmentConfig {
    pub fn prompt_for(&self, category: &str) -> &str {
        self.category_prompts
            .get(category)
            .map(String::as_str)
            .unwrap_or(&self.generic_prompt)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    #[serde(skip_serializing)]
    pub database_url: String,
    pub total_limit: usize,
    pub fetch: FetchConfig,
    pub arxiv: ArxivConfig,
    pub trending: TrendingConfig,
    pub mix: SourceMix,
    pub enrichment: EnrichmentConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            total_limit: 5,
            fetch: FetchConfig::default(),
            arxiv: ArxivConfig::default(),
            trending: TrendingConfig::default(),
            mix: SourceMix::default(),
            enrichment: EnrichmentConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load an optional JSON config file, then apply environment overrides.
    /// A `.env` file in the working directory is read first if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            info!("Loaded environment from {}", path.display());
        }

        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                let config: PipelineConfig = serde_json::from_str(&raw)?;
                info!("Loaded pipeline config from {}", path.display());
                config
            }
            None => PipelineConfig::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(key) = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.enrichment.api_key = Some(key);
        }
        if let Some(base) = lookup("OPENAI_BASE_URL") {
            self.enrichment.api_base = base;
        }
        if let Some(model) = lookup("OPENAI_MODEL") {
            self.enrichment.model = model;
        }
    }

    /// A missing store location is fatal; a missing API key only warns.
    pub fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            return Err(PipelineError::Config(
                "DATABASE_URL is not set; the paper store cannot be reached".to_string(),
            ));
        }
        if self.enrichment.api_key.is_none() {
            warn!("OPENAI_API_KEY is not set; papers will be stored without generated summaries");
        }
        if self.enrichment.concurrency == 0 {
            return Err(PipelineError::Config("enrichment.concurrency must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Connection string with the password masked, for logs.
    pub fn redacted_database_url(&self) -> String {
        match url::Url::parse(&self.database_url) {
            Ok(mut url) if url.password().is_some() => {
                let _ = url.set_password(Some("***"));
                url.to_string()
            }
            _ => self.database_url.clone(),
        }
    }
}
