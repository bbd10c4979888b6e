#![allow(dead_code)]

use async_trait::async_trait;
use paper_aggregator::{FetchPapers, PaperRecord, PaperSource, Persist, PipelineError, Result, TextGenerator};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .try_init()
            .ok();
    });
}

pub fn paper(title: &str, source: PaperSource) -> PaperRecord {
    let slug: String = title
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");
    let mut paper = PaperRecord::new(
        title,
        format!("Abstract of {}.", title),
        source,
        format!("https://example.org/papers/{}", slug),
    );
    paper.authors = vec!["Ada Lovelace".to_string()];
    paper.primary_category = "Machine Learning".to_string();
    paper
}

/// Source that serves a fixed list and remembers the limits it was asked for.
pub struct StaticSource {
    name: String,
    papers: Vec<PaperRecord>,
    requested: Arc<Mutex<Vec<usize>>>,
}

impl StaticSource {
    pub fn new(name: &str, papers: Vec<PaperRecord>) -> Self {
        Self {
            name: name.to_string(),
            papers,
            requested: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle that stays readable after the source is moved into an aggregator.
    pub fn requests(&self) -> Arc<Mutex<Vec<usize>>> {
        self.requested.clone()
    }
}

impl FetchPapers for StaticSource {
    async fn fetch_papers(&self, limit: usize) -> Vec<PaperRecord> {
        self.requested.lock().unwrap().push(limit);
        self.papers.iter().take(limit).cloned().collect()
    }

    fn source_name(&self) -> String {
        self.name.clone()
    }
}

/// `Persist` over a vector; can be told to fail every insert.
#[derive(Default)]
pub struct InMemoryStore {
    pub papers: Mutex<Vec<PaperRecord>>,
    pub fail_inserts: bool,
}

impl InMemoryStore {
    pub fn with_papers(papers: Vec<PaperRecord>) -> Self {
        Self {
            papers: Mutex::new(papers),
            fail_inserts: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            papers: Mutex::new(Vec::new()),
            fail_inserts: true,
        }
    }

    pub fn stored(&self) -> Vec<PaperRecord> {
        self.papers.lock().unwrap().clone()
    }
}

impl Persist for InMemoryStore {
    async fn exists(&self, paper_url: &str) -> anyhow::Result<bool> {
        Ok(self.papers.lock().unwrap().iter().any(|p| p.paper_url == paper_url))
    }

    async fn store(&self, papers: &[PaperRecord]) -> anyhow::Result<usize> {
        if self.fail_inserts {
            anyhow::bail!("connection refused");
        }
        let mut stored = self.papers.lock().unwrap();
        let before = stored.len();
        for paper in papers {
            if !stored.iter().any(|p| p.paper_url == paper.paper_url) {
                stored.push(paper.clone());
            }
        }
        Ok(stored.len() - before)
    }
}

/// Answers every prompt with [`SUMMARY_JSON`]. Prompts containing the fail
/// marker get an error; prompts containing the slow marker are delayed first.
pub struct ScriptedGenerator {
    pub fail_marker: Option<String>,
    pub slow_marker: Option<(String, Duration)>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self {
            fail_marker: None,
            slow_marker: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(mut self, marker: &str) -> Self {
        self.fail_marker = Some(marker.to_string());
        self
    }

    pub fn slow_on(mut self, marker: &str, delay: Duration) -> Self {
        self.slow_marker = Some((marker.to_string(), delay));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

pub const SUMMARY_JSON: &str = r#"Here is the analysis:
{
  "key_contributions": ["A new method", "A new benchmark"],
  "methodology": "Controlled experiments.",
  "significance": "Moves the field forward.",
  "technical_summary": "The paper introduces a method and evaluates it.",
  "practical_applications": "Search and ranking.",
  "limitations": "Small datasets.",
  "category": "Machine Learning",
  "difficulty_level": "Advanced",
  "keywords": ["method", "benchmark", "Method"]
}"#;

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn adapter_name(&self) -> String {
        "scripted".to_string()
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.lock().unwrap().push(prompt.to_string());

        if let Some((marker, delay)) = &self.slow_marker {
            if prompt.contains(marker.as_str()) {
                tokio::time::sleep(*delay).await;
            }
        }
        if let Some(marker) = &self.fail_marker {
            if prompt.contains(marker.as_str()) {
                return Err(PipelineError::Generation("service unavailable".to_string()));
            }
        }
        Ok(SUMMARY_JSON.to_string())
    }
}
