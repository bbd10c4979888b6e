use crate::config::EnrichmentConfig;
use crate::llm_adapter::TextGenerator;
use crate::types::{DifficultyLevel, PaperRecord, PipelineError, Result, Summarize};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Structured summary returned by the generation service. Every field has a
/// default so a partial answer still yields all nine fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuredSummary {
    #[serde(deserialize_with = "string_or_list")]
    pub key_contributions: Vec<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub methodology: String,
    #[serde(deserialize_with = "lenient_string")]
    pub significance: String,
    #[serde(deserialize_with = "lenient_string")]
    pub technical_summary: String,
    #[serde(deserialize_with = "lenient_string")]
    pub practical_applications: String,
    #[serde(deserialize_with = "lenient_string")]
    pub limitations: String,
    #[serde(deserialize_with = "lenient_string")]
    pub category: String,
    #[serde(deserialize_with = "lenient_string")]
    pub difficulty_level: String,
    #[serde(deserialize_with = "string_or_list")]
    pub keywords: Vec<String>,
}

impl StructuredSummary {
    pub fn difficulty(&self) -> DifficultyLevel {
        DifficultyLevel::from_label(&self.difficulty_level).unwrap_or_default()
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        serde_json::Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    })
}

// Models sometimes answer a list field with one comma separated string.
fn string_or_list<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<String>, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Vec::new(),
        serde_json::Value::Array(items) => items.iter().map(value_to_text).filter(|s| !s.is_empty()).collect(),
        serde_json::Value::String(s) => s
            .split([',', '\n'])
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect(),
        other => vec![other.to_string()],
    })
}

fn value_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// First balanced `{...}` object in `text`, honoring braces inside strings.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse a model response. Anything that is not a usable JSON object becomes
/// the technical summary verbatim.
pub fn parse_summary(response: &str) -> StructuredSummary {
    let parsed = extract_json_object(response)
        .ok_or_else(|| PipelineError::Parse("no JSON object in response".to_string()))
        .and_then(|json| serde_json::from_str::<StructuredSummary>(json).map_err(PipelineError::from));

    match parsed {
        Ok(summary) => summary,
        Err(e) => {
            debug!(error = %e, "Using raw response as technical summary");
            StructuredSummary {
                technical_summary: response.trim().to_string(),
                ..StructuredSummary::default()
            }
        }
    }
}

/// Fold a summary into the record. Adds fields, never removes any, and leaves
/// `primary_category` alone. An empty generated field keeps whatever the record
/// already had, such as the trending feed's abstract preview.
pub fn merge_summary(mut paper: PaperRecord, summary: StructuredSummary) -> PaperRecord {
    let difficulty = summary.difficulty();
    paper.technical_summary = Some(keep_existing(paper.technical_summary.take(), summary.technical_summary));
    paper.key_contributions = Some(keep_existing_list(paper.key_contributions.take(), summary.key_contributions));
    paper.methodology = Some(keep_existing(paper.methodology.take(), summary.methodology));
    paper.significance = Some(keep_existing(paper.significance.take(), summary.significance));
    paper.practical_applications = Some(keep_existing(
        paper.practical_applications.take(),
        summary.practical_applications,
    ));
    paper.limitations = Some(keep_existing(paper.limitations.take(), summary.limitations));
    paper.difficulty_level = Some(difficulty);
    paper.keywords = Some(keep_existing_list(paper.keywords.take(), summary.keywords));
    paper
}

fn keep_existing(existing: Option<String>, generated: String) -> String {
    match existing {
        Some(existing) if generated.trim().is_empty() => existing,
        _ => generated,
    }
}

fn keep_existing_list(existing: Option<Vec<String>>, generated: Vec<String>) -> Vec<String> {
    match existing {
        Some(existing) if generated.is_empty() => existing,
        _ => generated,
    }
}

/// Adds structured summaries to papers through a [`TextGenerator`].
pub struct SummaryEnricher<G> {
    generator: G,
    config: EnrichmentConfig,
}

impl<G: TextGenerator> SummaryEnricher<G> {
    pub fn new(generator: G, config: EnrichmentConfig) -> Self {
        Self { generator, config }
    }

    pub fn build_prompt(&self, paper: &PaperRecord) -> String {
        format!(
            r#"Analyze this research paper and provide a structured summary.

Title: {title}
Abstract: {abstract_text}

{instruction}

Respond with a single JSON object with exactly these fields:
{{
  "key_contributions": ["3-5 main contributions"],
  "methodology": "approach and methods used",
  "significance": "why this work matters",
  "technical_summary": "2-3 sentence technical summary",
  "practical_applications": "where the results can be applied",
  "limitations": "limitations and open problems",
  "category": "research area",
  "difficulty_level": "Beginner | Intermediate | Advanced",
  "keywords": ["5-8 keywords"]
}}"#,
            title = paper.title,
            abstract_text = paper.abstract_text,
            instruction = self.config.prompt_for(&paper.primary_category),
        )
    }

    /// Enrich one paper. On generation error or timeout the paper comes back
    /// unchanged.
    pub async fn enrich_one(&self, paper: PaperRecord) -> PaperRecord {
        match self.generate_summary(&paper).await {
            Ok(summary) => merge_summary(paper, summary),
            Err(e) => {
                warn!(title = %paper.title, adapter = %self.generator.adapter_name(), error = %e, "Summary generation failed, keeping paper unenriched");
                paper
            }
        }
    }

    async fn generate_summary(&self, paper: &PaperRecord) -> Result<StructuredSummary> {
        let prompt = self.build_prompt(paper);
        let seconds = self.config.timeout_seconds;

        let response = tokio::time::timeout(Duration::from_secs(seconds), self.generator.generate(&prompt))
            .await
            .map_err(|_| PipelineError::Timeout { operation: "summary generation".to_string(), seconds })??;

        Ok(parse_summary(&response))
    }

    /// One output per input, in input order. Up to `concurrency` generation
    /// calls are in flight at once.
    pub async fn enrich(&self, papers: Vec<PaperRecord>) -> Vec<PaperRecord> {
        let total = papers.len();
        let enriched: Vec<PaperRecord> = stream::iter(papers)
            .map(|paper| self.enrich_one(paper))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let succeeded = enriched.iter().filter(|p| p.is_enriched()).count();
        info!(total, enriched = succeeded, "Summary enrichment finished");
        enriched
    }
}

impl<G: TextGenerator> Summarize for SummaryEnricher<G> {
    async fn summarize(&self, papers: Vec<PaperRecord>) -> Vec<PaperRecord> {
        self.enrich(papers).await
    }
}
