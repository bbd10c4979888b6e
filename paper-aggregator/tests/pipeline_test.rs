mod common;

use common::{init_tracing, paper, InMemoryStore, ScriptedGenerator, StaticSource};
use paper_aggregator::config::EnrichmentConfig;
use paper_aggregator::{PaperSource, ResearchPipeline, SummaryEnricher};

fn enricher(generator: ScriptedGenerator) -> Option<SummaryEnricher<ScriptedGenerator>> {
    Some(SummaryEnricher::new(generator, EnrichmentConfig::default()))
}

#[tokio::test]
async fn test_run_once_skips_stored_and_drops_invalid() {
    init_tracing();

    let already = paper("Already Stored Paper", PaperSource::Arxiv);
    let mut untitled = paper("Untitled", PaperSource::Arxiv);
    untitled.title = String::new();

    let source = StaticSource::new(
        "ArXiv",
        vec![
            already.clone(),
            paper("Sparse Mixture of Experts at Scale", PaperSource::Arxiv),
            untitled,
            paper("Open Weights Vision Encoders", PaperSource::HuggingfaceTrending),
        ],
    );
    let store = InMemoryStore::with_papers(vec![already]);
    let generator = ScriptedGenerator::new();

    let pipeline = ResearchPipeline::new(source, enricher(generator), store, 10);
    let report = pipeline.run_once().await;

    assert!(report.success);
    assert_eq!(report.fetched, 4);
    assert_eq!(report.already_stored, 1);
    assert_eq!(report.enriched, 3);
    assert_eq!(report.dropped_invalid, 1);
    assert_eq!(report.stored, 2);
    assert_eq!(report.status, "Successfully stored 2 papers");
}

#[tokio::test]
async fn test_stored_records_are_clean() {
    init_tracing();

    let mut joined = paper("Tokenizer-Free Language Modeling", PaperSource::Arxiv);
    joined.authors = vec!["Ada Lovelace, Alan Turing and Grace Hopper".to_string()];
    joined.primary_category = String::new();

    let store = InMemoryStore::default();
    let pipeline = ResearchPipeline::new(
        StaticSource::new("ArXiv", vec![joined]),
        enricher(ScriptedGenerator::new()),
        store,
        5,
    );
    let report = pipeline.run_once().await;
    assert_eq!(report.stored, 1);

    let stored = pipeline.store().stored();
    assert_eq!(stored[0].authors, vec!["Ada Lovelace", "Alan Turing", "Grace Hopper"]);
    assert_eq!(stored[0].primary_category, "Natural Language Processing");
    assert_eq!(stored[0].keywords, Some(vec!["method".to_string(), "benchmark".to_string()]));
    assert!(stored[0].technical_summary.is_some());

    let report_again = pipeline.run_once().await;
    assert_eq!(report_again.already_stored, 1);
    assert_eq!(report_again.stored, 0);
}

#[tokio::test]
async fn test_run_without_enrichment_defaults_summary() {
    init_tracing();

    let store = InMemoryStore::default();
    let pipeline = ResearchPipeline::new(
        StaticSource::new("ArXiv", vec![paper("Speculative Decoding", PaperSource::Arxiv)]),
        None::<SummaryEnricher<ScriptedGenerator>>,
        store,
        5,
    );

    let report = pipeline.run_once().await;
    assert!(report.success);
    assert_eq!(report.enriched, 0);
    assert_eq!(report.stored, 1);

    let stored = pipeline.store().stored();
    assert_eq!(stored[0].technical_summary.as_deref(), Some(""));
    assert!(stored[0].key_contributions.is_none());
}

#[tokio::test]
async fn test_generation_failure_still_stores_paper() {
    init_tracing();

    let pipeline = ResearchPipeline::new(
        StaticSource::new(
            "ArXiv",
            vec![
                paper("Broken Paper", PaperSource::Arxiv),
                paper("Direct Preference Optimization", PaperSource::Arxiv),
            ],
        ),
        enricher(ScriptedGenerator::new().failing_on("Broken Paper")),
        InMemoryStore::default(),
        5,
    );

    let report = pipeline.run_once().await;
    assert_eq!(report.enriched, 1);
    assert_eq!(report.stored, 2);
}

#[tokio::test]
async fn test_storage_failure_reported_in_status() {
    init_tracing();

    let pipeline = ResearchPipeline::new(
        StaticSource::new("ArXiv", vec![paper("Mixture of Depths", PaperSource::Arxiv)]),
        None::<SummaryEnricher<ScriptedGenerator>>,
        InMemoryStore::failing(),
        5,
    );

    let report = pipeline.run_once().await;
    assert!(!report.success);
    assert_eq!(report.stored, 0);
    assert_eq!(report.status, "Error storing papers: connection refused");
}

#[tokio::test]
async fn test_empty_fetch_is_a_successful_run() {
    init_tracing();

    let pipeline = ResearchPipeline::new(
        StaticSource::new("ArXiv", vec![]),
        enricher(ScriptedGenerator::new()),
        InMemoryStore::failing(),
        5,
    );

    let report = pipeline.run_once().await;
    assert!(report.success);
    assert_eq!(report.fetched, 0);
    assert_eq!(report.status, "Successfully stored 0 papers");
}
