pub mod types;
pub mod config;
pub mod fetcher;
pub mod parser;
pub mod text;
pub mod classify;
pub mod dedup;
pub mod sources;
pub mod aggregator;
pub mod llm_adapter;
pub mod enrichment;
pub mod normalizer;
pub mod store;
pub mod pipeline;

pub use types::*;
pub use config::PipelineConfig;
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use sources::{ArxivSource, TrendingSource};
pub use aggregator::PaperAggregator;
pub use llm_adapter::{OpenAiGenerator, TextGenerator};
pub use enrichment::SummaryEnricher;
pub use store::{PaperQuery, PaperStats, PaperStore, StoredPaper};
pub use pipeline::{ResearchPipeline, RunReport};
