use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use paper_aggregator::{
    ArxivSource, OpenAiGenerator, PaperAggregator, PaperQuery, PaperStore, PipelineConfig, ResearchPipeline,
    SummaryEnricher, TrendingSource,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

type Pipeline = ResearchPipeline<PaperAggregator<ArxivSource, TrendingSource>, SummaryEnricher<OpenAiGenerator>, PaperStore>;

/// Fetch, summarize and store recent AI/ML research papers
#[derive(Parser, Debug)]
#[command(name = "paper-aggregator", version)]
struct Cli {
    /// JSON pipeline configuration; environment variables override it
    #[arg(long, global = true, env = "PAPER_AGGREGATOR_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the pipeline once
    Run(RunArgs),
    /// Run the pipeline on a fixed cadence until interrupted
    Schedule {
        #[command(flatten)]
        run: RunArgs,

        #[arg(long, default_value_t = 24, value_parser = clap::value_parser!(u64).range(1..=8760))]
        every_hours: u64,

        /// Delay before retrying a run that failed to store its papers
        #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..=10080))]
        retry_minutes: u64,
    },
    /// Show stored papers, newest first
    List {
        #[arg(long)]
        category: Option<String>,

        /// Case-insensitive match on title or technical summary
        #[arg(long)]
        search: Option<String>,

        /// First day to include (YYYY-MM-DD)
        #[arg(long, value_parser = parse_day)]
        since: Option<NaiveDate>,

        /// Last day to include (YYYY-MM-DD)
        #[arg(long, value_parser = parse_day)]
        until: Option<NaiveDate>,

        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Print store statistics
    Stats,
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Total papers per run
    #[arg(long)]
    limit: Option<usize>,

    /// arXiv submission window in days
    #[arg(long)]
    days_back: Option<i64>,

    /// Store papers without generated summaries
    #[arg(long)]
    skip_enrichment: bool,
}

fn parse_day(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {}", e))
}

fn start_of_day(day: NaiveDate) -> Option<DateTime<Utc>> {
    day.and_hms_opt(0, 0, 0).map(|t| t.and_utc())
}

fn end_of_day(day: NaiveDate) -> Option<DateTime<Utc>> {
    day.and_hms_opt(23, 59, 59).map(|t| t.and_utc())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let config = PipelineConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    info!("Connecting to database: {}", config.redacted_database_url());

    let store = PaperStore::connect(&config.database_url)
        .await
        .context("Failed to connect to the paper store")?;
    store.migrate().await?;

    match cli.command {
        Command::Run(args) => {
            let pipeline = build_pipeline(config, &args, store)?;
            let report = pipeline.run_once().await;
            println!("{}", report.status);
            if !report.success {
                anyhow::bail!(report.status);
            }
        }
        Command::Schedule { run, every_hours, retry_minutes } => {
            let pipeline = build_pipeline(config, &run, store)?;
            schedule(&pipeline, every_hours, retry_minutes).await;
        }
        Command::List { category, search, since, until, limit } => {
            let query = PaperQuery {
                category,
                search,
                since: since.and_then(start_of_day),
                until: until.and_then(end_of_day),
                limit,
            };
            let papers = store.search(&query).await?;
            if papers.is_empty() {
                println!("No papers found.");
            }
            for stored in papers {
                let paper = &stored.paper;
                println!("{} [{}]", paper.title, paper.primary_category);
                println!("  Added: {}  Source: {}", stored.created_at.format("%Y-%m-%d"), paper.source);
                if !paper.authors.is_empty() {
                    println!("  Authors: {}", paper.authors.join(", "));
                }
                if let Some(summary) = paper.technical_summary.as_deref().filter(|s| !s.is_empty()) {
                    println!("  {}", summary);
                }
                println!("  {}", paper.paper_url);
                println!();
            }
        }
        Command::Stats => {
            let stats = store.stats().await?;
            println!("Total papers:           {}", stats.total_papers);
            println!("Categories:             {}", stats.categories);
            println!("Added today:            {}", stats.added_today);
            println!("Avg summary length:     {:.0}", stats.average_summary_length);
        }
    }

    Ok(())
}

fn build_pipeline(mut config: PipelineConfig, args: &RunArgs, store: PaperStore) -> anyhow::Result<Pipeline> {
    if let Some(limit) = args.limit {
        config.total_limit = limit;
    }
    if let Some(days_back) = args.days_back {
        config.arxiv.days_back = days_back;
    }

    let arxiv = ArxivSource::new(config.fetch.clone(), config.arxiv.clone())?;
    let trending = TrendingSource::new(config.fetch.clone(), config.trending.clone())?;
    let aggregator = PaperAggregator::new(arxiv, trending, config.mix.clone());

    let enricher = if args.skip_enrichment {
        info!("Summary enrichment skipped on request");
        None
    } else if config.enrichment.api_key.is_none() {
        warn!("No generation API key configured, running without summary enrichment");
        None
    } else {
        let generator = OpenAiGenerator::new(&config.enrichment)?;
        Some(SummaryEnricher::new(generator, config.enrichment.clone()))
    };

    Ok(ResearchPipeline::new(aggregator, enricher, store, config.total_limit))
}

async fn schedule(pipeline: &Pipeline, every_hours: u64, retry_minutes: u64) {
    info!(every_hours, retry_minutes, "Starting scheduled runs");

    loop {
        let report = pipeline.run_once().await;
        let wait = if report.success {
            info!(status = %report.status, "Scheduled run finished, next in {} hours", every_hours);
            Duration::from_secs(every_hours.saturating_mul(3600))
        } else {
            error!(status = %report.status, "Scheduled run failed, retrying in {} minutes", retry_minutes);
            Duration::from_secs(retry_minutes.saturating_mul(60))
        };

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping scheduler");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("paper-aggregator").chain(args.iter().copied()))
    }

    #[test]
    fn test_schedule_intervals_must_be_positive_and_bounded() {
        assert!(parse(&["schedule", "--every-hours", "0"]).is_err());
        assert!(parse(&["schedule", "--retry-minutes", "0"]).is_err());
        assert!(parse(&["schedule", "--every-hours", "18446744073709551615"]).is_err());

        match parse(&["schedule", "--every-hours", "6"]).unwrap().command {
            Command::Schedule { every_hours, retry_minutes, .. } => {
                assert_eq!(every_hours, 6);
                assert_eq!(retry_minutes, 60);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
