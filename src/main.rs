use anyhow::{bail, Result};
use chrono::Local;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use lineup_specs::config::Config;
use lineup_specs::output::{output_file_name, write_csv_file};
use lineup_specs::parsers::ShapeRegistry;
use lineup_specs::scrapers::LineupScraper;
use lineup_specs::semantic::{OpenAiExtractor, SemanticExtractor};
use lineup_specs::sources::{CaptureFilter, FixturePageSource, HttpPageSource, PageCache, PageSource};
use lineup_specs::utils::http::create_client;

#[derive(Debug, Parser)]
#[command(name = "lineup-specs", version, about = "Write product spec CSVs from comparison pages")]
struct Args {
    /// Extra configuration file layered over the built-in defaults
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Storefront region (IN, US, UK, DE, FR, ...)
    #[arg(long, env = "LINEUP_REGION")]
    region: Option<String>,

    /// Output directory
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Read saved pages from this directory instead of the network
    #[arg(long, value_name = "DIR")]
    fixtures: Option<PathBuf>,

    /// Only process these lineups (repeatable)
    #[arg(long = "lineup", value_name = "KEY")]
    lineups: Vec<String>,

    /// Skip the semantic-extraction tier
    #[arg(long)]
    no_semantic: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(region) = &self.region {
            config.region = region.clone();
        }
        if let Some(out) = &self.out {
            config.out_dir = out.clone();
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(fixtures) = &self.fixtures {
            config.fixtures_dir = Some(fixtures.clone());
        }
        if self.no_semantic {
            config.semantic.enabled = false;
        }
    }
}

fn init_logging(json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("lineup_specs=info".parse()?);
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_json)?;

    info!("Starting lineup-specs");

    let mut config = Config::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;
    let currency = config.currency()?;

    let filter = CaptureFilter::new(&config.capture_keywords);
    let source: Box<dyn PageSource> = match &config.fixtures_dir {
        Some(dir) => {
            info!("Reading pages from {}", dir.display());
            Box::new(FixturePageSource::new(dir, filter))
        }
        None => {
            let client = create_client(&config.user_agent, config.timeout_secs)?;
            Box::new(HttpPageSource::new(client, filter, config.max_retries))
        }
    };

    let semantic = if config.semantic.enabled {
        let client = create_client(&config.user_agent, config.semantic.timeout_secs)?;
        OpenAiExtractor::from_config(&config.semantic, client)
    } else {
        info!("Semantic extraction disabled");
        None
    };
    let semantic_ref = semantic.as_ref().map(|extractor| extractor as &dyn SemanticExtractor);

    let lineups: Vec<_> = if args.lineups.is_empty() {
        config.lineups.iter().collect()
    } else {
        let mut selected = Vec::new();
        for key in &args.lineups {
            match config.lineup(key) {
                Some(lineup) => selected.push(lineup),
                None => bail!("Unknown lineup: {}", key),
            }
        }
        selected
    };

    let registry = ShapeRegistry::default();
    let mut cache = PageCache::new(source.as_ref());
    let mut results = Vec::new();

    for lineup in lineups {
        let scraper = LineupScraper::new(lineup, &config.region, currency, &registry, semantic_ref);
        match scraper.scrape(&mut cache).await {
            Ok(records) => results.push((lineup, records)),
            Err(e) => error!("Lineup {} failed: {:#}", lineup.key, e),
        }
    }

    if cache.fetched_count() == 0 {
        bail!("No page could be fetched; check the network, region or fixtures directory");
    }

    let today = Local::now().date_naive();
    for (lineup, records) in results {
        let file_name = output_file_name(&lineup.file_stem, &config.region, today);
        let path = write_csv_file(&config.out_dir, &file_name, &records, currency)?;
        info!("Wrote {} records to {}", records.len(), path.display());
        println!("Wrote: {}", path.display());
    }

    Ok(())
}
