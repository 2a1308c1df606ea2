use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use gov_event_harvester::config::AppConfig;
use gov_event_harvester::harvest::{HarvestOptions, HarvestPipeline, HttpFetcher};
use gov_event_harvester::query::{fetch_events, EventFilter, SortKey};
use gov_event_harvester::store::{EventStore, SqliteEventStore};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "gov-events")]
#[command(about = "Harvest and browse government technology events", long_about = None)]
struct Cli {
    /// Configuration file (default: ./gov-events.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, normalize and store events from the configured sources
    Harvest {
        /// Run everything except persistence
        #[arg(long)]
        dry_run: bool,

        /// Log per-source progress
        #[arg(long)]
        verbose: bool,

        /// Do not save results
        #[arg(long)]
        no_save: bool,

        /// Comma-separated source names (default: all)
        #[arg(long, value_delimiter = ',')]
        sources: Vec<String>,

        /// Per-source event cap (default from config)
        #[arg(long)]
        max_events: Option<usize>,

        /// Keep events that already happened
        #[arg(long)]
        include_past: bool,

        /// Write a JSON summary of the run to this path
        #[arg(long)]
        summary: Option<PathBuf>,
    },
    /// Print stored events as JSON
    Events {
        /// State, Local or All
        #[arg(long)]
        jurisdiction: Option<String>,

        #[arg(long)]
        tag: Option<String>,

        /// Space-separated terms, all of which must match
        #[arg(long)]
        search: Option<String>,

        /// Only virtual events
        #[arg(long = "virtual")]
        virtual_only: bool,

        /// date, date-desc, title or jurisdiction
        #[arg(long, default_value = "date")]
        sort: String,
    },
    /// Print all tag names
    Tags,
    /// Delete every stored event and tag
    Clean,
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback)),
        )
        .init();
}

fn open_store(config: &AppConfig) -> Result<SqliteEventStore> {
    let path = config.database_path()?;
    SqliteEventStore::open(&path)
        .with_context(|| format!("failed to open database at {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = matches!(cli.command, Commands::Harvest { verbose: true, .. });
    init_tracing(verbose);

    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Harvest {
            dry_run,
            verbose,
            no_save,
            sources,
            max_events,
            include_past,
            summary,
        } => {
            let options = HarvestOptions {
                dry_run,
                sources: Some(sources).filter(|names| !names.is_empty()),
                verbose,
                save_results: !no_save,
                filter_past: config.harvest.filter_past && !include_past,
                max_events_per_source: max_events.unwrap_or(config.harvest.max_events_per_source),
            };
            harvest(&config, options, summary.as_deref()).await
        }
        Commands::Events {
            jurisdiction,
            tag,
            search,
            virtual_only,
            sort,
        } => {
            let store = open_store(&config)?;
            let filter = EventFilter {
                jurisdiction,
                tag,
                search_term: search,
                virtual_only,
                sort: SortKey::parse(&sort),
            };
            let events = fetch_events(&store, &filter).await?;
            println!("{}", serde_json::to_string_pretty(&events)?);
            Ok(())
        }
        Commands::Tags => {
            let store = open_store(&config)?;
            for tag in store.get_all_tags().await? {
                println!("{tag}");
            }
            Ok(())
        }
        Commands::Clean => {
            let store = open_store(&config)?;
            store.clear().await?;
            println!("Removed all events and tags");
            Ok(())
        }
    }
}

async fn harvest(config: &AppConfig, options: HarvestOptions, summary: Option<&Path>) -> Result<()> {
    let http = HttpFetcher::new(config.request_timeout(), &config.harvest.user_agent)?;
    let registry = config.source_registry(&http);
    let mut pipeline = HarvestPipeline::new(registry);

    if options.save_results && !options.dry_run {
        let store: Arc<dyn EventStore> = Arc::new(open_store(config)?);
        pipeline = pipeline.with_store(store);
    }

    let result = pipeline.harvest_events(&options).await?;
    info!(
        events = result.events.len(),
        saved = ?result.stats.saved,
        duration_ms = result.stats.total_duration_ms,
        "Harvest completed"
    );
    println!("Harvested {} events", result.events.len());
    if let Some(saved) = result.stats.saved {
        println!("Saved {saved} new events");
    }

    if let Some(path) = summary {
        let sources = match &options.sources {
            Some(names) => json!(names),
            None => Value::from("all"),
        };
        let report = json!({
            "lastRun": Utc::now().to_rfc3339(),
            "eventCount": result.events.len(),
            "sources": sources,
            "stats": result.stats,
        });
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("failed to write summary to {}", path.display()))?;
    }
    Ok(())
}
