//! Listing Watcher CLI
//!
//! Local execution entry point. For AWS Lambda, use `watcher-lambda`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use listing_watcher::{
    error::{AppError, Result},
    models::{Config, ExecutionMode, RestKvConfig, TwilioConfig},
    pipeline::{self, PipelineContext},
    services::{ListingParser, LogNotifier, Notifier, PageFetcher, TwilioNotifier},
    storage::{LocalStorage, RestKvStorage, SnapshotStore},
};

/// Listing Watcher - unit status change alerts
#[derive(Parser, Debug)]
#[command(
    name = "watcher",
    version,
    about = "Watches a listing page for unit status changes"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "watcher.toml")]
    config: PathBuf,

    /// Snapshot directory (overrides store.dir)
    #[arg(short, long)]
    storage_dir: Option<PathBuf>,

    /// Execution mode (overrides config and APP_ENV)
    #[arg(short, long)]
    mode: Option<ExecutionMode>,

    /// Use the REST KV store from KV_REST_API_URL / KV_REST_API_TOKEN
    #[arg(long, global = true)]
    kv: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline: scrape, diff, notify, persist
    Run {
        /// Skip the startup delay
        #[arg(long)]
        no_delay: bool,

        /// Log the alert instead of sending an SMS
        #[arg(long)]
        dry_run: bool,
    },

    /// Fetch and parse the listing page without touching stored state
    Scrape,

    /// Show the stored snapshot
    Show,

    /// Validate configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn create_store(config: &Config, use_kv: bool) -> Result<Box<dyn SnapshotStore>> {
    if use_kv {
        Ok(Box::new(RestKvStorage::new(RestKvConfig::from_env()?)?))
    } else {
        Ok(Box::new(LocalStorage::new(&config.store.dir)))
    }
}

fn create_notifier(config: &Config, dry_run: bool) -> Result<Box<dyn Notifier>> {
    if dry_run {
        Ok(Box::new(LogNotifier::new(config.message.clone())))
    } else {
        Ok(Box::new(TwilioNotifier::new(
            TwilioConfig::from_env()?,
            config.message.clone(),
        )?))
    }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config);
    if let Ok(mode) = std::env::var("APP_ENV") {
        config.mode = mode.parse()?;
    }
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    if let Some(dir) = cli.storage_dir {
        config.store.dir = dir;
    }

    log::info!("Listing watcher starting in {} mode", config.mode);

    match cli.command {
        Command::Run { no_delay, dry_run } => {
            config.validate()?;
            let fetcher = PageFetcher::new(&config.source, config.mode)?;
            let parser = ListingParser::new(&config.parser)?;
            let store = create_store(&config, cli.kv)?;
            let notifier = create_notifier(&config, dry_run)?;

            let mut ctx = PipelineContext::new(
                &config,
                &fetcher,
                &parser,
                store.as_ref(),
                notifier.as_ref(),
            );
            if no_delay {
                ctx = ctx.without_delay();
            }

            let outcome = pipeline::run_pipeline(&ctx).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);

            if !outcome.success {
                return Err(AppError::validation(
                    outcome.error.unwrap_or_else(|| "watch run failed".to_string()),
                ));
            }
        }

        Command::Scrape => {
            let fetcher = PageFetcher::new(&config.source, config.mode)?;
            let parser = ListingParser::new(&config.parser)?;

            let result = pipeline::scrape(&fetcher, &parser, &config.source.url).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Command::Show => {
            let store = create_store(&config, cli.kv)?;
            match store.get(&config.store.key).await? {
                Some(snapshot) => {
                    log::info!(
                        "Snapshot '{}': {} listings, last updated {}",
                        config.store.key,
                        snapshot.listings.len(),
                        snapshot.last_updated
                    );
                    println!("{}", serde_json::to_string_pretty(&snapshot)?);
                }
                None => log::info!("No snapshot found yet."),
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
        }
    }

    Ok(())
}
