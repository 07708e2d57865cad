// src/pipeline/run.rs

//! End-to-end watch run: delay, scrape, diff, notify, persist.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{Config, Listing, ScrapeResult};
use crate::pipeline::{ChangeSet, StartupDelay, calculate_diff, dedupe};
use crate::services::{ListingParser, Notifier, PageSource};
use crate::storage::SnapshotStore;
use crate::utils::log::{step, summary};

const TOTAL_STEPS: usize = 5;

/// Structured result handed back to whoever triggered the run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<ChangeSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ScrapeResult>,
    /// Set when the alert could not be delivered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_error: Option<String>,
}

impl RunOutcome {
    fn succeeded(diff: ChangeSet, result: ScrapeResult, notify_error: Option<String>) -> Self {
        Self {
            success: true,
            message: Some("Watch run executed successfully".to_string()),
            error: None,
            timestamp: Utc::now(),
            diff: Some(diff),
            result: Some(result),
            notify_error,
        }
    }

    /// Failed run carrying only the error message.
    pub fn failed(error: &AppError) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.to_string()),
            timestamp: Utc::now(),
            diff: None,
            result: None,
            notify_error: None,
        }
    }
}

/// Collaborators and settings for one run.
pub struct PipelineContext<'a> {
    pub source: &'a dyn PageSource,
    pub parser: &'a ListingParser,
    pub store: &'a dyn SnapshotStore,
    pub notifier: &'a dyn Notifier,
    pub url: String,
    pub store_key: String,
    pub delay: StartupDelay,
}

impl<'a> PipelineContext<'a> {
    /// Wire collaborators using the URL, key and delay from `config`.
    pub fn new(
        config: &Config,
        source: &'a dyn PageSource,
        parser: &'a ListingParser,
        store: &'a dyn SnapshotStore,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            source,
            parser,
            store,
            notifier,
            url: config.source.url.clone(),
            store_key: config.store.key.clone(),
            delay: StartupDelay::for_mode(&config.delay, config.mode),
        }
    }

    /// Skip the startup delay for this run.
    pub fn without_delay(mut self) -> Self {
        self.delay = StartupDelay::disabled();
        self
    }
}

/// Fetch the page, extract listings and drop exact duplicates.
pub async fn scrape(
    source: &dyn PageSource,
    parser: &ListingParser,
    url: &str,
) -> Result<ScrapeResult> {
    let markup = source.fetch(url).await?;

    let items = parser.parse(&markup);
    log::debug!("Parsed {} listing rows", items.len());

    let listings = dedupe(items.into_iter().map(Listing::from));
    Ok(ScrapeResult::new(listings, url))
}

/// Run the whole pipeline. Never fails; errors end up in the outcome.
pub async fn run_pipeline(ctx: &PipelineContext<'_>) -> RunOutcome {
    match execute(ctx).await {
        Ok(outcome) => outcome,
        Err(e) => {
            log::error!("Watch run failed: {}", e);
            RunOutcome::failed(&e)
        }
    }
}

async fn execute(ctx: &PipelineContext<'_>) -> Result<RunOutcome> {
    if ctx.delay.is_enabled() {
        step(1, TOTAL_STEPS, "Delay - Waiting before start");
        ctx.delay.wait().await;
    }

    step(2, TOTAL_STEPS, "Scrape - Fetching listing page");
    let result = scrape(ctx.source, ctx.parser, &ctx.url).await?;

    step(3, TOTAL_STEPS, "Diff - Comparing with previous snapshot");
    let previous = ctx.store.get(&ctx.store_key).await?;
    let previous_listings = previous.map(|s| s.listings).unwrap_or_default();
    let diff = calculate_diff(&result.listings, &previous_listings);

    step(4, TOTAL_STEPS, "Notify - Dispatching alert");
    let notify_error = if diff.has_changes() {
        match ctx.notifier.notify(&diff).await {
            Ok(()) => None,
            Err(e) => {
                log::warn!("Alert dispatch failed, continuing: {}", e);
                Some(e.to_string())
            }
        }
    } else {
        log::info!("No status changes, nothing to send");
        None
    };

    step(5, TOTAL_STEPS, "Persist - Saving snapshot");
    ctx.store.put(&ctx.store_key, &result.listings).await?;

    summary(
        "Watch run",
        &[
            ("Listings", result.items_processed.to_string()),
            ("Apartments", result.apartment_count.to_string()),
            ("Parking", result.parking_count.to_string()),
            ("Changes", diff.change_count().to_string()),
            ("Alert failed", notify_error.is_some().to_string()),
        ],
    );

    Ok(RunOutcome::succeeded(diff, result, notify_error))
}
