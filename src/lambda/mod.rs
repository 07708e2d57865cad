// src/lambda/mod.rs

//! AWS Lambda handler for the watcher.
//!
//! This module provides the Lambda function entry point that:
//! 1. Checks the scheduler's shared secret (production only)
//! 2. Builds the fetcher, store and notifier from the environment
//! 3. Runs the pipeline and returns its outcome as JSON
//!
//! ## Environment Variables
//!
//! - `APP_ENV`: `production`, `development` or `test`
//! - `CONFIG_PATH`: optional TOML config bundled with the function
//! - `LISTING_URL`, `STORE_KEY`, `REQUEST_TIMEOUT_SECS`, `DELAY_MAX_MS`: overrides
//! - `CRON_SECRET`: expected `Authorization: Bearer <secret>`
//! - `KV_REST_API_URL` / `KV_REST_API_TOKEN`: REST KV store, else `S3_BUCKET` / `S3_PREFIX`
//! - `TWILIO_ACCOUNT_SID`, `TWILIO_AUTH_TOKEN`, `TWILIO_PHONE_NUMBER`, `TARGET_PHONE_NUMBER`

use lambda_runtime::{Error as LambdaError, LambdaEvent};
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::error::{AppError, Result};
use crate::models::{Config, RestKvConfig, TwilioConfig};
use crate::pipeline::{PipelineContext, RunOutcome, run_pipeline};
use crate::services::{ListingParser, PageFetcher, TwilioNotifier};
use crate::storage::{RestKvStorage, S3Storage, SnapshotStore};
use crate::utils::constant_time_eq;

/// Main Lambda handler function.
#[instrument(skip(event))]
pub async fn handler(event: LambdaEvent<Value>) -> std::result::Result<Value, LambdaError> {
    let (payload, _context) = event.into_parts();
    let config = load_lambda_config(|name| std::env::var(name).ok());

    info!("Handling trigger in {} mode", config.mode);

    if config.mode.is_production() {
        let secret = std::env::var("CRON_SECRET").unwrap_or_default();
        if let Err(e) = authorize(&payload, &secret) {
            warn!("Rejected trigger: {}", e);
            return Ok(serde_json::json!({ "statusCode": 401, "error": "Unauthorized" }));
        }
    }

    let outcome = match run_lambda_pipeline(&config).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Lambda setup failed: {}", e);
            RunOutcome::failed(&e)
        }
    };

    if outcome.success {
        info!("Lambda execution successful");
    } else {
        error!("Lambda execution failed: {:?}", outcome.error);
    }

    Ok(serde_json::to_value(&outcome)?)
}

/// Internal pipeline logic for the Lambda environment.
async fn run_lambda_pipeline(config: &Config) -> Result<RunOutcome> {
    config.validate()?;
    let fetcher = PageFetcher::new(&config.source, config.mode)?;
    let parser = ListingParser::new(&config.parser)?;
    let store = create_store().await?;
    let notifier = TwilioNotifier::new(TwilioConfig::from_env()?, config.message.clone())?;

    let ctx = PipelineContext::new(config, &fetcher, &parser, store.as_ref(), &notifier);
    Ok(run_pipeline(&ctx).await)
}

/// REST KV when configured, S3 otherwise.
async fn create_store() -> Result<Box<dyn SnapshotStore>> {
    if std::env::var("KV_REST_API_URL").is_ok() {
        info!("Using REST KV snapshot store");
        return Ok(Box::new(RestKvStorage::new(RestKvConfig::from_env()?)?));
    }
    info!("Using S3 snapshot store");
    Ok(Box::new(S3Storage::from_env().await?))
}

/// Check the `Authorization` header of an HTTP-style event.
pub fn authorize(payload: &Value, secret: &str) -> Result<()> {
    if secret.is_empty() {
        return Err(AppError::config("CRON_SECRET is not set"));
    }

    let header = payload
        .get("headers")
        .and_then(|headers| {
            headers
                .get("authorization")
                .or_else(|| headers.get("Authorization"))
        })
        .and_then(Value::as_str)
        .unwrap_or_default();

    if constant_time_eq(header, &format!("Bearer {secret}")) {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}

/// Load configuration suitable for Lambda environment.
fn load_lambda_config(env: impl Fn(&str) -> Option<String>) -> Config {
    let mut config = match env("CONFIG_PATH") {
        Some(path) => Config::load_or_default(path),
        None => Config::default(),
    };

    // Override from environment if available
    if let Some(mode) = env("APP_ENV") {
        match mode.parse() {
            Ok(mode) => config.mode = mode,
            Err(e) => warn!("Ignoring APP_ENV: {}", e),
        }
    }

    if let Some(url) = env("LISTING_URL") {
        config.source.url = url;
    }

    if let Some(key) = env("STORE_KEY") {
        config.store.key = key;
    }

    if let Some(timeout) = env("REQUEST_TIMEOUT_SECS") {
        if let Ok(secs) = timeout.parse() {
            config.source.timeout_secs = secs;
        }
    }

    if let Some(max) = env("DELAY_MAX_MS") {
        if let Ok(ms) = max.parse() {
            config.delay.max_ms = ms;
        }
    }

    config
}
