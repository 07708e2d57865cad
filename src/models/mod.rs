// src/models/mod.rs

//! Domain models for the watcher.
//!
//! This module contains the data structures shared by the fetch, parse,
//! diff and persistence stages.

mod config;
mod listing;
mod scrape;

// Re-export all public types
pub use config::{
    Config, DelayConfig, ExecutionMode, MessageConfig, ParserConfig, RestKvConfig, SourceConfig,
    StoreConfig, TwilioConfig,
};
pub use listing::{Category, Listing, ListingItem};
pub use scrape::ScrapeResult;
