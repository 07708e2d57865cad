//! Service layer for the watcher.
//!
//! This module contains the collaborators the pipeline is wired from:
//! - Page fetching (`PageFetcher`)
//! - Listing extraction (`ListingParser`)
//! - Alert dispatch (`TwilioNotifier`, `LogNotifier`)

mod fetcher;
mod notifier;
mod parser;

pub use fetcher::{PageFetcher, PageSource};
pub use notifier::{LogNotifier, Notifier, TwilioNotifier, format_message};
pub use parser::{ListingParser, UNKNOWN_STATUS};
