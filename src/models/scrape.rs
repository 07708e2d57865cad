//! Scrape run summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Category, Listing};

/// Outcome of one fetch-parse-dedupe pass over the listing page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScrapeResult {
    /// Unique listings found
    pub items_processed: usize,
    pub apartment_count: usize,
    pub parking_count: usize,
    pub status: String,
    pub listings: Vec<Listing>,
    pub scraped_at: DateTime<Utc>,
    /// Page the listings were read from
    pub url: String,
}

impl ScrapeResult {
    /// Summarize an already deduplicated listing set.
    pub fn new(listings: Vec<Listing>, url: impl Into<String>) -> Self {
        let apartment_count = count_category(&listings, Category::Apartment);
        let parking_count = count_category(&listings, Category::Parking);

        Self {
            items_processed: listings.len(),
            apartment_count,
            parking_count,
            status: "completed".to_string(),
            listings,
            scraped_at: Utc::now(),
            url: url.into(),
        }
    }
}

fn count_category(listings: &[Listing], category: Category) -> usize {
    listings.iter().filter(|l| l.category == category).count()
}
