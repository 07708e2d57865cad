// src/services/parser.rs

//! Listing table parser.
//!
//! Every candidate row is classified by matching its text against the
//! identity pattern. Rows that don't match are skipped; a page with no
//! matching rows yields an empty result rather than an error.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{Category, ListingItem, ParserConfig};

/// Status used when a matching row has no status cell text.
pub const UNKNOWN_STATUS: &str = "Unknown";

/// Extracts listings from the listing page markup.
#[derive(Debug, Clone)]
pub struct ListingParser {
    row_sel: Selector,
    status_sel: Selector,
    pattern: Regex,
    category_b_marker: String,
}

impl ListingParser {
    /// Compile selectors and the identity pattern from configuration.
    pub fn new(config: &ParserConfig) -> Result<Self> {
        let pattern = Regex::new(&config.identity_pattern)?;
        if pattern.captures_len() < 3 {
            return Err(AppError::config(
                "identity pattern needs a marker group and a number group",
            ));
        }
        if config.category_b_marker.trim().is_empty() {
            return Err(AppError::config("category B marker must not be empty"));
        }

        Ok(Self {
            row_sel: Self::parse_selector(&config.row_selector)?,
            status_sel: Self::parse_selector(&config.status_selector())?,
            pattern,
            category_b_marker: config.category_b_marker.to_lowercase(),
        })
    }

    /// Parse all recognized listing rows, in document order.
    pub fn parse(&self, markup: &str) -> Vec<ListingItem> {
        let document = Html::parse_document(markup);
        document
            .select(&self.row_sel)
            .filter_map(|row| self.parse_row(&row))
            .collect()
    }

    fn parse_row(&self, row: &ElementRef) -> Option<ListingItem> {
        let text: String = row.text().collect();
        let text = text.trim();

        let caps = self.pattern.captures(text)?;
        let marker = caps.get(1)?.as_str().to_lowercase();
        let number = caps.get(2)?.as_str().to_string();

        let category = if marker.contains(&self.category_b_marker) {
            Category::Parking
        } else {
            Category::Apartment
        };

        let status: String = row
            .select(&self.status_sel)
            .flat_map(|cell| cell.text())
            .collect();
        let status = match status.trim() {
            "" => UNKNOWN_STATUS.to_string(),
            s => s.to_string(),
        };

        Some(ListingItem {
            number,
            category,
            status,
            full_text: text.to_string(),
        })
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }
}
