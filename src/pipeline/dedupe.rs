//! Duplicate removal for scraped listings.
//!
//! The listing table repeats rows across sections, so the same unit can be
//! read more than once. Rows are collapsed on the full
//! (category, number, status) triple: the same unit reported with two
//! different statuses in one page is kept twice.

use std::collections::HashSet;

use crate::models::Listing;

/// Remove exact duplicates, keeping the first occurrence in order.
pub fn dedupe(listings: impl IntoIterator<Item = Listing>) -> Vec<Listing> {
    let mut seen = HashSet::new();
    let mut deduped = Vec::new();
    for listing in listings {
        if seen.insert(listing.clone()) {
            deduped.push(listing);
        }
    }
    deduped
}
