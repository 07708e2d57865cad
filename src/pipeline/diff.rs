//! Status diff between the stored snapshot and the latest scrape.
//!
//! Only status transitions on units that were already known are reported.
//! Units seen for the first time and units that disappeared are silent.

use serde::{Deserialize, Serialize};

use crate::models::Listing;

/// A unit whose status changed since the previous run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusChange {
    /// Listing as currently scraped
    pub listing: Listing,
    /// Status recorded in the previous snapshot
    pub previous_status: String,
}

impl StatusChange {
    /// Alert token, e.g. `m12(Free->Sold)`.
    pub fn token(&self) -> String {
        format!(
            "{}({}->{})",
            self.listing.code(),
            self.previous_status,
            self.listing.status
        )
    }
}

/// Changes found in one run, in current scrape order.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub changed: Vec<StatusChange>,
}

impl ChangeSet {
    /// Check if there are any changes.
    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty()
    }

    /// Get the total number of changes.
    pub fn change_count(&self) -> usize {
        self.changed.len()
    }
}

/// Calculate status changes of `current` against `previous`.
///
/// When `previous` holds the same unit more than once, the first entry wins.
pub fn calculate_diff(current: &[Listing], previous: &[Listing]) -> ChangeSet {
    let changed = current
        .iter()
        .filter_map(|listing| {
            let prev = previous.iter().find(|p| p.same_unit(listing))?;
            (prev.status != listing.status).then(|| StatusChange {
                listing: listing.clone(),
                previous_status: prev.status.clone(),
            })
        })
        .collect();

    ChangeSet { changed }
}
