//! Listing data structures.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Kind of unit a listing row describes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Residential unit (`m.` marker)
    #[default]
    Apartment,
    /// Parking spot (`m.p.` marker)
    Parking,
}

impl Category {
    /// Single-letter code used in alert messages.
    pub fn letter(self) -> char {
        match self {
            Category::Apartment => 'm',
            Category::Parking => 'p',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Apartment => "apartment",
            Category::Parking => "parking",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "apartment" | "m" => Ok(Category::Apartment),
            "parking" | "p" => Ok(Category::Parking),
            other => Err(AppError::validation(format!("Unknown category: {other}"))),
        }
    }
}

/// A listing row as it appears on the page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListingItem {
    /// Unit number
    pub number: String,

    /// Apartment or parking
    #[serde(rename = "type")]
    pub category: Category,

    /// Sale status text shown on the page
    pub status: String,

    /// Whole row text, for display only
    pub full_text: String,
}

/// A tracked listing as persisted between runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Listing {
    pub number: String,
    #[serde(rename = "type")]
    pub category: Category,
    pub status: String,
}

impl Listing {
    pub fn new(category: Category, number: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            category,
            status: status.into(),
        }
    }

    /// Whether both listings describe the same unit, ignoring status.
    pub fn same_unit(&self, other: &Listing) -> bool {
        self.category == other.category && self.number == other.number
    }

    /// Short unit code such as `m12` or `p3`.
    pub fn code(&self) -> String {
        format!("{}{}", self.category.letter(), self.number)
    }
}

impl From<&ListingItem> for Listing {
    fn from(item: &ListingItem) -> Self {
        Self {
            number: item.number.clone(),
            category: item.category,
            status: item.status.clone(),
        }
    }
}

impl From<ListingItem> for Listing {
    fn from(item: ListingItem) -> Self {
        Self {
            number: item.number,
            category: item.category,
            status: item.status,
        }
    }
}
