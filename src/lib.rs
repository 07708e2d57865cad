// src/lib.rs

//! Listing Watcher Library
//!
//! Scrapes a housing listing page, diffs unit statuses against the last
//! stored snapshot and sends an SMS when a known unit changes status.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;

#[cfg(feature = "lambda")]
pub mod lambda;
