//! Storage abstractions for snapshot persistence.
//!
//! The watcher keeps exactly one snapshot: the listings seen by the last
//! successful run. Every run replaces it wholesale; there is no history.
//!
//! ## Backends
//!
//! ```text
//! LocalStorage   {root}/{key}.json
//! RestKvStorage  {KV_REST_API_URL}/get/{key}, /set/{key}
//! S3Storage      s3://{bucket}/{prefix}/{key}.json   (feature "s3")
//! ```

pub mod local;
pub mod rest_kv;
#[cfg(feature = "s3")]
pub mod s3;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::Listing;

// Re-export for convenience
pub use local::LocalStorage;
pub use rest_kv::RestKvStorage;
#[cfg(feature = "s3")]
pub use s3::S3Storage;

/// Persisted state of the last run.
///
/// Stored as `{"listings": [{"number", "type", "status"}], "lastUpdated"}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Listings seen by the last run
    pub listings: Vec<Listing>,
    /// When the snapshot was written
    pub last_updated: DateTime<Utc>,
}

impl Snapshot {
    /// Stamp a new snapshot with the current time.
    pub fn new(listings: Vec<Listing>) -> Self {
        Self {
            listings,
            last_updated: Utc::now(),
        }
    }
}

/// Trait for snapshot storage backends.
///
/// `get` must tell a missing key (`Ok(None)`) apart from a failing store
/// (`Err`).
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Read the snapshot under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Snapshot>>;

    /// Replace the snapshot under `key` with a freshly stamped one.
    async fn put(&self, key: &str, listings: &[Listing]) -> Result<Snapshot>;
}
