//! AWS S3 storage implementation.
//!
//! The snapshot for `key` lives at `s3://{bucket}/{prefix}/{key}.json`.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;

use crate::error::{AppError, Result};
use crate::models::Listing;
use crate::storage::{Snapshot, SnapshotStore};

/// S3-based snapshot storage.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    prefix: String,
}

impl S3Storage {
    /// Create a new S3 storage instance.
    pub fn new(client: Client, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }

    /// Create S3 storage from environment configuration.
    pub async fn from_env() -> Result<Self> {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = Client::new(&config);

        let bucket = std::env::var("S3_BUCKET")
            .map_err(|_| AppError::config("S3_BUCKET is not set"))?;
        let prefix = std::env::var("S3_PREFIX").unwrap_or_else(|_| "listing-watcher".to_string());

        Ok(Self::new(client, bucket, prefix))
    }

    /// Object key for a snapshot key.
    fn object_key(&self, key: &str) -> String {
        object_key(&self.prefix, key)
    }

    /// Read raw bytes, `None` when the object doesn't exist.
    async fn read_bytes_optional(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(output) => {
                let bytes = output.body.collect().await.map_err(AppError::store)?;
                Ok(Some(bytes.into_bytes().to_vec()))
            }
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    log::info!("No existing data at s3://{}/{}", self.bucket, key);
                    Ok(None)
                } else {
                    Err(AppError::store(service_err))
                }
            }
        }
    }
}

fn object_key(prefix: &str, key: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{key}.json")
    } else {
        format!("{prefix}/{key}.json")
    }
}

#[async_trait]
impl SnapshotStore for S3Storage {
    async fn get(&self, key: &str) -> Result<Option<Snapshot>> {
        let object_key = self.object_key(key);
        match self.read_bytes_optional(&object_key).await? {
            Some(bytes) => {
                let snapshot = serde_json::from_slice(&bytes).map_err(|e| {
                    AppError::store(format!("decoding s3://{}/{}: {}", self.bucket, object_key, e))
                })?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, listings: &[Listing]) -> Result<Snapshot> {
        let snapshot = Snapshot::new(listings.to_vec());
        let json = serde_json::to_string_pretty(&snapshot)?;
        let object_key = self.object_key(key);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .body(ByteStream::from(json.into_bytes()))
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| AppError::store(e.into_service_error()))?;

        log::info!(
            "Wrote {} listings to s3://{}/{}",
            snapshot.listings.len(),
            self.bucket,
            object_key
        );
        Ok(snapshot)
    }
}
