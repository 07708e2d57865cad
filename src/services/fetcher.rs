// src/services/fetcher.rs

//! Listing page fetcher.
//!
//! Outside production the fetcher keeps a copy of the last page it
//! downloaded under `cache_dir` and serves it instead of going to the
//! network, so parser work doesn't hammer the live site.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::USER_AGENT;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{ExecutionMode, SourceConfig};
use crate::utils::http::{create_async_client, random_user_agent};

/// Anything that can produce listing page markup for a URL.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// HTTP fetcher with a development-only page cache.
pub struct PageFetcher {
    client: Client,
    user_agents: Vec<String>,
    cache_dir: Option<PathBuf>,
}

impl PageFetcher {
    /// Create a fetcher; the cache is enabled only outside production.
    pub fn new(config: &SourceConfig, mode: ExecutionMode) -> Result<Self> {
        let client = create_async_client(config)?;
        let cache_dir = (!mode.is_production()).then(|| config.cache_dir.clone());

        Ok(Self {
            client,
            user_agents: config.user_agents.clone(),
            cache_dir,
        })
    }

    /// Whether cached pages may be served.
    pub fn cache_enabled(&self) -> bool {
        self.cache_dir.is_some()
    }

    /// Cache file for a URL: `{cache_dir}/{sha256(url)}.html`.
    pub fn cache_path(cache_dir: &Path, url: &str) -> PathBuf {
        let digest = Sha256::digest(url.as_bytes());
        cache_dir.join(format!("{}.html", hex::encode(digest)))
    }

    /// Perform a single GET; non-2xx and timeouts are errors.
    async fn fetch_remote(&self, url: &str) -> Result<String> {
        let user_agent = random_user_agent(&self.user_agents);
        log::debug!("GET {} (User-Agent: {})", url, user_agent);

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent)
            .send()
            .await
            .map_err(|e| AppError::fetch(url, describe(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::fetch(url, format!("unexpected status {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::fetch(url, describe(&e)))
    }

    async fn read_cache(path: &Path) -> Result<Option<String>> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn write_cache(path: &Path, body: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(path).await?;
        file.write_all(body.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl PageSource for PageFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let Some(cache_dir) = &self.cache_dir else {
            return self.fetch_remote(url).await;
        };

        let path = Self::cache_path(cache_dir, url);
        match Self::read_cache(&path).await {
            Ok(Some(cached)) => {
                log::info!("Serving cached page from {}", path.display());
                return Ok(cached);
            }
            Ok(None) => {}
            Err(e) => log::warn!("Ignoring unreadable page cache {}: {}", path.display(), e),
        }

        let body = self.fetch_remote(url).await?;
        if let Err(e) = Self::write_cache(&path, &body).await {
            log::warn!("Failed to write page cache {}: {}", path.display(), e);
        }
        Ok(body)
    }
}

fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {err}")
    } else {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use crate::utils::test_server;

    fn source_config(cache_dir: &Path) -> SourceConfig {
        SourceConfig {
            cache_dir: cache_dir.to_path_buf(),
            ..SourceConfig::default()
        }
    }

    #[test]
    fn test_cache_disabled_in_production() {
        let tmp = TempDir::new().unwrap();
        let fetcher = PageFetcher::new(&source_config(tmp.path()), ExecutionMode::Production).unwrap();
        assert!(!fetcher.cache_enabled());

        let fetcher = PageFetcher::new(&source_config(tmp.path()), ExecutionMode::Development).unwrap();
        assert!(fetcher.cache_enabled());
    }

    #[test]
    fn test_cache_path_is_stable_per_url() {
        let dir = Path::new("cache");
        let a = PageFetcher::cache_path(dir, "https://listing.test/a");
        let b = PageFetcher::cache_path(dir, "https://listing.test/b");
        assert_eq!(a, PageFetcher::cache_path(dir, "https://listing.test/a"));
        assert_ne!(a, b);
        assert_eq!(a.extension().unwrap(), "html");
    }

    #[tokio::test]
    async fn test_serves_cached_page() {
        let tmp = TempDir::new().unwrap();
        // Unroutable URL: any network attempt would fail the test.
        let url = "http://127.0.0.1:9/listing";
        let path = PageFetcher::cache_path(tmp.path(), url);
        PageFetcher::write_cache(&path, "<table></table>").await.unwrap();

        let fetcher = PageFetcher::new(&source_config(tmp.path()), ExecutionMode::Test).unwrap();
        let body = fetcher.fetch(url).await.unwrap();
        assert_eq!(body, "<table></table>");
    }

    #[tokio::test]
    async fn test_production_ignores_cache() {
        let tmp = TempDir::new().unwrap();
        let url = "http://127.0.0.1:9/listing";
        let path = PageFetcher::cache_path(tmp.path(), url);
        PageFetcher::write_cache(&path, "<table></table>").await.unwrap();

        let fetcher = PageFetcher::new(&source_config(tmp.path()), ExecutionMode::Production).unwrap();
        let err = fetcher.fetch(url).await.unwrap_err();
        assert!(matches!(err, AppError::Fetch { .. }));
    }

    #[tokio::test]
    async fn test_non_success_status_is_fetch_error() {
        let (base, server) = test_server::serve(1, |_| (503, String::new()));
        let url = format!("{base}/listing");

        let tmp = TempDir::new().unwrap();
        let fetcher = PageFetcher::new(&source_config(tmp.path()), ExecutionMode::Production).unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();

        assert!(matches!(err, AppError::Fetch { .. }));
        let message = err.to_string();
        assert!(message.contains(&url));
        assert!(message.contains("503"));
        server.join().unwrap();
    }

    #[tokio::test]
    async fn test_network_fetch_fills_dev_cache() {
        let (base, server) = test_server::serve(1, |_| (200, "<tr/>".to_string()));
        let url = format!("{base}/listing");

        let tmp = TempDir::new().unwrap();
        let fetcher = PageFetcher::new(&source_config(tmp.path()), ExecutionMode::Development).unwrap();
        assert_eq!(fetcher.fetch(&url).await.unwrap(), "<tr/>");

        let requests = server.join().unwrap();
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].path, "/listing");
        assert!(requests[0].header("user-agent").is_some());

        let cached = std::fs::read_to_string(PageFetcher::cache_path(tmp.path(), &url)).unwrap();
        assert_eq!(cached, "<tr/>");

        // The server is gone; a second fetch can only come from the cache.
        assert_eq!(fetcher.fetch(&url).await.unwrap(), "<tr/>");
    }
}
