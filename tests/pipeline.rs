//! End-to-end pipeline runs against in-memory collaborators.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use listing_watcher::error::{AppError, Result};
use listing_watcher::models::{Category, Config, ExecutionMode, Listing};
use listing_watcher::pipeline::{ChangeSet, PipelineContext, run_pipeline};
use listing_watcher::services::{ListingParser, Notifier, PageSource};
use listing_watcher::storage::{LocalStorage, Snapshot, SnapshotStore};
use tempfile::TempDir;

struct StaticPage(String);

#[async_trait]
impl PageSource for StaticPage {
    async fn fetch(&self, _url: &str) -> Result<String> {
        Ok(self.0.clone())
    }
}

struct DownPage;

#[async_trait]
impl PageSource for DownPage {
    async fn fetch(&self, url: &str) -> Result<String> {
        Err(AppError::fetch(url, "unexpected status 503 Service Unavailable"))
    }
}

#[derive(Default)]
struct MemoryStore {
    data: Mutex<HashMap<String, Snapshot>>,
    fail_get: bool,
    fail_put: bool,
}

impl MemoryStore {
    fn with(key: &str, listings: Vec<Listing>) -> Self {
        let store = Self::default();
        store
            .data
            .lock()
            .unwrap()
            .insert(key.to_string(), Snapshot::new(listings));
        store
    }

    fn listings(&self, key: &str) -> Option<Vec<Listing>> {
        self.data.lock().unwrap().get(key).map(|s| s.listings.clone())
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Snapshot>> {
        if self.fail_get {
            return Err(AppError::store("connection reset"));
        }
        Ok(self.data.lock().unwrap().get(key).cloned())
    }

    async fn put(&self, key: &str, listings: &[Listing]) -> Result<Snapshot> {
        if self.fail_put {
            return Err(AppError::store("read-only replica"));
        }
        let snapshot = Snapshot::new(listings.to_vec());
        self.data
            .lock()
            .unwrap()
            .insert(key.to_string(), snapshot.clone());
        Ok(snapshot)
    }
}

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<ChangeSet>>,
    fail: bool,
}

impl RecordingNotifier {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, changes: &ChangeSet) -> Result<()> {
        self.sent.lock().unwrap().push(changes.clone());
        if self.fail {
            return Err(AppError::notify("messaging API rejected request (401)"));
        }
        Ok(())
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.mode = ExecutionMode::Test;
    config.source.url = "https://listing.test/units".to_string();
    config
}

fn page(rows: &[(&str, &str)]) -> StaticPage {
    let body: String = rows
        .iter()
        .map(|(unit, status)| {
            format!(
                "<tr><td>Jana Kochanowskiego {unit}</td><td class=\"status-color\">{status}</td></tr>"
            )
        })
        .collect();
    StaticPage(format!("<html><body><table>{body}</table></body></html>"))
}

fn apt(number: &str, status: &str) -> Listing {
    Listing::new(Category::Apartment, number, status)
}

#[tokio::test]
async fn status_change_is_reported_and_persisted() {
    let config = test_config();
    let parser = ListingParser::new(&config.parser).unwrap();
    let source = page(&[("m. 12", "Sold")]);
    let store = MemoryStore::with("listings", vec![apt("12", "Free")]);
    let notifier = RecordingNotifier::default();

    let ctx = PipelineContext::new(&config, &source, &parser, &store, &notifier);
    let outcome = run_pipeline(&ctx).await;

    assert!(outcome.success);
    let diff = outcome.diff.unwrap();
    assert_eq!(diff.changed.len(), 1);
    assert_eq!(diff.changed[0].listing, apt("12", "Sold"));
    assert_eq!(diff.changed[0].previous_status, "Free");
    assert_eq!(notifier.sent_count(), 1);
    assert_eq!(store.listings("listings"), Some(vec![apt("12", "Sold")]));
}

#[tokio::test]
async fn first_run_is_silent_but_persists() {
    let config = test_config();
    let parser = ListingParser::new(&config.parser).unwrap();
    let source = page(&[("m.p. 3", "Reserved")]);
    let store = MemoryStore::default();
    let notifier = RecordingNotifier::default();

    let ctx = PipelineContext::new(&config, &source, &parser, &store, &notifier);
    let outcome = run_pipeline(&ctx).await;

    assert!(outcome.success);
    assert!(!outcome.diff.unwrap().has_changes());
    assert_eq!(notifier.sent_count(), 0);
    assert_eq!(
        store.listings("listings"),
        Some(vec![Listing::new(Category::Parking, "3", "Reserved")])
    );
}

#[tokio::test]
async fn duplicate_rows_count_once() {
    let config = test_config();
    let parser = ListingParser::new(&config.parser).unwrap();
    let source = page(&[("m. 5", "Free"), ("m. 5", "Free")]);
    let store = MemoryStore::default();
    let notifier = RecordingNotifier::default();

    let ctx = PipelineContext::new(&config, &source, &parser, &store, &notifier);
    let outcome = run_pipeline(&ctx).await;

    let result = outcome.result.unwrap();
    assert_eq!(result.items_processed, 1);
    assert_eq!(result.apartment_count, 1);
    assert_eq!(result.parking_count, 0);
}

#[tokio::test]
async fn page_without_listings_still_succeeds() {
    let config = test_config();
    let parser = ListingParser::new(&config.parser).unwrap();
    let source = StaticPage("<html><body><p>Site under maintenance</p></body></html>".into());
    let store = MemoryStore::with("listings", vec![apt("1", "Free")]);
    let notifier = RecordingNotifier::default();

    let ctx = PipelineContext::new(&config, &source, &parser, &store, &notifier);
    let outcome = run_pipeline(&ctx).await;

    assert!(outcome.success);
    assert_eq!(outcome.result.unwrap().items_processed, 0);
    assert_eq!(notifier.sent_count(), 0);
    assert_eq!(store.listings("listings"), Some(Vec::new()));
}

#[tokio::test]
async fn notify_failure_does_not_block_persistence() {
    let config = test_config();
    let parser = ListingParser::new(&config.parser).unwrap();
    let source = page(&[("m. 12", "Sold")]);
    let store = MemoryStore::with("listings", vec![apt("12", "Free")]);
    let notifier = RecordingNotifier::failing();

    let ctx = PipelineContext::new(&config, &source, &parser, &store, &notifier);
    let outcome = run_pipeline(&ctx).await;

    assert!(outcome.success);
    assert!(outcome.notify_error.unwrap().contains("rejected"));
    assert_eq!(store.listings("listings"), Some(vec![apt("12", "Sold")]));
}

#[tokio::test]
async fn fetch_failure_is_fatal_and_keeps_state() {
    let config = test_config();
    let parser = ListingParser::new(&config.parser).unwrap();
    let store = MemoryStore::with("listings", vec![apt("12", "Free")]);
    let notifier = RecordingNotifier::default();

    let ctx = PipelineContext::new(&config, &DownPage, &parser, &store, &notifier);
    let outcome = run_pipeline(&ctx).await;

    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("https://listing.test/units"));
    assert!(outcome.diff.is_none());
    assert_eq!(store.listings("listings"), Some(vec![apt("12", "Free")]));
}

#[tokio::test]
async fn store_read_failure_is_fatal() {
    let config = test_config();
    let parser = ListingParser::new(&config.parser).unwrap();
    let source = page(&[("m. 12", "Sold")]);
    let store = MemoryStore {
        fail_get: true,
        ..MemoryStore::default()
    };
    let notifier = RecordingNotifier::default();

    let ctx = PipelineContext::new(&config, &source, &parser, &store, &notifier);
    let outcome = run_pipeline(&ctx).await;

    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("connection reset"));
    assert_eq!(notifier.sent_count(), 0);
}

#[tokio::test]
async fn store_write_failure_reports_failure_after_notify() {
    let config = test_config();
    let parser = ListingParser::new(&config.parser).unwrap();
    let source = page(&[("m. 12", "Sold")]);
    let store = MemoryStore {
        fail_put: true,
        ..MemoryStore::with("listings", vec![apt("12", "Free")])
    };
    let notifier = RecordingNotifier::default();

    let ctx = PipelineContext::new(&config, &source, &parser, &store, &notifier);
    let outcome = run_pipeline(&ctx).await;

    assert!(!outcome.success);
    assert_eq!(notifier.sent_count(), 1);
}

#[tokio::test]
async fn second_run_with_same_page_is_quiet() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config();
    config.store.dir = tmp.path().to_path_buf();

    let parser = ListingParser::new(&config.parser).unwrap();
    let store = LocalStorage::new(&config.store.dir);
    let notifier = RecordingNotifier::default();

    let before = page(&[("m. 1", "Free"), ("m.p. 2", "Free")]);
    let ctx = PipelineContext::new(&config, &before, &parser, &store, &notifier);
    assert!(run_pipeline(&ctx).await.success);

    let after = page(&[("m. 1", "Sold"), ("m.p. 2", "Free")]);
    let ctx = PipelineContext::new(&config, &after, &parser, &store, &notifier);
    let outcome = run_pipeline(&ctx).await;
    assert_eq!(outcome.diff.unwrap().change_count(), 1);

    let ctx = PipelineContext::new(&config, &after, &parser, &store, &notifier);
    let outcome = run_pipeline(&ctx).await;
    assert!(!outcome.diff.unwrap().has_changes());
    assert_eq!(notifier.sent_count(), 1);
}

#[tokio::test]
async fn outcome_serializes_for_the_caller() {
    let config = test_config();
    let parser = ListingParser::new(&config.parser).unwrap();
    let source = page(&[("m. 12", "Sold")]);
    let store = MemoryStore::with("listings", vec![apt("12", "Free")]);
    let notifier = RecordingNotifier::default();

    let ctx = PipelineContext::new(&config, &source, &parser, &store, &notifier);
    let json = serde_json::to_value(run_pipeline(&ctx).await).unwrap();

    assert_eq!(json["success"], true);
    assert_eq!(json["result"]["items_processed"], 1);
    assert_eq!(json["diff"]["changed"][0]["previous_status"], "Free");
    assert!(json.get("notify_error").is_none());
}
