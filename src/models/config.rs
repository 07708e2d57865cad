//! Application configuration structures.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use regex::Regex;
use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Where the watcher is running.
///
/// Production disables the page cache and enables the startup delay and
/// the trigger authorization check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Production,
    #[default]
    Development,
    Test,
}

impl ExecutionMode {
    pub fn is_production(self) -> bool {
        self == ExecutionMode::Production
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionMode::Production => "production",
            ExecutionMode::Development => "development",
            ExecutionMode::Test => "test",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Ok(ExecutionMode::Production),
            "development" | "dev" => Ok(ExecutionMode::Development),
            "test" => Ok(ExecutionMode::Test),
            other => Err(AppError::config(format!("Unknown execution mode: {other}"))),
        }
    }
}

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Execution mode
    #[serde(default)]
    pub mode: ExecutionMode,

    /// Listing page and HTTP behavior
    #[serde(default)]
    pub source: SourceConfig,

    /// Row recognition rules
    #[serde(default)]
    pub parser: ParserConfig,

    /// Snapshot persistence
    #[serde(default)]
    pub store: StoreConfig,

    /// Startup jitter
    #[serde(default)]
    pub delay: DelayConfig,

    /// Alert text
    #[serde(default)]
    pub message: MessageConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.source.url)?;
        if self.mode.is_production() && self.source.url == defaults::url() {
            return Err(AppError::validation(
                "source.url is the built-in placeholder; set it in the config file or LISTING_URL",
            ));
        }
        if self.source.timeout_secs == 0 {
            return Err(AppError::validation("source.timeout_secs must be > 0"));
        }
        if self.source.user_agents.iter().all(|ua| ua.trim().is_empty()) {
            return Err(AppError::validation("source.user_agents is empty"));
        }
        if self.store.key.trim().is_empty() {
            return Err(AppError::validation("store.key is empty"));
        }
        if self.delay.min_ms > self.delay.max_ms {
            return Err(AppError::validation("delay.min_ms must be <= delay.max_ms"));
        }
        if self.parser.category_b_marker.trim().is_empty() {
            return Err(AppError::validation("parser.category_b_marker is empty"));
        }

        let pattern = Regex::new(&self.parser.identity_pattern)?;
        if pattern.captures_len() < 3 {
            return Err(AppError::validation(
                "parser.identity_pattern needs a marker group and a number group",
            ));
        }
        Selector::parse(&self.parser.row_selector)
            .map_err(|e| AppError::selector(&self.parser.row_selector, format!("{e:?}")))?;
        let status_selector = self.parser.status_selector();
        Selector::parse(&status_selector)
            .map_err(|e| AppError::selector(&status_selector, format!("{e:?}")))?;
        Ok(())
    }
}

/// Listing page location and HTTP settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Listing page URL
    #[serde(default = "defaults::url")]
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Pool of User-Agent strings, one picked per request
    #[serde(default = "defaults::user_agents")]
    pub user_agents: Vec<String>,

    /// Directory for the development page cache
    #[serde(default = "defaults::cache_dir")]
    pub cache_dir: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: defaults::url(),
            timeout_secs: defaults::timeout(),
            user_agents: defaults::user_agents(),
            cache_dir: defaults::cache_dir(),
        }
    }
}

/// Row recognition rules for the listing table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// CSS selector for candidate rows
    #[serde(default = "defaults::row_selector")]
    pub row_selector: String,

    /// Case-insensitive pattern; group 1 is the type marker, group 2 the number
    #[serde(default = "defaults::identity_pattern")]
    pub identity_pattern: String,

    /// Marker sub-token identifying parking spots
    #[serde(default = "defaults::category_b_marker")]
    pub category_b_marker: String,

    /// Substring of the status cell class name
    #[serde(default = "defaults::status_class_fragment")]
    pub status_class_fragment: String,
}

impl ParserConfig {
    /// Selector for the status cell within a row.
    pub fn status_selector(&self) -> String {
        format!("td[class*=\"{}\"]", self.status_class_fragment)
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            row_selector: defaults::row_selector(),
            identity_pattern: defaults::identity_pattern(),
            category_b_marker: defaults::category_b_marker(),
            status_class_fragment: defaults::status_class_fragment(),
        }
    }
}

/// Snapshot persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Key the snapshot is stored under
    #[serde(default = "defaults::store_key")]
    pub key: String,

    /// Root directory for local storage
    #[serde(default = "defaults::store_dir")]
    pub dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            key: defaults::store_key(),
            dir: defaults::store_dir(),
        }
    }
}

/// Bounds of the randomized startup delay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelayConfig {
    #[serde(default)]
    pub min_ms: u64,

    #[serde(default = "defaults::delay_max")]
    pub max_ms: u64,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            min_ms: 0,
            max_ms: defaults::delay_max(),
        }
    }
}

/// Alert message wording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageConfig {
    #[serde(default = "defaults::preamble")]
    pub preamble: String,

    /// Text placed before the list of changed units
    #[serde(default = "defaults::changes_label")]
    pub changes_label: String,

    /// Separator between message parts
    #[serde(default = "defaults::separator")]
    pub separator: String,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            preamble: defaults::preamble(),
            changes_label: defaults::changes_label(),
            separator: defaults::separator(),
        }
    }
}

/// Credentials for the Twilio messaging API.
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender phone number
    pub from_number: String,
    /// Recipient phone number
    pub to_number: String,
    pub api_base: String,
}

impl TwilioConfig {
    /// Read credentials from `TWILIO_*` and `TARGET_PHONE_NUMBER`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            account_sid: require_env("TWILIO_ACCOUNT_SID")?,
            auth_token: require_env("TWILIO_AUTH_TOKEN")?,
            from_number: require_env("TWILIO_PHONE_NUMBER")?,
            to_number: require_env("TARGET_PHONE_NUMBER")?,
            api_base: std::env::var("TWILIO_API_BASE")
                .unwrap_or_else(|_| defaults::twilio_api_base()),
        })
    }
}

/// Connection details for a REST key-value store.
#[derive(Debug, Clone)]
pub struct RestKvConfig {
    pub base_url: String,
    pub token: String,
}

impl RestKvConfig {
    /// Read `KV_REST_API_URL` and `KV_REST_API_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let base_url = require_env("KV_REST_API_URL")?;
        url::Url::parse(&base_url)?;
        Ok(Self {
            base_url,
            token: require_env("KV_REST_API_TOKEN")?,
        })
    }
}

fn require_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AppError::config(format!("{name} is not set"))),
    }
}

mod defaults {
    use std::path::PathBuf;

    // Source defaults
    pub fn url() -> String {
        "https://example.com/listing".into()
    }
    pub fn timeout() -> u64 {
        10
    }
    pub fn user_agents() -> Vec<String> {
        vec![
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".into(),
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".into(),
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0".into(),
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15".into(),
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".into(),
        ]
    }
    pub fn cache_dir() -> PathBuf {
        PathBuf::from("cache")
    }

    // Parser defaults
    pub fn row_selector() -> String {
        "tr".into()
    }
    pub fn identity_pattern() -> String {
        r"(?i)Jana\s+Kochanowskiego\s+(m\.p\.|m\.)\s+(\d+)".into()
    }
    pub fn category_b_marker() -> String {
        "p".into()
    }
    pub fn status_class_fragment() -> String {
        "status-color".into()
    }

    // Store defaults
    pub fn store_key() -> String {
        "listings".into()
    }
    pub fn store_dir() -> PathBuf {
        PathBuf::from("storage")
    }

    // Delay defaults
    pub fn delay_max() -> u64 {
        20_000
    }

    // Message defaults
    pub fn preamble() -> String {
        "Kombinat Update:".into()
    }
    pub fn changes_label() -> String {
        "Zmieniono status: ".into()
    }
    pub fn separator() -> String {
        " | ".into()
    }

    pub fn twilio_api_base() -> String {
        "https://api.twilio.com".into()
    }
}
