// src/services/notifier.rs

//! Change alert dispatch.
//!
//! One SMS per run at most. Failures surface as `AppError::Notify` and the
//! pipeline decides what to do with them.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::{MessageConfig, TwilioConfig};
use crate::pipeline::ChangeSet;

/// Request timeout for the messaging API.
const NOTIFY_TIMEOUT_SECS: u64 = 10;

/// Sends a human-readable alert for a change set.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, changes: &ChangeSet) -> Result<()>;
}

/// Build the alert text.
///
/// `Kombinat Update: | Zmieniono status: m12(Free->Sold),p3(Free->Reserved)`
pub fn format_message(config: &MessageConfig, changes: &ChangeSet) -> String {
    let mut parts = vec![config.preamble.clone()];

    if changes.has_changes() {
        let details = changes
            .changed
            .iter()
            .map(|change| change.token())
            .collect::<Vec<_>>()
            .join(",");
        parts.push(format!("{}{}", config.changes_label, details));
    }

    parts.join(&config.separator)
}

/// SMS notifier backed by the Twilio Messages API.
pub struct TwilioNotifier {
    client: Client,
    credentials: TwilioConfig,
    message: MessageConfig,
}

impl TwilioNotifier {
    pub fn new(credentials: TwilioConfig, message: MessageConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(NOTIFY_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            credentials,
            message,
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.credentials.api_base.trim_end_matches('/'),
            self.credentials.account_sid
        )
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    async fn notify(&self, changes: &ChangeSet) -> Result<()> {
        let body = format_message(&self.message, changes);

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(
                &self.credentials.account_sid,
                Some(&self.credentials.auth_token),
            )
            .form(&[
                ("To", self.credentials.to_number.as_str()),
                ("From", self.credentials.from_number.as_str()),
                ("Body", body.as_str()),
            ])
            .send()
            .await
            .map_err(AppError::notify)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::notify(format!(
                "messaging API rejected request ({status}): {text}"
            )));
        }

        log::info!(
            "Sent alert for {} change(s) to {}",
            changes.change_count(),
            self.credentials.to_number
        );
        Ok(())
    }
}

/// Dry-run notifier that only logs the alert text.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier {
    message: MessageConfig,
}

impl LogNotifier {
    pub fn new(message: MessageConfig) -> Self {
        Self { message }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, changes: &ChangeSet) -> Result<()> {
        log::info!("[dry-run] {}", format_message(&self.message, changes));
        Ok(())
    }
}
