//! Outbound email for the daily automated run.
//!
//! [`Notifier`] is the seam the server calls; [`ResendNotifier`] posts to the
//! Resend HTTP API. [`digest`] renders a research package into the email body.

pub mod digest;

use async_trait::async_trait;
use deepcut_shared::{DeepCutError, EmailConfig, Result};
use reqwest::Client;
use serde::Serialize;
use tracing::{info, instrument};

pub use digest::{build_email_html, digest_subject};

/// User-Agent string for notifier requests.
const USER_AGENT: &str = concat!("DeepCut/", env!("CARGO_PKG_VERSION"));

/// A single outbound email.
#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

/// Delivers notification emails.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Resend API client.
#[derive(Debug, Clone)]
pub struct ResendNotifier {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl ResendNotifier {
    /// Build a notifier from the `[email]` config section and a resolved API key.
    pub fn new(config: &EmailConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| DeepCutError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/emails", config.base_url.trim_end_matches('/')),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl Notifier for ResendNotifier {
    #[instrument(skip_all, fields(subject = %message.subject, recipients = message.to.len()))]
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        if message.to.is_empty() {
            return Err(DeepCutError::Notify("no recipients configured".into()));
        }

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(message)
            .send()
            .await
            .map_err(|e| DeepCutError::Notify(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(DeepCutError::Notify(format!("HTTP {status}: {text}")));
        }

        info!("email sent");
        Ok(())
    }
}
