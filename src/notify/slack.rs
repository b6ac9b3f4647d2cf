use std::fmt;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::{Client, StatusCode};

use super::retry::RetryPolicy;
use super::Notifier;
use crate::config::PipelineConfig;

/// Posts `{"text": ...}` to an incoming-webhook URL. Without a URL every send
/// is a no-op.
pub struct SlackNotifier {
    webhook_url: Option<String>,
    client: Client,
    retry: RetryPolicy,
}

#[derive(Debug)]
enum PostError {
    Transport(reqwest::Error),
    Status(StatusCode),
}

impl PostError {
    fn is_retriable(&self) -> bool {
        match self {
            PostError::Transport(_) => true,
            PostError::Status(s) => s.is_server_error() || *s == StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl fmt::Display for PostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostError::Transport(e) => write!(f, "webhook request failed: {e}"),
            PostError::Status(s) => write!(f, "webhook HTTP error: {s}"),
        }
    }
}

impl SlackNotifier {
    /// URL from `SLACK_URL` (or `SLACK_WEBHOOK_URL`).
    pub fn from_env(cfg: &PipelineConfig) -> Result<Self> {
        let url = PipelineConfig::webhook_url_from_env();
        Self::build(url, cfg.webhook_timeout_secs, cfg.webhook_retries)
    }

    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::build(Some(url.into()), 10, 3)
    }

    pub fn disabled() -> Result<Self> {
        Self::build(None, 10, 1)
    }

    fn build(webhook_url: Option<String>, timeout_secs: u64, attempts: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .context("build webhook http client")?;
        Ok(Self {
            webhook_url: webhook_url.filter(|u| !u.trim().is_empty()),
            client,
            retry: RetryPolicy::new(attempts, Duration::from_millis(500)),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn post_once(&self, url: &str, body: &serde_json::Value) -> Result<(), PostError> {
        let rsp = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(PostError::Transport)?;
        let status = rsp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(PostError::Status(status))
        }
    }
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        let Some(url) = &self.webhook_url else {
            tracing::debug!(target: "notify", "Slack disabled (no SLACK_URL)");
            return Ok(());
        };
        let body = serde_json::json!({ "text": text });
        self.retry
            .run("slack post", PostError::is_retriable, || self.post_once(url, &body))
            .await
            .map_err(|e| anyhow!("{e}"))
    }

    fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    fn name(&self) -> &'static str {
        "slack"
    }
}
