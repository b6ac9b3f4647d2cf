// src/scrape/navigator.rs
//! Page navigation seam. The resolver only needs "go to URL, tell me where you
//! landed and what the page looks like"; anything that can answer that (plain
//! HTTP, a browser driver, a test double) plugs in here.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// URL after all redirects settled.
    pub url: String,
    pub html: String,
}

#[async_trait]
pub trait Navigator: Send + Sync {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<Page>;
    fn name(&self) -> &'static str;
}

/// reqwest-backed navigator: follows HTTP redirects and reads the final document.
pub struct HttpNavigator {
    client: reqwest::Client,
}

impl HttpNavigator {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("building navigator http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Navigator for HttpNavigator {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<Page> {
        let resp = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .with_context(|| format!("navigating to {url}"))?;
        let status = resp.status();
        let settled = resp.url().to_string();
        if !status.is_success() {
            return Err(anyhow!("HTTP {status} at {settled}"));
        }
        let html = resp.text().await.context("reading page body")?;
        Ok(Page { url: settled, html })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
