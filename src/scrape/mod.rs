// src/scrape/mod.rs
//! Content resolver: redirect resolution + article text extraction.
//!
//! One navigator is reused sequentially for every article in a batch, with a
//! fixed pause between scrapes. Per-item failures become `ArticleBody`
//! sentinels; they never abort the batch.

pub mod html;
pub mod navigator;

use metrics::counter;
use std::time::Duration;
use tracing::{info, warn};

use crate::article::{ArticleBody, ScrapedArticle};
use crate::config::PipelineConfig;
use crate::ingest::types::FeedItem;
use navigator::Navigator;

/// Max chars of an error message kept in `ArticleBody::Failed`.
const ERROR_SNIPPET_CHARS: usize = 100;

#[derive(Debug, Clone)]
pub struct ResolverOptions {
    pub redirect_hosts: Vec<String>,
    pub resolve_timeout: Duration,
    pub scrape_timeout: Duration,
    /// Pause after each navigation before reading the page.
    pub settle_delay: Duration,
    /// Pause between articles.
    pub request_delay: Duration,
    pub min_paragraph_chars: usize,
}

impl ResolverOptions {
    pub fn from_config(cfg: &PipelineConfig) -> Self {
        Self {
            redirect_hosts: cfg.redirect_hosts.clone(),
            resolve_timeout: Duration::from_secs(cfg.resolve_timeout_secs),
            scrape_timeout: Duration::from_secs(cfg.scrape_timeout_secs),
            settle_delay: Duration::from_millis(cfg.settle_delay_ms),
            request_delay: Duration::from_millis(cfg.request_delay_ms),
            min_paragraph_chars: cfg.min_paragraph_chars,
        }
    }
}

pub struct ContentResolver<N: Navigator> {
    nav: N,
    opts: ResolverOptions,
}

impl<N: Navigator> ContentResolver<N> {
    pub fn new(nav: N, opts: ResolverOptions) -> Self {
        Self { nav, opts }
    }

    pub fn is_redirector(&self, link: &str) -> bool {
        html::host_of(link).is_some_and(|h| html::host_matches(&h, &self.opts.redirect_hosts))
    }

    async fn settle(&self) {
        if !self.opts.settle_delay.is_zero() {
            tokio::time::sleep(self.opts.settle_delay).await;
        }
    }

    /// Article URL for a feed link. Direct links pass through; redirector links
    /// are followed. `None` (navigation failed) means the story is skipped.
    pub async fn resolve_url(&self, link: &str) -> Option<String> {
        if !self.is_redirector(link) {
            return Some(link.to_string());
        }

        let page = match self.nav.goto(link, self.opts.resolve_timeout).await {
            Ok(p) => p,
            Err(e) => {
                warn!(target: "scrape", error = %truncate(&format!("{e:#}"), 60), "redirect navigation failed");
                return None;
            }
        };
        self.settle().await;

        if !self.is_redirector(&page.url) {
            return Some(page.url);
        }
        // Still on the redirector: prefer an outbound link on the page.
        html::first_external_link(&page.html, &self.opts.redirect_hosts).or(Some(page.url))
    }

    /// Navigate and extract paragraph text.
    pub async fn scrape(&self, url: &str) -> ArticleBody {
        let page = match self.nav.goto(url, self.opts.scrape_timeout).await {
            Ok(p) => p,
            Err(e) => {
                counter!("scrape_failures_total").increment(1);
                return ArticleBody::Failed(truncate(&format!("{e:#}"), ERROR_SNIPPET_CHARS));
            }
        };
        self.settle().await;

        let text = html::extract_paragraph_text(&page.html, self.opts.min_paragraph_chars);
        if text.is_empty() {
            counter!("scrape_no_content_total").increment(1);
            ArticleBody::NoContent
        } else {
            ArticleBody::Text(text)
        }
    }

    /// Resolve and scrape every item in order. Unresolvable stories are skipped;
    /// everything else yields one `ScrapedArticle`, sentinel bodies included.
    pub async fn scrape_all(&self, items: &[FeedItem]) -> Vec<ScrapedArticle> {
        if items.is_empty() {
            warn!(target: "scrape", "no articles to scrape");
            return Vec::new();
        }
        info!(target: "scrape", count = items.len(), navigator = self.nav.name(), "starting to scrape stories");

        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let story_index = i + 1;
            info!(
                target: "scrape",
                story = story_index,
                of = items.len(),
                source = %item.source,
                title = %truncate(&item.title, 60),
                "processing story"
            );

            let Some(url) = self.resolve_url(&item.link).await else {
                warn!(target: "scrape", story = story_index, "could not get article URL, skipping story");
                continue;
            };

            let body = self.scrape(&url).await;
            match &body {
                ArticleBody::Text(t) => {
                    info!(target: "scrape", story = story_index, chars = t.chars().count(), url = %truncate(&url, 60), "scraped")
                }
                ArticleBody::NoContent => {
                    warn!(target: "scrape", story = story_index, url = %truncate(&url, 60), "no content")
                }
                ArticleBody::Failed(e) => {
                    warn!(target: "scrape", story = story_index, error = %e, "failed to scrape content")
                }
            }

            let domain = html::domain_of(&url);
            out.push(ScrapedArticle::new(item.clone(), url, domain, body, story_index));

            if !self.opts.request_delay.is_zero() {
                tokio::time::sleep(self.opts.request_delay).await;
            }
        }

        counter!("scrape_articles_total").increment(out.len() as u64);
        info!(target: "scrape", total = out.len(), "articles scraped");
        out
    }
}

/// Char-boundary-safe truncation.
pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
