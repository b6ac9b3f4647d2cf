// src/ingest/providers/google_news.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;

use crate::ingest::normalize_text;
use crate::ingest::types::{FeedItem, FeedProvider};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    source: Option<ItemSource>,
}
#[derive(Debug, Deserialize)]
struct ItemSource {
    #[serde(rename = "$text", default)]
    name: Option<String>,
}

/// RFC 2822 first (what RSS uses), RFC 3339 as a fallback.
pub fn parse_pub_date(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    DateTime::parse_from_rfc2822(ts)
        .or_else(|_| DateTime::parse_from_rfc3339(ts))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub struct GoogleNewsRssProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl GoogleNewsRssProvider {
    pub fn from_fixture(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    pub fn from_url(url: impl Into<String>, user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("building feed http client")?;
        Ok(Self {
            mode: Mode::Http {
                url: url.into(),
                client,
            },
        })
    }

    pub fn parse_items_from_str(s: &str) -> Result<Vec<FeedItem>> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(s);
        let rss: Rss = from_str(&xml_clean).context("parsing google news rss xml")?;

        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            let Some(link) = it.link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty())
            else {
                continue;
            };
            let title = it
                .title
                .as_deref()
                .map(normalize_text)
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "No Title".to_string());
            let source = it
                .source
                .and_then(|s| s.name)
                .map(|n| normalize_text(&n))
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "Unknown".to_string());
            let pub_date = it.pub_date.map(|d| d.trim().to_string());
            let published_at = pub_date.as_deref().and_then(parse_pub_date);

            out.push(FeedItem {
                title,
                link,
                source,
                pub_date,
                published_at,
            });
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("feed_parse_ms").record(ms);
        counter!("feed_items_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl FeedProvider for GoogleNewsRssProvider {
    async fn fetch_latest(&self) -> Result<Vec<FeedItem>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_items_from_str(s),
            Mode::Http { url, client } => {
                let body = client
                    .get(url.as_str())
                    .send()
                    .await
                    .context("feed http get()")?
                    .error_for_status()
                    .context("feed non-2xx")?
                    .text()
                    .await
                    .context("feed http .text()")?;
                Self::parse_items_from_str(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        "GoogleNews"
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc2822_and_rfc3339() {
        let a = parse_pub_date("Sun, 19 Oct 2025 06:30:00 GMT").unwrap();
        assert_eq!(a.to_rfc3339(), "2025-10-19T06:30:00+00:00");
        let b = parse_pub_date("2025-10-19T12:00:00+05:30").unwrap();
        assert_eq!(b.to_rfc3339(), "2025-10-19T06:30:00+00:00");
        assert!(parse_pub_date("yesterday-ish").is_none());
    }

    #[test]
    fn items_without_link_are_skipped_and_defaults_applied() {
        let xml = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>x</title>
<item><title>No link here</title></item>
<item><link>https://example.test/a</link><pubDate>garbage</pubDate></item>
</channel></rss>"#;
        let items = GoogleNewsRssProvider::parse_items_from_str(xml).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "No Title");
        assert_eq!(items[0].source, "Unknown");
        assert_eq!(items[0].pub_date.as_deref(), Some("garbage"));
        assert!(items[0].published_at.is_none());
    }

    #[test]
    fn empty_channel_is_ok() {
        let xml = r#"<rss><channel><title>empty</title></channel></rss>"#;
        let items = GoogleNewsRssProvider::parse_items_from_str(xml).unwrap();
        assert!(items.is_empty());
    }
}
