// src/notify/mod.rs
//! Digest formatting and webhook delivery.

pub mod retry;
pub mod slack;

use anyhow::Result;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};

use crate::article::ScrapedArticle;
use crate::ingest::providers::google_news::parse_pub_date;

pub use slack::SlackNotifier;

pub const SEPARATOR: &str = "------------------------------";

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Post one message.
    async fn send(&self, text: &str) -> Result<()>;
    /// `false` when the destination is not configured.
    fn is_enabled(&self) -> bool {
        true
    }
    fn name(&self) -> &'static str;
}

/// Outcome of a batch post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
    /// Whole batch skipped because the notifier is disabled.
    pub disabled: bool,
}

/// Post each message individually; one failure does not stop the rest.
pub async fn deliver_all(notifier: &dyn Notifier, messages: &[String]) -> DeliveryReport {
    if !notifier.is_enabled() {
        tracing::info!(
            target: "notify",
            notifier = notifier.name(),
            pending = messages.len(),
            "webhook not configured; skipping delivery"
        );
        return DeliveryReport {
            disabled: true,
            ..DeliveryReport::default()
        };
    }

    let mut report = DeliveryReport::default();
    for (i, msg) in messages.iter().enumerate() {
        match notifier.send(msg).await {
            Ok(()) => {
                report.sent += 1;
                metrics::counter!("notify_sent_total").increment(1);
                tracing::info!(target: "notify", message = i + 1, of = messages.len(), "message sent");
            }
            Err(e) => {
                report.failed += 1;
                metrics::counter!("notify_failed_total").increment(1);
                tracing::warn!(target: "notify", message = i + 1, error = %format!("{e:#}"), "message failed");
            }
        }
    }
    report
}

/// Release time shifted by `offset_minutes`, as `dd-mm-YYYY HH:MM:SS <label>`.
pub fn format_release_time(ts: DateTime<Utc>, offset_minutes: i32, label: &str) -> String {
    const FMT: &str = "%d-%m-%Y %H:%M:%S";
    match FixedOffset::east_opt(offset_minutes.saturating_mul(60)) {
        Some(offset) => format!("{} {label}", ts.with_timezone(&offset).format(FMT)),
        None => format!("{} UTC", ts.format(FMT)),
    }
}

/// Parse a feed date for display. Values without a zone are taken as UTC.
fn release_timestamp(article: &ScrapedArticle) -> Option<DateTime<Utc>> {
    if let Some(ts) = article.item.published_at {
        return Some(ts);
    }
    let raw = article.item.pub_date.as_deref()?.trim();
    parse_pub_date(raw).or_else(|| {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
            .ok()
            .map(|n| n.and_utc())
    })
}

/// One digest message for an article that has matches and a summary.
pub fn format_message(article: &ScrapedArticle, offset_minutes: i32, label: &str) -> String {
    let primary = article.primary_match();
    let company = primary
        .map(|m| m.matched_name.as_str())
        .filter(|s| !s.is_empty())
        .or(article.company_name.as_deref())
        .unwrap_or("Unknown Company");
    let industry = primary
        .map(|m| m.industry.as_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("Unknown");
    let summary = article
        .summary
        .as_ref()
        .map(|s| s.summary.as_str())
        .unwrap_or("No summary available");

    let release = match release_timestamp(article) {
        Some(ts) => format_release_time(ts, offset_minutes, label),
        None => article
            .item
            .pub_date
            .clone()
            .unwrap_or_else(|| "Unknown".to_string()),
    };

    let mut lines = vec![format!("*{company}*"), format!("*Summary:* {summary}")];
    if let Some(sentiment) = article.summary.as_ref().and_then(|s| s.sentiment.as_deref()) {
        lines.push(format!("*Sentiment:* {sentiment}"));
    }
    lines.push(format!("*Industry:* {industry}"));
    lines.push(format!("*Link:* {}", article.url));
    lines.push(format!("*Release Time:* {release}"));
    lines.push(SEPARATOR.to_string());
    lines.join("\n")
}
