// src/ingest/mod.rs
pub mod dedup;
pub mod providers;
pub mod types;

use crate::ingest::dedup::ProcessedSet;
use crate::ingest::types::{FeedItem, FeedProvider, IdentityKey};
use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use std::collections::HashSet;

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_items_total", "Total items parsed from the feed.");
        describe_counter!("feed_kept_total", "Items kept after freshness + dedup filtering.");
        describe_counter!("feed_stale_total", "Items older than the lookback window.");
        describe_counter!("feed_dedup_total", "Items skipped as already processed.");
        describe_counter!("feed_errors_total", "Feed fetch/parse errors.");
        describe_histogram!("feed_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!("feed_last_run_ts", "Unix ts when the feed was last polled.");
    });
}

/// Normalize text: decode entities, strip tags, ASCII quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out.trim().to_string()
}

/// Counters from one filtering pass (logged as the poll summary).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub total: usize,
    pub stale: usize,
    pub already_processed: usize,
    /// Repeated keys within the same poll.
    pub duplicates: usize,
    /// Items kept even though their date could not be parsed.
    pub unparsed_dates: usize,
    pub kept: usize,
}

/// Drop items older than `now - lookback` and items whose identity is in `seen`
/// (or already kept earlier in this poll). Feed order is preserved.
pub fn filter_fresh_unseen(
    now: DateTime<Utc>,
    items: Vec<FeedItem>,
    seen: &ProcessedSet,
    lookback: chrono::Duration,
) -> (Vec<FeedItem>, FilterStats) {
    let cutoff = now - lookback;
    let mut stats = FilterStats {
        total: items.len(),
        ..FilterStats::default()
    };
    let mut this_poll: HashSet<IdentityKey> = HashSet::new();
    let mut keep = Vec::with_capacity(items.len());

    for item in items {
        match item.published_at {
            Some(ts) if ts < cutoff => {
                stats.stale += 1;
                continue;
            }
            Some(_) => {}
            None => stats.unparsed_dates += 1,
        }

        let key = item.identity();
        if seen.contains(&key) {
            stats.already_processed += 1;
            continue;
        }
        if !this_poll.insert(key) {
            stats.duplicates += 1;
            continue;
        }
        keep.push(item);
    }

    stats.kept = keep.len();
    (keep, stats)
}

/// Fetch once and filter. Provider failures degrade to an empty result.
pub async fn run_once(
    provider: &dyn FeedProvider,
    seen: &ProcessedSet,
    lookback: chrono::Duration,
) -> (Vec<FeedItem>, FilterStats) {
    ensure_metrics_described();

    let raw = match provider.fetch_latest().await {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(target: "ingest", error = ?e, provider = provider.name(), "feed error");
            counter!("feed_errors_total").increment(1);
            return (Vec::new(), FilterStats::default());
        }
    };

    let now = Utc::now();
    let (kept, stats) = filter_fresh_unseen(now, raw, seen, lookback);

    counter!("feed_kept_total").increment(stats.kept as u64);
    counter!("feed_stale_total").increment(stats.stale as u64);
    counter!("feed_dedup_total").increment(stats.already_processed as u64);
    gauge!("feed_last_run_ts").set(now.timestamp() as f64);

    if stats.unparsed_dates > 0 {
        tracing::warn!(
            target: "ingest",
            count = stats.unparsed_dates,
            "could not parse publish date (included anyway)"
        );
    }
    tracing::info!(
        target: "ingest",
        provider = provider.name(),
        total = stats.total,
        stale = stats.stale,
        already_processed = stats.already_processed,
        duplicates = stats.duplicates,
        unparsed_dates = stats.unparsed_dates,
        new = stats.kept,
        cutoff = %(now - lookback).format("%Y-%m-%d %H:%M:%S"),
        "feed filtering summary"
    );

    (kept, stats)
}
