// tests/feed_filter.rs
use anyhow::{anyhow, Result};
use business_news_digest::ingest::dedup::ProcessedSet;
use business_news_digest::ingest::types::{FeedItem, FeedProvider, IdentityKey};
use business_news_digest::ingest::{filter_fresh_unseen, run_once};
use chrono::{Duration, Utc};

fn item(title: &str, source: &str, age: Duration) -> FeedItem {
    FeedItem {
        title: title.into(),
        link: format!("https://news.google.com/rss/articles/{}", title.replace(' ', "-")),
        source: source.into(),
        pub_date: None,
        published_at: Some(Utc::now() - age),
    }
}

struct StaticFeed(Vec<FeedItem>);

#[async_trait::async_trait]
impl FeedProvider for StaticFeed {
    async fn fetch_latest(&self) -> Result<Vec<FeedItem>> {
        Ok(self.0.clone())
    }
    fn name(&self) -> &'static str {
        "static"
    }
}

struct BrokenFeed;

#[async_trait::async_trait]
impl FeedProvider for BrokenFeed {
    async fn fetch_latest(&self) -> Result<Vec<FeedItem>> {
        Err(anyhow!("connection reset"))
    }
    fn name(&self) -> &'static str {
        "broken"
    }
}

#[test]
fn stale_items_are_dropped() {
    let now = Utc::now();
    let items = vec![
        item("fresh", "Mint", Duration::minutes(10)),
        item("old", "Mint", Duration::hours(30)),
    ];
    let (kept, stats) = filter_fresh_unseen(now, items, &ProcessedSet::new(), Duration::hours(24));
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].title, "fresh");
    assert_eq!(stats.stale, 1);
}

#[test]
fn processed_keys_are_dropped_and_order_kept() {
    let now = Utc::now();
    let mut seen = ProcessedSet::new();
    seen.insert(IdentityKey::new("b", "Mint"));

    let items = vec![
        item("c", "Mint", Duration::minutes(1)),
        item("b", "Mint", Duration::minutes(2)),
        item("b", "Business Standard", Duration::minutes(3)),
        item("a", "Mint", Duration::minutes(4)),
    ];
    let (kept, stats) = filter_fresh_unseen(now, items, &seen, Duration::hours(24));
    let titles: Vec<(&str, &str)> = kept.iter().map(|i| (i.title.as_str(), i.source.as_str())).collect();
    assert_eq!(titles, vec![("c", "Mint"), ("b", "Business Standard"), ("a", "Mint")]);
    assert_eq!(stats.already_processed, 1);
    assert_eq!(stats.kept, 3);
}

#[tokio::test]
async fn provider_failure_degrades_to_empty() {
    let (items, stats) = run_once(&BrokenFeed, &ProcessedSet::new(), Duration::hours(24)).await;
    assert!(items.is_empty());
    assert_eq!(stats.total, 0);
}

#[tokio::test]
async fn run_once_filters_provider_output() {
    let feed = StaticFeed(vec![
        item("new", "Mint", Duration::minutes(5)),
        item("ancient", "Mint", Duration::days(3)),
    ]);
    let (items, stats) = run_once(&feed, &ProcessedSet::new(), Duration::hours(24)).await;
    assert_eq!(items.len(), 1);
    assert_eq!(stats.total, 2);
    assert_eq!(stats.stale, 1);
}
