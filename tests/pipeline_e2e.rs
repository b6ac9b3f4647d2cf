// tests/pipeline_e2e.rs
//! Whole iteration with in-process doubles: static feed, map navigator,
//! scripted LLM, temp reference table, recording notifier.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;

use business_news_digest::analyze::llm::{DynLlmClient, GenerationParams, MockClient};
use business_news_digest::analyze::{EntityExtractor, Summarizer};
use business_news_digest::ingest::types::{FeedItem, FeedProvider, IdentityKey};
use business_news_digest::matcher::IdentifierMatcher;
use business_news_digest::notify::Notifier;
use business_news_digest::scheduler::{run_loop, LoopOptions};
use business_news_digest::scrape::navigator::{Navigator, Page};
use business_news_digest::scrape::{ContentResolver, ResolverOptions};
use business_news_digest::{Pipeline, PipelineConfig, ProcessedSet, Stages};

const ARTICLE_HTML: &str = r#"<html><body>
<nav><p>Markets | Companies | Economy | Opinion | Subscribe now</p></nav>
<p>Infosys on Thursday reported a net profit of Rs 6,921 crore for the June quarter, up 8.7 per cent from a year earlier.</p>
<p>Revenue from operations rose 7.5 per cent to Rs 42,279 crore, the Bengaluru-based company said in an exchange filing.</p>
<p>The company raised its FY26 revenue growth guidance to 1-3 per cent in constant currency terms.</p>
<script>var tracking = "this paragraph-like text must never be scraped";</script>
</body></html>"#;

const TABLE: &str = "Company Name,CD_ISIN No,CD_NSE Symbol,CD_BSE Code,CD_Industry1\n\
Infosys Ltd,INE009A01021,INFY,500209,IT - Software\n\
Tata Motors Ltd,INE155A01022,TATAMOTORS,500570,Automobiles\n";

struct StaticFeed(Vec<FeedItem>);

#[async_trait]
impl FeedProvider for StaticFeed {
    async fn fetch_latest(&self) -> Result<Vec<FeedItem>> {
        Ok(self.0.clone())
    }
    fn name(&self) -> &'static str {
        "static"
    }
}

#[derive(Clone, Default)]
struct MapNavigator {
    pages: Arc<HashMap<String, String>>,
    visits: Arc<Mutex<Vec<String>>>,
    panics_left: Arc<AtomicUsize>,
}

#[async_trait]
impl Navigator for MapNavigator {
    async fn goto(&self, url: &str, _timeout: Duration) -> Result<Page> {
        let panic_now = self
            .panics_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if panic_now {
            panic!("navigator crashed at {url}");
        }
        self.visits.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .map(|html| Page {
                url: url.to_string(),
                html: html.clone(),
            })
            .ok_or_else(|| anyhow!("net::ERR_CONNECTION_REFUSED at {url}"))
    }
    fn name(&self) -> &'static str {
        "map"
    }
}

#[derive(Clone, Default)]
struct RecordingNotifier {
    sent: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
    fn name(&self) -> &'static str {
        "recording"
    }
}

fn item(title: &str, link: &str) -> FeedItem {
    let now = Utc::now() - chrono::Duration::minutes(15);
    FeedItem {
        title: title.into(),
        link: link.into(),
        source: "Mint".into(),
        pub_date: Some(now.to_rfc2822()),
        published_at: Some(now),
    }
}

struct Harness {
    pipeline: Pipeline<MapNavigator>,
    nav: MapNavigator,
    notifier: RecordingNotifier,
    llm: Arc<MockClient>,
    _dir: tempfile::TempDir,
}

fn harness(items: Vec<FeedItem>, pages: &[(&str, &str)], llm: MockClient) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let table = dir.path().join("isin.csv");
    std::fs::write(&table, TABLE).unwrap();

    let cfg = PipelineConfig {
        settle_delay_ms: 0,
        request_delay_ms: 0,
        reference_table: table,
        ..PipelineConfig::default()
    };

    let nav = MapNavigator {
        pages: Arc::new(pages.iter().map(|(u, h)| (u.to_string(), h.to_string())).collect()),
        ..MapNavigator::default()
    };
    let notifier = RecordingNotifier::default();
    let llm = Arc::new(llm);
    let dyn_llm: DynLlmClient = llm.clone();

    let stages = Stages {
        provider: Box::new(StaticFeed(items)),
        resolver: ContentResolver::new(nav.clone(), ResolverOptions::from_config(&cfg)),
        extractor: EntityExtractor::new(dyn_llm.clone(), 4000, GenerationParams::default()),
        matcher: IdentifierMatcher::from_config(&cfg),
        summarizer: Summarizer::from_config(dyn_llm, &cfg),
        notifier: Box::new(notifier.clone()),
    };
    Harness {
        pipeline: Pipeline::new(&cfg, stages),
        nav,
        notifier,
        llm,
        _dir: dir,
    }
}

const ENTITY_REPLY: &str = r#"{"company_name": "Infosys", "confidence": "high", "mentioned_in": "both"}"#;
const SUMMARY_REPLY: &str = r#"{"summary": "Infosys profit rose 8.7% to Rs 6,921 crore.", "numeric_data": ["Net profit: Rs 6,921 crore"], "source": "Exchange filing", "sentiment": "positive"}"#;

#[tokio::test]
async fn processed_item_is_not_scraped_again() {
    let h = harness(
        vec![
            item("Infosys Q1 profit rises", "https://www.livemint.com/infosys-q1"),
            item("Sensex ends flat", "https://www.livemint.com/sensex"),
        ],
        &[("https://www.livemint.com/infosys-q1", ARTICLE_HTML)],
        MockClient::new().reply(ENTITY_REPLY).reply(SUMMARY_REPLY),
    );
    let mut seen = ProcessedSet::new();
    seen.insert(IdentityKey::new("Sensex ends flat", "Mint"));

    let rep = h.pipeline.run_iteration(&seen).await;

    assert_eq!(rep.fetched, 1);
    assert_eq!(rep.scraped, 1);
    assert_eq!(*h.nav.visits.lock().unwrap(), vec!["https://www.livemint.com/infosys-q1".to_string()]);
    assert_eq!(rep.to_mark, vec![IdentityKey::new("Infosys Q1 profit rises", "Mint")]);

    assert_eq!(rep.with_company, 1);
    assert_eq!(rep.companies_matched, 1);
    assert_eq!(rep.summarized, 1);
    assert_eq!(rep.delivery.sent, 1);
    assert_eq!(h.llm.calls(), 2);

    let sent = h.notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].starts_with("*Infosys Ltd*\n*Summary:* Infosys profit rose 8.7%"));
    assert!(sent[0].contains("*Sentiment:* positive"));
    assert!(sent[0].contains("*Industry:* IT - Software"));
    assert!(sent[0].contains("*Link:* https://www.livemint.com/infosys-q1"));
    assert!(sent[0].contains(" IST\n"));
    assert!(!h.llm.prompts()[0].contains("must never be scraped"));
}

#[tokio::test]
async fn nothing_scraped_marks_nothing() {
    let h = harness(
        vec![item("Dead link", "https://news.google.com/rss/articles/dead")],
        &[],
        MockClient::new(),
    );
    let rep = h.pipeline.run_iteration(&ProcessedSet::new()).await;
    assert_eq!(rep.fetched, 1);
    assert_eq!(rep.scraped, 0);
    assert!(rep.to_mark.is_empty());
    assert_eq!(h.llm.calls(), 0);
}

#[tokio::test]
async fn unmatched_company_is_not_summarized() {
    let h = harness(
        vec![item("Infosys Q1 profit rises", "https://www.livemint.com/infosys-q1")],
        &[("https://www.livemint.com/infosys-q1", ARTICLE_HTML)],
        MockClient::new().reply(r#"{"company_name": "Bengaluru", "confidence": "high"}"#),
    );
    let rep = h.pipeline.run_iteration(&ProcessedSet::new()).await;
    assert_eq!(rep.with_company, 1);
    assert_eq!(rep.companies_matched, 0);
    assert_eq!(rep.summarized, 0);
    assert_eq!(h.llm.calls(), 1);
    assert!(h.notifier.sent.lock().unwrap().is_empty());
    // scraped, so still marked
    assert_eq!(rep.to_mark.len(), 1);
}

#[tokio::test]
async fn second_iteration_skips_marked_items_and_state_is_saved() {
    let h = harness(
        vec![item("Infosys Q1 profit rises", "https://www.livemint.com/infosys-q1")],
        &[("https://www.livemint.com/infosys-q1", ARTICLE_HTML)],
        MockClient::new().reply(ENTITY_REPLY).reply(SUMMARY_REPLY),
    );
    let state_dir = tempfile::tempdir().unwrap();
    let state = state_dir.path().join("processed.json");
    let mut seen = ProcessedSet::load(&state).await.unwrap();

    let opts = LoopOptions {
        interval: Duration::ZERO,
        max_iterations: Some(2),
    };
    let summary = run_loop(&h.pipeline, &mut seen, opts, std::future::pending::<()>()).await;

    assert_eq!(summary.iterations, 2);
    assert_eq!(summary.processed, 1);
    assert_eq!(h.nav.visits.lock().unwrap().len(), 1);
    assert_eq!(h.notifier.sent.lock().unwrap().len(), 1);

    let reloaded = ProcessedSet::load(&state).await.unwrap();
    assert!(reloaded.contains(&IdentityKey::new("Infosys Q1 profit rises", "Mint")));
}

#[tokio::test]
async fn panicking_stage_fails_one_iteration_and_loop_continues() {
    let h = harness(
        vec![item("Infosys Q1 profit rises", "https://www.livemint.com/infosys-q1")],
        &[("https://www.livemint.com/infosys-q1", ARTICLE_HTML)],
        MockClient::new().reply(ENTITY_REPLY).reply(SUMMARY_REPLY),
    );
    h.nav.panics_left.store(1, Ordering::SeqCst);
    let mut seen = ProcessedSet::new();

    let opts = LoopOptions {
        interval: Duration::ZERO,
        max_iterations: Some(2),
    };
    let summary = run_loop(&h.pipeline, &mut seen, opts, std::future::pending::<()>()).await;

    assert_eq!(summary.failed_iterations, 1);
    assert_eq!(summary.iterations, 1);
    assert_eq!(summary.processed, 1);
    // only the second iteration got past navigation
    assert_eq!(h.nav.visits.lock().unwrap().len(), 1);
    assert_eq!(h.notifier.sent.lock().unwrap().len(), 1);
    assert!(seen.contains(&IdentityKey::new("Infosys Q1 profit rises", "Mint")));
}
