// src/pipeline.rs
//! One pass of fetch → resolve → extract → match → summarize → notify.

use std::time::Instant;

use tracing::{info, warn};

use crate::analyze::entity::EntityExtractor;
use crate::analyze::summarize::Summarizer;
use crate::article::ScrapedArticle;
use crate::config::PipelineConfig;
use crate::ingest::dedup::ProcessedSet;
use crate::ingest::types::{FeedProvider, IdentityKey};
use crate::ingest::{self, FilterStats};
use crate::matcher::IdentifierMatcher;
use crate::notify::{self, DeliveryReport, Notifier};
use crate::report::{self, CompanyMatches, StoryReport};
use crate::scrape::navigator::Navigator;
use crate::scrape::ContentResolver;

/// What one iteration did. `to_mark` holds the keys the caller should add to
/// the processed set.
#[derive(Debug, Clone, Default)]
pub struct IterationReport {
    pub filter: FilterStats,
    pub fetched: usize,
    pub scraped: usize,
    pub with_company: usize,
    pub companies: usize,
    pub companies_matched: usize,
    pub summarized: usize,
    pub delivery: DeliveryReport,
    pub to_mark: Vec<IdentityKey>,
    pub elapsed_ms: u128,
}

pub struct Pipeline<N: Navigator> {
    provider: Box<dyn FeedProvider>,
    resolver: ContentResolver<N>,
    extractor: EntityExtractor,
    matcher: IdentifierMatcher,
    summarizer: Summarizer,
    notifier: Box<dyn Notifier>,
    lookback: chrono::Duration,
    min_article_length: usize,
    release_offset_minutes: i32,
    release_label: String,
}

/// Stage implementations handed to [`Pipeline::new`].
pub struct Stages<N: Navigator> {
    pub provider: Box<dyn FeedProvider>,
    pub resolver: ContentResolver<N>,
    pub extractor: EntityExtractor,
    pub matcher: IdentifierMatcher,
    pub summarizer: Summarizer,
    pub notifier: Box<dyn Notifier>,
}

impl<N: Navigator> Pipeline<N> {
    pub fn new(cfg: &PipelineConfig, stages: Stages<N>) -> Self {
        Self {
            provider: stages.provider,
            resolver: stages.resolver,
            extractor: stages.extractor,
            matcher: stages.matcher,
            summarizer: stages.summarizer,
            notifier: stages.notifier,
            lookback: cfg.lookback(),
            min_article_length: cfg.min_article_length,
            release_offset_minutes: cfg.release_offset_minutes,
            release_label: cfg.release_label.clone(),
        }
    }

    /// Run every stage once. Stage failures degrade per item; nothing here aborts.
    pub async fn run_iteration(&self, seen: &ProcessedSet) -> IterationReport {
        let started = Instant::now();
        let mut rep = IterationReport::default();

        // 1) feed
        let (items, filter) = ingest::run_once(self.provider.as_ref(), seen, self.lookback).await;
        rep.filter = filter;
        rep.fetched = items.len();
        if items.is_empty() {
            info!(target: "pipeline", "no new articles found");
            rep.elapsed_ms = started.elapsed().as_millis();
            return rep;
        }

        // 2) resolve + scrape
        let mut articles = self.resolver.scrape_all(&items).await;
        rep.scraped = articles.len();
        if articles.is_empty() {
            warn!(target: "pipeline", fetched = rep.fetched, "no articles scraped; nothing marked processed");
            rep.elapsed_ms = started.elapsed().as_millis();
            return rep;
        }
        rep.to_mark = items.iter().map(|it| it.identity()).collect();

        // 3) company extraction
        self.extract_companies(&mut articles).await;
        rep.with_company = articles.iter().filter(|a| a.company_name.is_some()).count();
        StoryReport::build(&articles).log();

        // 4) one lookup per unique company, first-seen order
        let lookups = self.match_companies(&articles);
        rep.companies = lookups.len();
        rep.companies_matched = lookups.iter().filter(|c| !c.matches.is_empty()).count();
        report::log_match_summary(&lookups);

        let matched: Vec<ScrapedArticle> = articles
            .into_iter()
            .filter_map(|mut a| {
                let name = a.company_name.as_deref()?;
                let hit = lookups.iter().find(|c| c.company == name)?;
                if hit.matches.is_empty() {
                    info!(target: "pipeline", story = a.story_index, company = name, "company_not_found; skipping");
                    return None;
                }
                a.matches = hit.matches.clone();
                Some(a)
            })
            .collect();

        // 5) summaries
        let summarized = self.summarizer.summarize_all(matched).await;
        rep.summarized = summarized.len();
        report::log_summary_report(&summarized);

        // 6) digest
        let messages: Vec<String> = summarized
            .iter()
            .map(|a| notify::format_message(a, self.release_offset_minutes, &self.release_label))
            .collect();
        if !messages.is_empty() {
            rep.delivery = notify::deliver_all(self.notifier.as_ref(), &messages).await;
        }

        rep.elapsed_ms = started.elapsed().as_millis();
        info!(
            target: "pipeline",
            fetched = rep.fetched,
            scraped = rep.scraped,
            with_company = rep.with_company,
            companies_matched = rep.companies_matched,
            summarized = rep.summarized,
            sent = rep.delivery.sent,
            failed = rep.delivery.failed,
            elapsed_ms = rep.elapsed_ms as u64,
            "iteration complete"
        );
        rep
    }

    async fn extract_companies(&self, articles: &mut [ScrapedArticle]) {
        let eligible = articles
            .iter()
            .filter(|a| a.is_substantial(self.min_article_length))
            .count();
        info!(target: "pipeline", eligible, total = articles.len(), "extracting companies");

        for a in articles.iter_mut() {
            if !a.is_substantial(self.min_article_length) {
                continue;
            }
            let Some(text) = a.body.text() else {
                continue;
            };
            a.company_name = self.extractor.extract(text, &a.item.title).await;
            match a.company_name.as_deref() {
                Some(c) => info!(target: "pipeline", story = a.story_index, company = c, "company identified"),
                None => info!(target: "pipeline", story = a.story_index, "no company identified"),
            }
        }
    }

    fn match_companies(&self, articles: &[ScrapedArticle]) -> Vec<CompanyMatches> {
        let mut out: Vec<CompanyMatches> = Vec::new();
        for name in articles.iter().filter_map(|a| a.company_name.as_deref()) {
            if out.iter().any(|c| c.company == name) {
                continue;
            }
            out.push(CompanyMatches {
                company: name.to_string(),
                matches: self.matcher.lookup(name),
            });
        }
        out
    }
}
