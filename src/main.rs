//! Business news digest: binary entrypoint.
//! Wires config, stages and the fixed-interval scheduler; Ctrl+C stops it.

use anyhow::{Context, Result};
use tracing::info;

use business_news_digest::analyze::{build_llm_client, EntityExtractor, Summarizer};
use business_news_digest::ingest::providers::google_news::GoogleNewsRssProvider;
use business_news_digest::matcher::IdentifierMatcher;
use business_news_digest::notify::SlackNotifier;
use business_news_digest::scheduler::{self, LoopOptions};
use business_news_digest::scrape::navigator::HttpNavigator;
use business_news_digest::scrape::{ContentResolver, ResolverOptions};
use business_news_digest::{config, Pipeline, ProcessedSet, Stages};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    business_news_digest::init_tracing();
    business_news_digest::metrics::init();

    let once = std::env::args().skip(1).any(|a| a == "--once");

    let cfg = config::load_default().context("loading pipeline config")?;
    info!(
        feed = %cfg.feed_url,
        interval_min = cfg.interval_minutes,
        lookback_min = cfg.lookback_minutes,
        reference_table = %cfg.reference_table.display(),
        "configuration loaded"
    );

    let provider = GoogleNewsRssProvider::from_url(
        cfg.feed_url.clone(),
        &cfg.user_agent,
        std::time::Duration::from_secs(cfg.feed_timeout_secs),
    )?;
    let navigator = HttpNavigator::new(&cfg.user_agent)?;
    let llm = build_llm_client(&cfg.ai)?;
    let notifier = SlackNotifier::from_env(&cfg)?;
    if !business_news_digest::notify::Notifier::is_enabled(&notifier) {
        info!("SLACK_URL not set; digests will only be logged");
    }

    let stages = Stages {
        provider: Box::new(provider),
        resolver: ContentResolver::new(navigator, ResolverOptions::from_config(&cfg)),
        extractor: EntityExtractor::from_config(llm.clone(), &cfg),
        matcher: IdentifierMatcher::from_config(&cfg),
        summarizer: Summarizer::from_config(llm, &cfg),
        notifier: Box::new(notifier),
    };
    let pipeline = Pipeline::new(&cfg, stages);

    let mut seen = match &cfg.state_path {
        Some(path) => ProcessedSet::load(path.clone())
            .await
            .with_context(|| format!("loading processed set from {}", path.display()))?,
        None => ProcessedSet::new(),
    };

    let opts = LoopOptions {
        interval: cfg.interval(),
        max_iterations: once.then_some(1),
    };
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
        info!("interrupt received, shutting down");
    };

    let summary = scheduler::run_loop(&pipeline, &mut seen, opts, shutdown).await;
    business_news_digest::metrics::log_snapshot();
    info!(
        iterations = summary.iterations,
        failed_iterations = summary.failed_iterations,
        unique_processed = summary.processed,
        "digest stopped"
    );
    Ok(())
}
