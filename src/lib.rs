// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod article;
pub mod config;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod scheduler;

// Stages
pub mod analyze;
pub mod ingest;
pub mod matcher;
pub mod notify;
pub mod scrape;

// ---- Re-exports for stable public API ----
pub use crate::article::{ArticleBody, ScrapedArticle};
pub use crate::config::PipelineConfig;
pub use crate::ingest::dedup::ProcessedSet;
pub use crate::pipeline::{IterationReport, Pipeline, Stages};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize logging once. `RUST_LOG` filters (default `info`);
/// `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing already initialized");
    }
}
