// src/config/mod.rs
//! Pipeline configuration: TOML file with serde defaults, secrets from the environment.
//!
//! Resolution order for the file:
//! 1) `$NEWS_DIGEST_CONFIG` (must exist)
//! 2) `config/pipeline.toml`
//! 3) built-in defaults

pub mod ai;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use ai::{AiConfig, AiProvider};

pub const ENV_CONFIG_PATH: &str = "NEWS_DIGEST_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/pipeline.toml";

pub const ENV_SLACK_URL: &str = "SLACK_URL";
pub const ENV_SLACK_URL_FALLBACK: &str = "SLACK_WEBHOOK_URL";

pub const DEFAULT_FEED_URL: &str = "https://news.google.com/rss/topics/CAAqJggKIiBDQkFTRWdvSUwyMHZNRGx6TVdZU0FtVnVHZ0pWVXlnQVAB?hl=en-IN&gl=IN&ceid=IN:en";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.to_string()
}
fn default_lookback_minutes() -> u64 {
    1440
}
fn default_interval_minutes() -> u64 {
    30
}
fn default_min_article_length() -> usize {
    200
}
fn default_min_paragraph_chars() -> usize {
    30
}
fn default_excerpt_chars() -> usize {
    4000
}
fn default_redirect_hosts() -> Vec<String> {
    vec!["news.google.com".to_string()]
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_feed_timeout_secs() -> u64 {
    10
}
fn default_resolve_timeout_secs() -> u64 {
    20
}
fn default_scrape_timeout_secs() -> u64 {
    120
}
fn default_settle_delay_ms() -> u64 {
    2000
}
fn default_request_delay_ms() -> u64 {
    1000
}
fn default_reference_table() -> PathBuf {
    PathBuf::from("config/isin_reference.csv")
}
fn default_match_top_n() -> usize {
    3
}
fn default_match_min_score() -> u8 {
    70
}
fn default_release_offset_minutes() -> i32 {
    330
}
fn default_release_label() -> String {
    "IST".to_string()
}
fn default_webhook_timeout_secs() -> u64 {
    10
}
fn default_webhook_retries() -> u32 {
    3
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_feed_url")]
    pub feed_url: String,
    /// Items published earlier than `now - lookback` are dropped.
    #[serde(default = "default_lookback_minutes")]
    pub lookback_minutes: u64,
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
    #[serde(default = "default_min_article_length")]
    pub min_article_length: usize,
    #[serde(default = "default_min_paragraph_chars")]
    pub min_paragraph_chars: usize,
    /// Article chars sent to the LLM.
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,
    #[serde(default = "default_redirect_hosts")]
    pub redirect_hosts: Vec<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_feed_timeout_secs")]
    pub feed_timeout_secs: u64,
    #[serde(default = "default_resolve_timeout_secs")]
    pub resolve_timeout_secs: u64,
    #[serde(default = "default_scrape_timeout_secs")]
    pub scrape_timeout_secs: u64,
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    #[serde(default = "default_reference_table")]
    pub reference_table: PathBuf,
    #[serde(default = "default_match_top_n")]
    pub match_top_n: usize,
    #[serde(default = "default_match_min_score")]
    pub match_min_score: u8,

    /// Offset from UTC used for the "Release Time" line (330 = IST).
    #[serde(default = "default_release_offset_minutes")]
    pub release_offset_minutes: i32,
    #[serde(default = "default_release_label")]
    pub release_label: String,

    /// When set, processed identity keys are persisted here between runs.
    #[serde(default)]
    pub state_path: Option<PathBuf>,

    #[serde(default = "default_webhook_timeout_secs")]
    pub webhook_timeout_secs: u64,
    #[serde(default = "default_webhook_retries")]
    pub webhook_retries: u32,

    #[serde(default)]
    pub ai: AiConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            feed_url: default_feed_url(),
            lookback_minutes: default_lookback_minutes(),
            interval_minutes: default_interval_minutes(),
            min_article_length: default_min_article_length(),
            min_paragraph_chars: default_min_paragraph_chars(),
            excerpt_chars: default_excerpt_chars(),
            redirect_hosts: default_redirect_hosts(),
            user_agent: default_user_agent(),
            feed_timeout_secs: default_feed_timeout_secs(),
            resolve_timeout_secs: default_resolve_timeout_secs(),
            scrape_timeout_secs: default_scrape_timeout_secs(),
            settle_delay_ms: default_settle_delay_ms(),
            request_delay_ms: default_request_delay_ms(),
            reference_table: default_reference_table(),
            match_top_n: default_match_top_n(),
            match_min_score: default_match_min_score(),
            release_offset_minutes: default_release_offset_minutes(),
            release_label: default_release_label(),
            state_path: None,
            webhook_timeout_secs: default_webhook_timeout_secs(),
            webhook_retries: default_webhook_retries(),
            ai: AiConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.saturating_mul(60))
    }

    pub fn lookback(&self) -> chrono::Duration {
        // chrono panics past ~292 million years; a century is plenty.
        const MAX_MINUTES: i64 = 100 * 366 * 24 * 60;
        let mins = i64::try_from(self.lookback_minutes)
            .unwrap_or(MAX_MINUTES)
            .min(MAX_MINUTES);
        chrono::Duration::minutes(mins)
    }

    /// Webhook URL from `SLACK_URL`, falling back to `SLACK_WEBHOOK_URL`. Blank counts as unset.
    pub fn webhook_url_from_env() -> Option<String> {
        [ENV_SLACK_URL, ENV_SLACK_URL_FALLBACK]
            .iter()
            .filter_map(|k| std::env::var(k).ok())
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty())
    }
}

/// Load config from an explicit TOML path.
pub fn load_from(path: &Path) -> Result<PipelineConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading pipeline config from {}", path.display()))?;
    parse_config(&content).with_context(|| format!("parsing {}", path.display()))
}

/// Load config using env var + fallbacks (see module docs).
pub fn load_default() -> Result<PipelineConfig> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_from(&pb);
        } else {
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
    }
    let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
    if default_p.exists() {
        return load_from(&default_p);
    }
    Ok(PipelineConfig::default())
}

fn parse_config(s: &str) -> Result<PipelineConfig> {
    let mut cfg: PipelineConfig = toml::from_str(s)?;
    cfg.redirect_hosts = clean_hosts(cfg.redirect_hosts);
    if cfg.match_top_n == 0 {
        cfg.match_top_n = default_match_top_n();
    }
    cfg.match_min_score = cfg.match_min_score.min(100);
    if cfg.interval_minutes == 0 {
        cfg.interval_minutes = default_interval_minutes();
    }
    Ok(cfg)
}

fn clean_hosts(items: Vec<String>) -> Vec<String> {
    use std::collections::BTreeSet;
    let mut set = BTreeSet::new();
    for it in items {
        let t = it.trim().to_ascii_lowercase();
        if !t.is_empty() {
            set.insert(t);
        }
    }
    set.into_iter().collect()
}
