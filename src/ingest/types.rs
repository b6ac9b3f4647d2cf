// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Dedup identity: (title, source).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdentityKey {
    pub title: String,
    pub source: String,
}

impl IdentityKey {
    pub fn new(title: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            source: source.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub source: String, // e.g. "The Economic Times"
    /// Raw `pubDate` as published; kept for the digest's release time.
    pub pub_date: Option<String>,
    /// `None` when `pub_date` is missing or unparseable.
    pub published_at: Option<DateTime<Utc>>,
}

impl FeedItem {
    pub fn identity(&self) -> IdentityKey {
        IdentityKey::new(self.title.clone(), self.source.clone())
    }
}

#[async_trait::async_trait]
pub trait FeedProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<FeedItem>>;
    fn name(&self) -> &'static str;
}
