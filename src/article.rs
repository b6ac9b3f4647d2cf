// src/article.rs
//! The article record that flows through the pipeline stages.

use chrono::{DateTime, Utc};

use crate::analyze::summarize::Summary;
use crate::ingest::types::{FeedItem, IdentityKey};
use crate::matcher::IdentifierMatch;

/// Scraped body, or the reason there is none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleBody {
    Text(String),
    /// Page loaded but no paragraph passed the length filter.
    NoContent,
    /// Navigation or read failed; message is truncated for logs.
    Failed(String),
}

impl ArticleBody {
    pub fn text(&self) -> Option<&str> {
        match self {
            ArticleBody::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Length in chars; zero for sentinels.
    pub fn length(&self) -> usize {
        self.text().map_or(0, |t| t.chars().count())
    }
}

#[derive(Debug, Clone)]
pub struct ScrapedArticle {
    pub item: FeedItem,
    /// Resolved article URL (after the redirector).
    pub url: String,
    pub domain: String,
    pub body: ArticleBody,
    pub scraped_at: DateTime<Utc>,
    /// 1-based position of the story in this iteration's feed batch.
    pub story_index: usize,
    pub company_name: Option<String>,
    pub matches: Vec<IdentifierMatch>,
    pub summary: Option<Summary>,
}

impl ScrapedArticle {
    pub fn new(item: FeedItem, url: String, domain: String, body: ArticleBody, story_index: usize) -> Self {
        Self {
            item,
            url,
            domain,
            body,
            scraped_at: Utc::now(),
            story_index,
            company_name: None,
            matches: Vec::new(),
            summary: None,
        }
    }

    pub fn identity(&self) -> IdentityKey {
        self.item.identity()
    }

    pub fn length(&self) -> usize {
        self.body.length()
    }

    /// Has a text body strictly longer than `min_len` chars.
    pub fn is_substantial(&self, min_len: usize) -> bool {
        self.length() > min_len
    }

    pub fn primary_match(&self) -> Option<&IdentifierMatch> {
        self.matches.first()
    }

    /// Domain when known, else the feed's source name.
    pub fn display_source(&self) -> &str {
        if self.domain.is_empty() {
            &self.item.source
        } else {
            &self.domain
        }
    }
}
