// src/report.rs
//! Per-iteration console reports: stories scraped, company matches, summaries.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::article::ScrapedArticle;
use crate::matcher::IdentifierMatch;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ArticleEntry {
    pub url: String,
    pub domain: String,
    pub length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StoryEntry {
    pub story_index: usize,
    pub title: String,
    pub source: String,
    pub articles: Vec<ArticleEntry>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CompanyCount {
    pub company: String,
    pub articles: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct StoryStats {
    pub stories: usize,
    pub articles: usize,
    pub companies: usize,
    pub total_chars: usize,
    pub avg_chars: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StoryReport {
    pub generated_at: DateTime<Utc>,
    pub stories: Vec<StoryEntry>,
    /// First-seen order.
    pub companies: Vec<CompanyCount>,
    pub stats: StoryStats,
}

impl StoryReport {
    pub fn build(articles: &[ScrapedArticle]) -> Self {
        let mut stories: Vec<StoryEntry> = Vec::new();
        let mut companies: Vec<CompanyCount> = Vec::new();
        let mut total_chars = 0usize;

        for a in articles {
            let entry = ArticleEntry {
                url: a.url.clone(),
                domain: a.display_source().to_string(),
                length: a.length(),
                company: a.company_name.clone(),
            };
            total_chars += entry.length;

            match stories.iter_mut().find(|s| s.story_index == a.story_index) {
                Some(s) => s.articles.push(entry),
                None => stories.push(StoryEntry {
                    story_index: a.story_index,
                    title: a.item.title.clone(),
                    source: a.item.source.clone(),
                    articles: vec![entry],
                }),
            }

            if let Some(name) = a.company_name.as_deref() {
                match companies.iter_mut().find(|c| c.company == name) {
                    Some(c) => c.articles += 1,
                    None => companies.push(CompanyCount {
                        company: name.to_string(),
                        articles: 1,
                    }),
                }
            }
        }

        let stats = StoryStats {
            stories: stories.len(),
            articles: articles.len(),
            companies: companies.len(),
            total_chars,
            avg_chars: if articles.is_empty() {
                0.0
            } else {
                total_chars as f64 / articles.len() as f64
            },
        };

        Self {
            generated_at: Utc::now(),
            stories,
            companies,
            stats,
        }
    }

    pub fn log(&self) {
        for s in &self.stories {
            for a in &s.articles {
                info!(
                    target: "report",
                    story = s.story_index,
                    title = %crate::scrape::truncate(&s.title, 80),
                    domain = %a.domain,
                    chars = a.length,
                    company = a.company.as_deref().unwrap_or("-"),
                    "story"
                );
            }
        }
        for c in &self.companies {
            info!(target: "report", company = %c.company, articles = c.articles, "company identified");
        }
        info!(
            target: "report",
            stories = self.stats.stories,
            articles = self.stats.articles,
            companies = self.stats.companies,
            total_chars = self.stats.total_chars,
            avg_chars = %format!("{:.0}", self.stats.avg_chars),
            "story report"
        );
        if let Ok(json) = serde_json::to_string(self) {
            tracing::debug!(target: "report", %json, "story report json");
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CompanyMatches {
    pub company: String,
    pub matches: Vec<IdentifierMatch>,
}

/// Log the company → matches table as JSON.
pub fn log_match_summary(entries: &[CompanyMatches]) {
    let found = entries.iter().filter(|e| !e.matches.is_empty()).count();
    info!(
        target: "report",
        companies = entries.len(),
        matched = found,
        not_found = entries.len() - found,
        "match summary"
    );
    if let Ok(json) = serde_json::to_string_pretty(entries) {
        info!(target: "report", "match summary json:\n{json}");
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SummaryStats {
    pub summarized: usize,
    pub with_numeric_data: usize,
    pub numeric_points: usize,
}

impl SummaryStats {
    pub fn from_articles(articles: &[ScrapedArticle]) -> Self {
        articles
            .iter()
            .filter_map(|a| a.summary.as_ref())
            .fold(Self::default(), |mut acc, s| {
                acc.summarized += 1;
                if !s.numeric_data.is_empty() {
                    acc.with_numeric_data += 1;
                }
                acc.numeric_points += s.numeric_data.len();
                acc
            })
    }
}

pub fn log_summary_report(articles: &[ScrapedArticle]) {
    for a in articles {
        let Some(s) = a.summary.as_ref() else {
            continue;
        };
        info!(
            target: "report",
            story = a.story_index,
            company = a.company_name.as_deref().unwrap_or("Unknown"),
            title = %a.item.title,
            url = %a.url,
            source = %s.source,
            numeric_data = %s.numeric_data.join("; "),
            summary = %s.summary,
            "article summary"
        );
    }
    let stats = SummaryStats::from_articles(articles);
    info!(
        target: "report",
        summarized = stats.summarized,
        with_numeric_data = stats.with_numeric_data,
        numeric_points = stats.numeric_points,
        "summary report"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::summarize::Summary;
    use crate::article::ArticleBody;
    use crate::ingest::types::FeedItem;

    fn article(idx: usize, company: Option<&str>, body: &str) -> ScrapedArticle {
        let item = FeedItem {
            title: format!("story {idx}"),
            link: format!("https://a.test/{idx}"),
            source: "Mint".into(),
            pub_date: None,
            published_at: None,
        };
        let mut a = ScrapedArticle::new(
            item,
            format!("https://a.test/{idx}"),
            "a.test".into(),
            ArticleBody::Text(body.into()),
            idx,
        );
        a.company_name = company.map(str::to_string);
        a
    }

    #[test]
    fn story_report_counts_companies_in_first_seen_order() {
        let arts = vec![
            article(1, Some("Infosys"), "aaaa"),
            article(2, Some("Tata Motors"), "bb"),
            article(3, Some("Infosys"), "cccccc"),
            article(4, None, ""),
        ];
        let r = StoryReport::build(&arts);
        assert_eq!(r.stats.stories, 4);
        assert_eq!(r.stats.companies, 2);
        assert_eq!(r.stats.total_chars, 12);
        assert!((r.stats.avg_chars - 3.0).abs() < f64::EPSILON);
        assert_eq!(
            r.companies,
            vec![
                CompanyCount { company: "Infosys".into(), articles: 2 },
                CompanyCount { company: "Tata Motors".into(), articles: 1 },
            ]
        );
    }

    #[test]
    fn story_entry_domain_falls_back_to_feed_source() {
        let mut a = article(1, None, "aaaa");
        a.domain = String::new();
        let r = StoryReport::build(&[a, article(2, None, "bb")]);
        assert_eq!(r.stories[0].articles[0].domain, "Mint");
        assert_eq!(r.stories[1].articles[0].domain, "a.test");
    }

    #[test]
    fn summary_stats_count_numeric_points() {
        let mut a = article(1, Some("Infosys"), "x");
        a.summary = Some(Summary {
            summary: "s".into(),
            numeric_data: vec!["a".into(), "b".into()],
            source: "src".into(),
            sentiment: None,
        });
        let mut b = article(2, Some("Wipro"), "y");
        b.summary = Some(Summary::placeholder("Error processing article"));
        let stats = SummaryStats::from_articles(&[a, b, article(3, None, "z")]);
        assert_eq!(
            stats,
            SummaryStats { summarized: 2, with_numeric_data: 1, numeric_points: 2 }
        );
    }
}
