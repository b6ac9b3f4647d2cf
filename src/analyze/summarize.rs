//! Financial summary of an article: short synopsis, numeric facts, data source.

use anyhow::{anyhow, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use super::llm::{extract_json_block, DynLlmClient, GenerationParams};
use crate::article::ScrapedArticle;
use crate::config::PipelineConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub summary: String,
    pub numeric_data: Vec<String>,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
}

impl Summary {
    /// Degraded result used when the model is unavailable or unparseable.
    pub fn placeholder(message: &str) -> Self {
        Self {
            summary: message.to_string(),
            numeric_data: Vec::new(),
            source: "Unknown".to_string(),
            sentiment: None,
        }
    }
}

/// Parse a model reply. Missing keys fall back to defaults; a reply that is
/// not a JSON object is an error.
pub fn parse_summary(raw: &str) -> Result<Summary> {
    let v: Value = serde_json::from_str(extract_json_block(raw))?;
    let obj = v
        .as_object()
        .ok_or_else(|| anyhow!("summary reply is not a JSON object"))?;

    let text_field = |key: &str| {
        obj.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let numeric_data = match obj.get("numeric_data") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|it| match it {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    };

    Ok(Summary {
        summary: text_field("summary").unwrap_or_else(|| "No summary available".to_string()),
        numeric_data,
        source: text_field("source").unwrap_or_else(|| "Unknown".to_string()),
        sentiment: text_field("sentiment"),
    })
}

pub struct Summarizer {
    llm: DynLlmClient,
    excerpt_chars: usize,
    min_article_length: usize,
}

impl Summarizer {
    pub fn new(llm: DynLlmClient, excerpt_chars: usize, min_article_length: usize) -> Self {
        Self {
            llm,
            excerpt_chars,
            min_article_length,
        }
    }

    pub fn from_config(llm: DynLlmClient, cfg: &PipelineConfig) -> Self {
        Self::new(llm, cfg.excerpt_chars, cfg.min_article_length)
    }

    pub fn build_prompt(&self, article_text: &str, article_title: &str, company: Option<&str>) -> String {
        let excerpt: String = article_text.chars().take(self.excerpt_chars).collect();
        let about = company
            .filter(|c| !c.trim().is_empty())
            .map(|c| format!(" about {c}"))
            .unwrap_or_default();
        let title = if article_title.trim().is_empty() {
            "Not provided"
        } else {
            article_title
        };
        format!(
            r#"You are a financial data analyst. Analyze this news article{about} and pull out the key information.

Article Title: {title}

Article Text: {excerpt}

Tasks:
1. Write a concise summary (4-5 lines at most) of the most significant information.
2. List ALL numeric or quantitative data (revenue, profit, percentages, growth rates, market share, dates, projections, ...).
3. State where the data comes from (company announcement, analyst report, regulatory filing, unnamed sources, ...).
4. Give the overall market sentiment for the company: positive, negative or neutral.

Reply with ONLY a JSON object in exactly this shape:
{{
    "summary": "4-5 line summary with the key highlights and numbers",
    "numeric_data": ["Revenue: X crore", "Growth: X%"],
    "source": "Where the data comes from",
    "sentiment": "positive/negative/neutral"
}}

Notes:
- Keep the summary to 4-5 lines.
- If there is no numeric data, return an empty array.
- If the source is unclear, say "Article/Report" or "Unnamed sources".

JSON Response:"#
        )
    }

    /// Summarize raw text. Never fails: problems yield a placeholder.
    pub async fn summarize_text(&self, article_text: &str, article_title: &str, company: Option<&str>) -> Summary {
        if !self.llm.is_enabled() {
            warn!(target: "summarize", "LLM disabled; using placeholder summary");
            return Summary::placeholder("API key not configured");
        }
        let prompt = self.build_prompt(article_text, article_title, company);
        let parsed = match self.llm.complete(&prompt, GenerationParams::default()).await {
            Ok(raw) => parse_summary(&raw),
            Err(e) => Err(e),
        };
        parsed.unwrap_or_else(|e| {
            warn!(target: "summarize", error = %format!("{e:#}"), "error summarizing article");
            Summary::placeholder("Error processing article")
        })
    }

    /// `None` when the article is skipped (sentinel body or shorter than the
    /// minimum length); no LLM call is made in that case.
    pub async fn summarize_article(&self, article: &ScrapedArticle) -> Option<Summary> {
        let text = article.body.text()?;
        if article.length() < self.min_article_length {
            return None;
        }
        Some(
            self.summarize_text(text, &article.item.title, article.company_name.as_deref())
                .await,
        )
    }

    /// Summarize each article in turn; returns only the ones that were summarized,
    /// with `summary` filled in.
    pub async fn summarize_all(&self, articles: Vec<ScrapedArticle>) -> Vec<ScrapedArticle> {
        if articles.is_empty() {
            return Vec::new();
        }
        info!(target: "summarize", count = articles.len(), "summarizing articles");

        let total = articles.len();
        let mut out = Vec::with_capacity(total);
        for (i, mut article) in articles.into_iter().enumerate() {
            let Some(summary) = self.summarize_article(&article).await else {
                continue;
            };
            info!(
                target: "summarize",
                article = i + 1,
                of = total,
                source = %article.item.source,
                company = article.company_name.as_deref().unwrap_or(""),
                numeric_points = summary.numeric_data.len(),
                preview = %crate::scrape::truncate(&summary.summary, 80),
                "summary ready"
            );
            article.summary = Some(summary);
            out.push(article);
        }
        out
    }
}
