//! Primary-company extraction.
//!
//! The model is asked for one company name plus a confidence tier. Its answer is
//! only trusted after local checks: the name (or, for multi-word names, its
//! first word) must literally appear in the article or title, must not be a
//! generic word, and confidence must be above `low`.

use serde::Deserialize;
use tracing::{debug, warn};

use super::llm::{extract_json_block, DynLlmClient, GenerationParams};
use crate::config::PipelineConfig;

const GENERIC_TERMS: &[&str] = &[
    "company",
    "corporation",
    "firm",
    "business",
    "the",
    "inc",
    "ltd",
    "limited",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    High,
    Medium,
    Low,
    None,
    /// Any other label the model invents; not rejected.
    Other,
}

impl Confidence {
    /// Missing confidence counts as `Low`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("high") => Confidence::High,
            Some("medium") => Confidence::Medium,
            Some("low") | None => Confidence::Low,
            Some("none") => Confidence::None,
            Some(_) => Confidence::Other,
        }
    }

    fn is_acceptable(self) -> bool {
        !matches!(self, Confidence::Low | Confidence::None)
    }
}

#[derive(Debug, Deserialize)]
struct EntityResponse {
    #[serde(default)]
    company_name: Option<String>,
    #[serde(default)]
    confidence: Option<String>,
}

/// Why a model answer was discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NoCompany,
    Generic(String),
    NotInText(String),
    LowConfidence(String),
}

/// Apply the post-validation rules to a model answer.
pub fn validate_candidate(
    name: &str,
    confidence: Confidence,
    article_text: &str,
    article_title: &str,
) -> Result<String, Rejection> {
    let name = name.trim();
    if name.is_empty() || name.eq_ignore_ascii_case("none") {
        return Err(Rejection::NoCompany);
    }

    let lower = name.to_lowercase();
    if GENERIC_TERMS.contains(&lower.as_str()) {
        return Err(Rejection::Generic(name.to_string()));
    }

    let text_lower = article_text.to_lowercase();
    let title_lower = article_title.to_lowercase();
    let mentioned = |needle: &str| text_lower.contains(needle) || title_lower.contains(needle);

    let mut appears = mentioned(&lower);
    if !appears {
        let words: Vec<&str> = name.split_whitespace().collect();
        if words.len() > 1 {
            appears = mentioned(&words[0].to_lowercase());
        }
    }
    if !appears {
        return Err(Rejection::NotInText(name.to_string()));
    }

    if !confidence.is_acceptable() {
        return Err(Rejection::LowConfidence(name.to_string()));
    }

    Ok(name.to_string())
}

pub struct EntityExtractor {
    llm: DynLlmClient,
    excerpt_chars: usize,
    params: GenerationParams,
}

impl EntityExtractor {
    pub fn new(llm: DynLlmClient, excerpt_chars: usize, params: GenerationParams) -> Self {
        Self {
            llm,
            excerpt_chars,
            params,
        }
    }

    pub fn from_config(llm: DynLlmClient, cfg: &PipelineConfig) -> Self {
        let params = GenerationParams {
            temperature: Some(cfg.ai.entity_temperature),
            top_p: Some(cfg.ai.entity_top_p),
            top_k: Some(cfg.ai.entity_top_k),
        };
        Self::new(llm, cfg.excerpt_chars, params)
    }

    pub fn build_prompt(&self, article_text: &str, article_title: &str) -> String {
        let excerpt: String = article_text.chars().take(self.excerpt_chars).collect();
        let title = if article_title.trim().is_empty() {
            "Not provided"
        } else {
            article_title
        };
        format!(
            r#"You are a financial analyst who identifies the company a news article is about.

RULES:
1. Name ONLY the primary company the article is mainly about.
2. The name MUST appear verbatim in the article text or title.
3. Never guess or infer a company that is not explicitly mentioned.
4. Use the short common name (e.g. "Infosys", not "Infosys Limited").
5. If the article covers a sector, the economy, or several companies with no clear focus, answer "NONE".
6. Never answer with generic words such as "the company", "firm" or "corporation".

Article Title: {title}

Article Text (first {n} chars): {excerpt}

Reply with ONLY a JSON object in exactly this shape:
{{"company_name": "CompanyName", "confidence": "high/medium/low", "mentioned_in": "title/body/both"}}

If no company qualifies, reply:
{{"company_name": "NONE", "confidence": "none", "mentioned_in": "none"}}

JSON Response:"#,
            n = self.excerpt_chars,
        )
    }

    /// Primary company named in the article, or `None` ("no entity found").
    /// API errors, malformed replies and failed validation all map to `None`.
    pub async fn extract(&self, article_text: &str, article_title: &str) -> Option<String> {
        if !self.llm.is_enabled() {
            warn!(target: "entity", "LLM disabled; skipping company extraction");
            return None;
        }

        let prompt = self.build_prompt(article_text, article_title);
        let raw = match self.llm.complete(&prompt, self.params).await {
            Ok(r) => r,
            Err(e) => {
                warn!(target: "entity", error = %format!("{e:#}"), "company extraction call failed");
                return None;
            }
        };

        let parsed: EntityResponse = match serde_json::from_str(extract_json_block(&raw)) {
            Ok(p) => p,
            Err(e) => {
                warn!(target: "entity", error = %e, "company extraction reply is not valid JSON");
                return None;
            }
        };

        let name = parsed.company_name.unwrap_or_default();
        let confidence = Confidence::parse(parsed.confidence.as_deref());
        match validate_candidate(&name, confidence, article_text, article_title) {
            Ok(n) => Some(n),
            Err(Rejection::NoCompany) => {
                debug!(target: "entity", "no primary company");
                None
            }
            Err(r) => {
                warn!(target: "entity", rejection = ?r, "company candidate rejected");
                None
            }
        }
    }
}
