//! LLM adapter: provider abstraction, concrete Gemini/OpenAI clients, a disabled
//! client for missing keys, and a scripted mock for tests.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::config::{AiConfig, AiProvider};

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// Sampling knobs; `None` leaves the provider default.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationParams {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
}

pub trait LlmClient: Send + Sync {
    /// Send a single free-text prompt; returns the raw completion text.
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
        params: GenerationParams,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
    /// `false` when no API key is configured.
    fn is_enabled(&self) -> bool {
        true
    }
}

pub type DynLlmClient = Arc<dyn LlmClient>;

/// Build a client from config + environment. A missing key yields a
/// `DisabledClient` (logged), never an error.
pub fn build_llm_client(cfg: &AiConfig) -> Result<DynLlmClient> {
    let Some(api_key) = cfg.resolve_api_key() else {
        tracing::warn!(
            target: "llm",
            var = cfg.key_env_var(),
            "API key not set; company extraction and summaries are disabled"
        );
        return Ok(Arc::new(DisabledClient));
    };
    let timeout = Duration::from_secs(cfg.request_timeout_secs);
    let client: DynLlmClient = match cfg.provider {
        AiProvider::Gemini => Arc::new(GeminiClient::new(
            api_key,
            cfg.model_name(),
            cfg.base_url.as_deref(),
            timeout,
        )?),
        AiProvider::OpenAi => Arc::new(OpenAiClient::new(
            api_key,
            cfg.model_name(),
            cfg.base_url.as_deref(),
            timeout,
        )?),
    };
    tracing::info!(
        target: "llm",
        provider = client.provider_name(),
        model = cfg.model_name(),
        "LLM client ready"
    );
    Ok(client)
}

fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent("business-news-digest/0.1")
        .connect_timeout(Duration::from_secs(4))
        .timeout(timeout)
        .build()
        .context("building LLM http client")
}

/// Short, single-line view of an error body for logs.
fn snippet(body: &str) -> String {
    body.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(200)
        .collect()
}

// ------------------------------------------------------------
// Gemini (generateContent REST API)
// ------------------------------------------------------------

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com/v1beta";

    pub fn new(
        api_key: String,
        model: &str,
        base_url: Option<&str>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            api_key,
            model: model.trim_start_matches("models/").to_string(),
            base_url: base_url
                .unwrap_or(Self::DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
        })
    }

    async fn complete_impl(&self, prompt: &str, params: GenerationParams) -> Result<String> {
        #[derive(Serialize)]
        struct Part<'a> {
            text: &'a str,
        }
        #[derive(Serialize)]
        struct Content<'a> {
            parts: Vec<Part<'a>>,
        }
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct GenConfig {
            #[serde(skip_serializing_if = "Option::is_none")]
            temperature: Option<f32>,
            #[serde(skip_serializing_if = "Option::is_none")]
            top_p: Option<f32>,
            #[serde(skip_serializing_if = "Option::is_none")]
            top_k: Option<u32>,
        }
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Req<'a> {
            contents: Vec<Content<'a>>,
            generation_config: GenConfig,
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }
        #[derive(Deserialize)]
        struct Candidate {
            content: Option<RespContent>,
        }
        #[derive(Deserialize)]
        struct RespContent {
            #[serde(default)]
            parts: Vec<RespPart>,
        }
        #[derive(Deserialize)]
        struct RespPart {
            #[serde(default)]
            text: String,
        }

        let req = Req {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenConfig {
                temperature: params.temperature,
                top_p: params.top_p,
                top_k: params.top_k,
            },
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&req)
            .send()
            .await
            .context("gemini request")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("gemini HTTP {status}: {}", snippet(&body));
        }
        let body: Resp = resp.json().await.context("gemini response json")?;
        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(anyhow!("gemini returned no text"));
        }
        Ok(text)
    }
}

impl LlmClient for GeminiClient {
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
        params: GenerationParams,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        counter!("llm_calls_total", "provider" => "gemini").increment(1);
        Box::pin(self.complete_impl(prompt, params))
    }
    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

// ------------------------------------------------------------
// OpenAI (Chat Completions API)
// ------------------------------------------------------------

pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";

    pub fn new(
        api_key: String,
        model: &str,
        base_url: Option<&str>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            api_key,
            model: model.to_string(),
            base_url: base_url
                .unwrap_or(Self::DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
        })
    }

    async fn complete_impl(&self, prompt: &str, params: GenerationParams) -> Result<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            #[serde(skip_serializing_if = "Option::is_none")]
            temperature: Option<f32>,
            #[serde(skip_serializing_if = "Option::is_none")]
            top_p: Option<f32>,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            #[serde(default)]
            content: Option<String>,
        }

        // top_k has no Chat Completions equivalent.
        let req = Req {
            model: &self.model,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
            temperature: params.temperature,
            top_p: params.top_p,
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("openai request")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("openai HTTP {status}: {}", snippet(&body));
        }
        let body: Resp = resp.json().await.context("openai response json")?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| anyhow!("openai returned no text"))
    }
}

impl LlmClient for OpenAiClient {
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
        params: GenerationParams,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        counter!("llm_calls_total", "provider" => "openai").increment(1);
        Box::pin(self.complete_impl(prompt, params))
    }
    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

// ------------------------------------------------------------
// Disabled + mock
// ------------------------------------------------------------

/// Used when no API key is configured; every call fails fast.
pub struct DisabledClient;

impl LlmClient for DisabledClient {
    fn complete<'a>(
        &'a self,
        _prompt: &'a str,
        _params: GenerationParams,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async { Err(anyhow!("LLM disabled: no API key configured")) })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
    fn is_enabled(&self) -> bool {
        false
    }
}

/// Replays scripted responses in order and records every prompt.
/// Once the script runs out, calls fail. A poisoned lock is recovered, never re-panicked.
#[derive(Default)]
pub struct MockClient {
    script: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: impl Into<String>) -> Self {
        relock(&self.script).push_back(Ok(text.into()));
        self
    }

    pub fn fail(self, err: impl Into<String>) -> Self {
        relock(&self.script).push_back(Err(err.into()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        relock(&self.prompts).clone()
    }
}

fn relock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl LlmClient for MockClient {
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
        _params: GenerationParams,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        relock(&self.prompts).push(prompt.to_string());
        let next = relock(&self.script).pop_front();
        Box::pin(async move {
            match next {
                Some(Ok(text)) => Ok(text),
                Some(Err(e)) => Err(anyhow!(e)),
                None => Err(anyhow!("mock script exhausted")),
            }
        })
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Response helpers
// ------------------------------------------------------------

/// Pull the JSON object out of a completion that may be fenced (```json / ```)
/// or wrapped in prose (first `{` .. last `}`).
pub fn extract_json_block(text: &str) -> &str {
    let text = text.trim();
    if let Some((_, rest)) = text.split_once("```json") {
        return rest.split("```").next().unwrap_or(rest).trim();
    }
    if let Some((_, rest)) = text.split_once("```") {
        return rest.split("```").next().unwrap_or(rest).trim();
    }
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            return &text[start..=end];
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_survives_poisoned_lock() {
        let mock = MockClient::new().reply("ok");
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = mock.script.lock().unwrap();
            panic!("holder died");
        }));
        assert!(mock.script.is_poisoned());

        let out = mock.complete("p", GenerationParams::default()).await.unwrap();
        assert_eq!(out, "ok");
        assert_eq!(mock.prompts(), vec!["p".to_string()]);
        assert_eq!(mock.calls(), 1);
    }

    #[test]
    fn json_block_from_fences_and_prose() {
        assert_eq!(
            extract_json_block("```json\n{\"a\": 1}\n```"),
            "{\"a\": 1}"
        );
        assert_eq!(extract_json_block("```\n{\"a\": 2}\n```"), "{\"a\": 2}");
        assert_eq!(
            extract_json_block("Sure! Here it is: {\"a\": 3} hope that helps"),
            "{\"a\": 3}"
        );
        assert_eq!(extract_json_block("  NONE "), "NONE");
    }

    #[tokio::test]
    async fn disabled_client_fails_fast() {
        let c = DisabledClient;
        assert!(!c.is_enabled());
        assert!(c.complete("x", GenerationParams::default()).await.is_err());
    }

    #[tokio::test]
    async fn mock_replays_script_in_order() {
        let m = MockClient::new().reply("one").fail("boom");
        assert_eq!(m.complete("p1", GenerationParams::default()).await.unwrap(), "one");
        assert!(m.complete("p2", GenerationParams::default()).await.is_err());
        assert!(m.complete("p3", GenerationParams::default()).await.is_err());
        assert_eq!(m.calls(), 3);
        assert_eq!(m.prompts(), vec!["p1", "p2", "p3"]);
    }
}
