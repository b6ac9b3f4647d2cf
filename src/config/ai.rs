// src/config/ai.rs
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    #[default]
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
}

impl AiProvider {
    pub fn key_env_var(self) -> &'static str {
        match self {
            AiProvider::Gemini => "GEMINI_API_KEY",
            AiProvider::OpenAi => "OPENAI_API_KEY",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            AiProvider::Gemini => "gemini-2.5-flash",
            AiProvider::OpenAi => "gpt-4o-mini",
        }
    }
}

fn default_entity_temperature() -> f32 {
    0.1
}
fn default_entity_top_p() -> f32 {
    0.8
}
fn default_entity_top_k() -> u32 {
    40
}
fn default_request_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// "gemini" | "openai"
    #[serde(default)]
    pub provider: AiProvider,
    /// Provider default when absent.
    #[serde(default)]
    pub model: Option<String>,
    /// Name of the env var holding the key; defaults per provider.
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Base URL override (local proxies, tests).
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_entity_temperature")]
    pub entity_temperature: f32,
    #[serde(default = "default_entity_top_p")]
    pub entity_top_p: f32,
    #[serde(default = "default_entity_top_k")]
    pub entity_top_k: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: AiProvider::default(),
            model: None,
            api_key_env: None,
            base_url: None,
            entity_temperature: default_entity_temperature(),
            entity_top_p: default_entity_top_p(),
            entity_top_k: default_entity_top_k(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl AiConfig {
    pub fn model_name(&self) -> &str {
        self.model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| self.provider.default_model())
    }

    pub fn key_env_var(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.provider.key_env_var())
    }

    /// Read the API key from the environment. `None` disables LLM features.
    pub fn resolve_api_key(&self) -> Option<String> {
        env::var(self.key_env_var())
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}
