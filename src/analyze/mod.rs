// src/analyze/mod.rs
//! LLM-backed analysis: company extraction and article summaries.

pub mod entity;
pub mod llm;
pub mod summarize;

pub use entity::EntityExtractor;
pub use llm::{build_llm_client, DynLlmClient, LlmClient};
pub use summarize::{Summarizer, Summary};
