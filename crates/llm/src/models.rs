use quotequest_common::{AppConfig, QuoteError, Result};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::client::OllamaClient;
use crate::gemini::GeminiClient;
use crate::llm_trait::LlmClient;
use crate::openai::OpenAiClient;

/// LLM backend family; its tag is part of every stage filename
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    ChatGpt,
    Gemini,
    Ollama,
}

/// What the model is asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    Categorize,
    Distill,
}

impl ModelKind {
    /// Tag used in stage filenames (`_categorized-Gemini.txt`)
    pub fn tag(&self) -> &'static str {
        match self {
            Self::ChatGpt => "ChatGPT",
            Self::Gemini => "Gemini",
            Self::Ollama => "Ollama",
        }
    }

    /// Lowercase name used for audit files
    pub fn audit_name(&self) -> &'static str {
        match self {
            Self::ChatGpt => "chatgpt",
            Self::Gemini => "gemini",
            Self::Ollama => "ollama",
        }
    }

    pub fn all() -> [ModelKind; 3] {
        [Self::ChatGpt, Self::Gemini, Self::Ollama]
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ModelKind {
    type Err = QuoteError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "chatgpt" | "openai" => Ok(Self::ChatGpt),
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            other => Err(QuoteError::invalid_input(format!(
                "Unsupported model '{}'. Use ChatGPT, Gemini or Ollama",
                other
            ))),
        }
    }
}

/// Construct the client for a backend and role from configuration
pub fn build_client(kind: ModelKind, role: ModelRole, config: &AppConfig) -> Result<Arc<dyn LlmClient>> {
    let client: Arc<dyn LlmClient> = match kind {
        ModelKind::ChatGpt => {
            let api_key = config
                .openai_api_key
                .clone()
                .ok_or_else(|| QuoteError::config("OPENAI_API_KEY is not set"))?;
            let model = match role {
                ModelRole::Categorize => &config.openai_categorize_model,
                ModelRole::Distill => &config.openai_distill_model,
            };
            Arc::new(OpenAiClient::new(&config.openai_base_url, api_key, model)?)
        }
        ModelKind::Gemini => {
            let api_key = config
                .gemini_api_key
                .clone()
                .ok_or_else(|| QuoteError::config("GEMINI_API_KEY is not set"))?;
            Arc::new(GeminiClient::new(&config.gemini_base_url, api_key, &config.gemini_model)?)
        }
        ModelKind::Ollama => Arc::new(OllamaClient::new(&config.ollama_base_url, &config.ollama_model)?),
    };
    Ok(client)
}
