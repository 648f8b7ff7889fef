//! QuoteQuest LLM Integration
//!
//! OpenAI, Gemini and Ollama clients plus the categorization and
//! distillation requests built on top of them

mod categorize;
mod client;
mod distill;
mod gemini;
mod llm_trait;
mod models;
mod openai;
mod prompts;
mod tokens;
mod types;

pub use categorize::Categorizer;
pub use client::OllamaClient;
pub use distill::Distiller;
pub use gemini::GeminiClient;
pub use llm_trait::LlmClient;
pub use models::{build_client, ModelKind, ModelRole};
pub use openai::OpenAiClient;
pub use prompts::{categorization_prompt, distillation_prompt};
pub use tokens::estimate_tokens;
pub use types::IdQuote;
