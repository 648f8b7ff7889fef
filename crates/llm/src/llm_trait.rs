use async_trait::async_trait;
use quotequest_common::Result;

/// Common trait for LLM clients
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate text from a prompt (single attempt)
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Model identifier sent to the backend
    fn model(&self) -> &str;
}
