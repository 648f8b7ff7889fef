use quotequest_common::{QuoteError, Result};
use std::sync::Arc;
use tracing::info;

use crate::llm_trait::LlmClient;
use crate::prompts::categorization_prompt;
use crate::tokens::estimate_tokens;
use crate::types::IdQuote;

/// Sends one batch of paragraphs to a model and returns its raw theme listing
pub struct Categorizer {
    client: Arc<dyn LlmClient>,
}

impl Categorizer {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }

    /// Build the request prompt (persisted by the caller before sending)
    pub fn prompt(&self, keyword: &str, quotes: &[IdQuote]) -> Result<String> {
        categorization_prompt(keyword, quotes)
    }

    /// Single blocking call; any failure is fatal for the run
    pub async fn send(&self, prompt: &str) -> Result<String> {
        info!(
            "Categorizing with {} - Prompt: {} chars (~{} tokens)",
            self.client.model(),
            prompt.len(),
            estimate_tokens(prompt)
        );

        self.client.generate(prompt).await.map_err(|e| match e {
            QuoteError::ExternalService(msg) => QuoteError::external_service(format!(
                "Categorization with {} failed: {}",
                self.client.model(),
                msg
            )),
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FailingClient;

    #[async_trait]
    impl LlmClient for FailingClient {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Err(QuoteError::external_service("503 Service Unavailable"))
        }

        fn model(&self) -> &str {
            "failing"
        }
    }

    struct EchoClient;

    #[async_trait]
    impl LlmClient for EchoClient {
        async fn generate(&self, prompt: &str) -> Result<String> {
            Ok(format!("Echo:{}", prompt.len()))
        }

        fn model(&self) -> &str {
            "echo"
        }
    }

    #[tokio::test]
    async fn test_failure_is_propagated() {
        let categorizer = Categorizer::new(Arc::new(FailingClient));
        let err = categorizer.send("prompt").await.unwrap_err();
        assert!(matches!(err, QuoteError::ExternalService(_)));
        assert!(err.to_string().contains("failing"));
    }

    #[tokio::test]
    async fn test_reply_is_returned_verbatim() {
        let categorizer = Categorizer::new(Arc::new(EchoClient));
        let prompt = categorizer.prompt("unity", &[IdQuote::new("0", "text")]).unwrap();
        let reply = categorizer.send(&prompt).await.unwrap();
        assert_eq!(reply, format!("Echo:{}", prompt.len()));
        assert_eq!(categorizer.model(), "echo");
    }
}
