use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::llm_trait::LlmClient;
use crate::prompts::distillation_prompt;

/// Shortens paragraphs to keyword excerpts, never failing the batch
pub struct Distiller {
    client: Arc<dyn LlmClient>,
    tag: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl Distiller {
    /// Create new distiller; `tag` names the backend in the failure sentinel
    pub fn new(client: Arc<dyn LlmClient>, tag: impl Into<String>) -> Self {
        Self {
            client,
            tag: tag.into(),
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
        }
    }

    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.retry_delay = retry_delay;
        self
    }

    /// Excerpt recorded when every attempt failed
    pub fn failure_sentinel(&self) -> String {
        format!("[[{} distillation failed]]", self.tag)
    }

    /// Distill one paragraph, returning the sentinel after exhausting retries
    pub async fn distill(&self, paragraph: &str, keyword: &str) -> String {
        let prompt = distillation_prompt(keyword, paragraph);

        for attempt in 1..=self.max_retries {
            match self.client.generate(&prompt).await {
                Ok(excerpt) => {
                    let excerpt = excerpt.trim().to_string();
                    debug!("Distilled {} chars into {} chars", paragraph.len(), excerpt.len());
                    return excerpt;
                }
                Err(e) => {
                    warn!(
                        "{} distillation failed (attempt {}/{}): {}",
                        self.tag, attempt, self.max_retries, e
                    );
                    if attempt < self.max_retries && !self.retry_delay.is_zero() {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        self.failure_sentinel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quotequest_common::{QuoteError, Result};
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` calls, then answers
    struct FlakyClient {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl LlmClient for FlakyClient {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(QuoteError::external_service("timeout"))
            } else {
                Ok("  the balance of justice  \n".to_string())
            }
        }

        fn model(&self) -> &str {
            "flaky"
        }
    }

    fn flaky(failures: u32) -> Arc<FlakyClient> {
        Arc::new(FlakyClient {
            failures,
            calls: AtomicU32::new(0),
        })
    }

    #[tokio::test]
    async fn test_recovers_within_retry_budget() {
        let client = flaky(2);
        let distiller = Distiller::new(client.clone(), "ChatGPT").with_retries(3, Duration::ZERO);
        let excerpt = distiller.distill("paragraph", "justice").await;
        assert_eq!(excerpt, "the balance of justice");
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_returns_sentinel_when_exhausted() {
        let client = flaky(10);
        let distiller = Distiller::new(client.clone(), "Gemini").with_retries(3, Duration::ZERO);
        let excerpt = distiller.distill("paragraph", "justice").await;
        assert_eq!(excerpt, "[[Gemini distillation failed]]");
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    }
}
