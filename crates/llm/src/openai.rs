use async_trait::async_trait;
use quotequest_common::{QuoteError, Result};
use reqwest::Client;
use tracing::{debug, info};

use crate::client::build_http_client;
use crate::llm_trait::LlmClient;
use crate::types::{ChatMessage, ChatRequest, ChatResponse};

/// OpenAI chat completions client
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    model: String,
    client: Client,
}

impl OpenAiClient {
    /// Create new OpenAI client
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let model = model.into();
        let client = build_http_client()?;

        info!("OpenAI client initialized: {} ({})", base_url, model);
        Ok(Self {
            base_url,
            api_key: api_key.into(),
            model,
            client,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
        };

        debug!("Sending chat request to OpenAI - Model: {}, Prompt length: {}", self.model, prompt.len());

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| QuoteError::external_service(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QuoteError::external_service(format!(
                "OpenAI API error ({}): {}",
                status, body
            )));
        }

        let result: ChatResponse = response.json().await.map_err(|e| {
            QuoteError::external_service(format!("Failed to parse OpenAI response: {}", e))
        })?;

        let content = result
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        if content.is_empty() {
            return Err(QuoteError::external_service("Empty response from OpenAI"));
        }

        Ok(content)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
