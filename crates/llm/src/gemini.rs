use async_trait::async_trait;
use quotequest_common::{QuoteError, Result};
use reqwest::Client;
use tracing::{debug, info};

use crate::client::build_http_client;
use crate::llm_trait::LlmClient;
use crate::types::{GeminiRequest, GeminiResponse};

/// Google Gemini generateContent client
#[derive(Debug, Clone)]
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    model: String,
    client: Client,
}

impl GeminiClient {
    /// Create new Gemini client
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let model = model.into();
        let client = build_http_client()?;

        info!("Gemini client initialized: {} ({})", base_url, model);
        Ok(Self {
            base_url,
            api_key: api_key.into(),
            model,
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GeminiRequest::from_prompt(prompt);

        debug!("Sending request to Gemini - Model: {}, Prompt length: {}", self.model, prompt.len());

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| QuoteError::external_service(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QuoteError::external_service(format!(
                "Gemini API error ({}): {}",
                status, body
            )));
        }

        let result: GeminiResponse = response.json().await.map_err(|e| {
            QuoteError::external_service(format!("Failed to parse Gemini response: {}", e))
        })?;

        if let Some(error) = &result.error {
            return Err(QuoteError::external_service(format!(
                "Gemini API error: {}",
                error.message
            )));
        }

        match result.text() {
            Some(text) if !text.is_empty() => Ok(text),
            _ => Err(QuoteError::external_service("Empty response from Gemini")),
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        let client = GeminiClient::new(
            "https://generativelanguage.googleapis.com/v1beta/",
            "key",
            "gemini-2.5-flash",
        )
        .unwrap();
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }
}
