use async_trait::async_trait;
use quotequest_common::{QuoteError, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use crate::llm_trait::LlmClient;
use crate::types::{GenerateOptions, GenerateRequest, GenerateResponse};

/// Build the shared HTTP client used by every LLM backend
pub(crate) fn build_http_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(300)) // 5 minutes for LLM calls
        .build()
        .map_err(|e| QuoteError::config(format!("Failed to create HTTP client: {}", e)))
}

/// Ollama API client
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: Client,
}

impl OllamaClient {
    /// Create new Ollama client
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let model = model.into();
        let client = build_http_client()?;

        info!("Ollama client initialized: {} ({})", base_url, model);
        Ok(Self {
            base_url,
            model,
            client,
        })
    }

    fn request(&self, prompt: &str) -> GenerateRequest {
        GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: Some(false),
            options: Some(GenerateOptions {
                temperature: Some(0.2),
                top_p: Some(0.9),
            }),
        }
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let request = self.request(prompt);

        debug!(
            "Sending generate request to Ollama - Model: {}, Prompt length: {}",
            request.model,
            request.prompt.len()
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| QuoteError::external_service(format!("Failed to send request: {}", e)))?
            .error_for_status()
            .map_err(|e| QuoteError::external_service(format!("Ollama API error: {}", e)))?;

        let result: GenerateResponse = response.json().await.map_err(|e| {
            QuoteError::external_service(format!("Failed to parse Ollama response: {}", e))
        })?;

        if result.response.is_empty() {
            return Err(QuoteError::external_service("Empty response from Ollama"));
        }

        debug!("Received response from Ollama - Length: {}, Done: {}", result.response.len(), result.done);
        Ok(result.response)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = OllamaClient::new("http://localhost:11434/", "llama3.2").unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
        assert_eq!(client.model(), "llama3.2");
    }

    #[test]
    fn test_request_is_not_streaming() {
        let client = OllamaClient::new("http://localhost:11434", "llama3.2").unwrap();
        let json = serde_json::to_value(client.request("hello")).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["prompt"], "hello");
    }
}
