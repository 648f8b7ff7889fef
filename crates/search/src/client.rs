use async_trait::async_trait;
use quotequest_common::{AppConfig, DelayRange, QuoteError, Result};
use quotequest_pipeline::Record;
use rand::Rng;
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::query::{parse_hits, search_payload};

const BROWSER_AGENT: &str = "Mozilla/5.0";

/// Anything that can run a filtered full-text search
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str, filter: &str) -> Result<Vec<Record>>;
}

/// Search service settings
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub url: String,

    /// `Authorization` header value
    pub auth: String,

    pub batch_size: usize,

    /// Consecutive 429 responses tolerated per page
    pub max_retries: u32,

    pub page_delay: DelayRange,
}

impl SearchOptions {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let auth = config
            .search_auth
            .as_deref()
            .ok_or_else(|| QuoteError::config("SEARCH_AUTH is not set"))?;

        let auth = if auth.starts_with("Basic ") {
            auth.to_string()
        } else {
            format!("Basic {}", auth)
        };

        Ok(Self {
            url: config.search_url.clone(),
            auth,
            batch_size: config.search_batch_size,
            max_retries: config.search_max_retries,
            page_delay: config.search_page_delay,
        })
    }
}

/// Uniformly random duration within the range
pub fn random_delay(range: &DelayRange) -> Duration {
    if range.is_zero() {
        return Duration::ZERO;
    }
    let secs = if range.max_secs > range.min_secs {
        rand::rng().random_range(range.min_secs..=range.max_secs)
    } else {
        range.min_secs
    };
    Duration::from_secs_f64(secs.max(0.0))
}

/// `2^retries` seconds plus up to one second of jitter
pub fn backoff_delay(retries: u32) -> Duration {
    let jitter: f64 = rand::rng().random_range(0.0..1.0);
    Duration::from_secs_f64(2f64.powi(retries.min(16) as i32) + jitter)
}

/// HTTP client for the library search service
pub struct SearchClient {
    client: Client,
    options: SearchOptions,
}

impl SearchClient {
    pub fn new(options: SearchOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| QuoteError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, options })
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Fetch one page, retrying on 429; `None` means a non-retryable status
    async fn fetch_page(&self, payload: &Value, filter: &str) -> Result<Option<Value>> {
        let mut retries = 0;
        loop {
            let response = self
                .client
                .post(&self.options.url)
                .header(AUTHORIZATION, &self.options.auth)
                .header(USER_AGENT, BROWSER_AGENT)
                .json(payload)
                .send()
                .await
                .map_err(|e| QuoteError::network(format!("Search request failed: {}", e)))?;

            let status = response.status();
            if status.is_success() {
                let body = response
                    .json::<Value>()
                    .await
                    .map_err(|e| QuoteError::network(format!("Invalid search response: {}", e)))?;
                return Ok(Some(body));
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                if retries >= self.options.max_retries {
                    return Err(QuoteError::network(format!(
                        "Search rate limit persisted after {} retries for filter '{}'",
                        retries, filter
                    )));
                }
                let wait = backoff_delay(retries);
                warn!("Rate limit hit. Retrying in {:.2} seconds", wait.as_secs_f64());
                tokio::time::sleep(wait).await;
                retries += 1;
                continue;
            }

            let text = response.text().await.unwrap_or_default();
            warn!("Search error {} for filter '{}': {}", status, filter, text);
            return Ok(None);
        }
    }
}

#[async_trait]
impl SearchBackend for SearchClient {
    /// Page through every hit; a non-429 error status ends the search with what was gathered
    async fn search(&self, query: &str, filter: &str) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        let mut from = 0;

        loop {
            let payload = search_payload(query, filter, from, self.options.batch_size);
            let Some(body) = self.fetch_page(&payload, filter).await? else {
                return Ok(records);
            };

            let page = parse_hits(&body);
            if page.hits == 0 {
                info!("Search '{}' / '{}' returned {} hits", query, filter, records.len());
                return Ok(records);
            }

            debug!("Page at {} returned {} hits", from, page.hits);
            records.extend(page.records);
            from += self.options.batch_size;

            tokio::time::sleep(random_delay(&self.options.page_delay)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_delay_within_range() {
        let range = DelayRange::new(0.5, 1.5);
        for _ in 0..100 {
            let d = random_delay(&range).as_secs_f64();
            assert!((0.5..=1.5).contains(&d));
        }
        assert_eq!(random_delay(&DelayRange::zero()), Duration::ZERO);
        assert_eq!(random_delay(&DelayRange::new(2.0, 2.0)), Duration::from_secs(2));
    }

    #[test]
    fn test_backoff_grows_exponentially() {
        for retries in 0..5 {
            let d = backoff_delay(retries).as_secs_f64();
            let base = 2f64.powi(retries as i32);
            assert!(d >= base && d < base + 1.0);
        }
    }

    #[test]
    fn test_options_require_auth() {
        let mut config = AppConfig::default();
        config.search_auth = None;
        assert!(matches!(SearchOptions::from_config(&config), Err(QuoteError::Config(_))));

        config.search_auth = Some("dXNlcjpwYXNz".to_string());
        let options = SearchOptions::from_config(&config).unwrap();
        assert_eq!(options.auth, "Basic dXNlcjpwYXNz");
        assert_eq!(options.batch_size, config.search_batch_size);

        config.search_auth = Some("Basic abc".to_string());
        assert_eq!(SearchOptions::from_config(&config).unwrap().auth, "Basic abc");
    }
}
