use crate::error::QuoteError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Inclusive range of seconds used for randomized courtesy delays
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl DelayRange {
    pub const fn new(min_secs: f64, max_secs: f64) -> Self {
        Self { min_secs, max_secs }
    }

    /// No delay at all (tests, local mirrors)
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Parse `"10-30"` or a single value `"5"`
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        match value.split_once('-') {
            Some((min, max)) => Some(Self::new(min.trim().parse().ok()?, max.trim().parse().ok()?)),
            None => {
                let secs = value.parse().ok()?;
                Some(Self::new(secs, secs))
            }
        }
    }

    pub fn is_zero(&self) -> bool {
        self.max_secs <= 0.0
    }
}

/// QuoteQuest application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root of per-keyword working directories
    pub workspace_dir: PathBuf,

    /// Directory that receives the rendered wiki files
    pub output_dir: PathBuf,

    /// Log directory
    pub log_dir: PathBuf,

    /// Log level
    pub log_level: String,

    /// OpenAI API key
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,

    /// OpenAI API base URL
    pub openai_base_url: String,

    /// OpenAI model used for categorization
    pub openai_categorize_model: String,

    /// OpenAI model used for distillation
    pub openai_distill_model: String,

    /// Gemini API key
    #[serde(skip_serializing)]
    pub gemini_api_key: Option<String>,

    /// Gemini API base URL
    pub gemini_base_url: String,

    /// Gemini model name
    pub gemini_model: String,

    /// Ollama API base URL
    pub ollama_base_url: String,

    /// Ollama model name
    pub ollama_model: String,

    /// Library search endpoint
    pub search_url: String,

    /// Value of the search `Authorization` header
    #[serde(skip_serializing)]
    pub search_auth: Option<String>,

    /// File listing one keyword filter per line
    pub keyword_filter_file: PathBuf,

    /// Hits requested per search page
    pub search_batch_size: usize,

    /// Consecutive 429 responses tolerated per page
    pub search_max_retries: u32,

    /// Delay between search pages
    pub search_page_delay: DelayRange,

    /// Delay between keyword filters
    pub search_filter_delay: DelayRange,

    /// Attempts per distillation call
    pub distill_max_retries: u32,

    /// Pause between distillation attempts
    pub distill_retry_delay_secs: u64,

    /// Distillation calls in flight per partition
    pub distill_concurrency: usize,
}

pub const DEFAULT_SEARCH_URL: &str =
    "https://f4e3b80fb962746a74ba859b4b27e7d6.us-east-1.aws.found.io/library/_search";

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace_dir: PathBuf::from("./workspace"),
            output_dir: PathBuf::from("."),
            log_dir: PathBuf::from("./workspace/log"),
            log_level: "info".to_string(),
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_categorize_model: "gpt-4.1-mini".to_string(),
            openai_distill_model: "gpt-4-turbo".to_string(),
            gemini_api_key: None,
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            gemini_model: "gemini-2.5-flash".to_string(),
            ollama_base_url: "http://localhost:11434".to_string(),
            ollama_model: "llama3.2:latest".to_string(),
            search_url: DEFAULT_SEARCH_URL.to_string(),
            search_auth: None,
            keyword_filter_file: PathBuf::from("keyword_filter.txt"),
            search_batch_size: 50,
            search_max_retries: 5,
            search_page_delay: DelayRange::new(10.0, 30.0),
            search_filter_delay: DelayRange::new(5.0, 10.0),
            distill_max_retries: 3,
            distill_retry_delay_secs: 5,
            distill_concurrency: 1,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self, QuoteError> {
        // Load .env file (ignore if not exists)
        let _ = dotenv::dotenv();

        let defaults = Self::default();

        let config = Self {
            workspace_dir: Self::get_env_path("WORKSPACE_DIR").unwrap_or(defaults.workspace_dir),
            output_dir: Self::get_env_path("OUTPUT_DIR").unwrap_or(defaults.output_dir),
            log_dir: Self::get_env_path("LOG_DIR").unwrap_or(defaults.log_dir),
            log_level: std::env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            openai_api_key: Self::get_env_secret("OPENAI_API_KEY"),
            openai_base_url: std::env::var("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            openai_categorize_model: std::env::var("OPENAI_CATEGORIZE_MODEL")
                .unwrap_or(defaults.openai_categorize_model),
            openai_distill_model: std::env::var("OPENAI_DISTILL_MODEL")
                .unwrap_or(defaults.openai_distill_model),
            gemini_api_key: Self::get_env_secret("GEMINI_API_KEY"),
            gemini_base_url: std::env::var("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            gemini_model: std::env::var("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            ollama_base_url: std::env::var("OLLAMA_BASE_URL").unwrap_or(defaults.ollama_base_url),
            ollama_model: std::env::var("OLLAMA_MODEL").unwrap_or(defaults.ollama_model),
            search_url: std::env::var("SEARCH_URL").unwrap_or(defaults.search_url),
            search_auth: Self::get_env_secret("SEARCH_AUTH"),
            keyword_filter_file: Self::get_env_path("KEYWORD_FILTER_FILE")
                .unwrap_or(defaults.keyword_filter_file),
            search_batch_size: Self::get_env_parsed("SEARCH_BATCH_SIZE")
                .unwrap_or(defaults.search_batch_size),
            search_max_retries: Self::get_env_parsed("SEARCH_MAX_RETRIES")
                .unwrap_or(defaults.search_max_retries),
            search_page_delay: std::env::var("SEARCH_PAGE_DELAY_SECS")
                .ok()
                .and_then(|s| DelayRange::parse(&s))
                .unwrap_or(defaults.search_page_delay),
            search_filter_delay: std::env::var("SEARCH_FILTER_DELAY_SECS")
                .ok()
                .and_then(|s| DelayRange::parse(&s))
                .unwrap_or(defaults.search_filter_delay),
            distill_max_retries: Self::get_env_parsed("DISTILL_MAX_RETRIES")
                .unwrap_or(defaults.distill_max_retries),
            distill_retry_delay_secs: Self::get_env_parsed("DISTILL_RETRY_DELAY_SECS")
                .unwrap_or(defaults.distill_retry_delay_secs),
            distill_concurrency: Self::get_env_parsed("DISTILL_CONCURRENCY")
                .unwrap_or(defaults.distill_concurrency),
        };

        config.validate()?;

        Ok(config)
    }

    /// Get PathBuf from environment variable
    fn get_env_path(key: &str) -> Option<PathBuf> {
        std::env::var(key).ok().map(PathBuf::from)
    }

    /// Get a non-empty secret from environment variable
    fn get_env_secret(key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|s| !s.trim().is_empty())
    }

    fn get_env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
        std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
    }

    /// Ensure the keyword working directory exists, create if not
    pub fn ensure_keyword_dir(&self, keyword: &str) -> Result<PathBuf, QuoteError> {
        let dir = self.keyword_dir(keyword);
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                QuoteError::config(format!(
                    "Failed to create directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }
        Ok(dir)
    }

    /// Working directory for one keyword
    pub fn keyword_dir(&self, keyword: &str) -> PathBuf {
        self.workspace_dir.join(keyword)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), QuoteError> {
        let urls = [
            ("OpenAI", &self.openai_base_url),
            ("Gemini", &self.gemini_base_url),
            ("Ollama", &self.ollama_base_url),
            ("Search", &self.search_url),
        ];
        for (name, url) in urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(QuoteError::config(format!(
                    "{} URL must start with http:// or https://",
                    name
                )));
            }
        }

        for (name, range) in [
            ("search page delay", &self.search_page_delay),
            ("search filter delay", &self.search_filter_delay),
        ] {
            if range.min_secs < 0.0 || range.min_secs > range.max_secs {
                return Err(QuoteError::config(format!(
                    "Invalid {}: {}-{}",
                    name, range.min_secs, range.max_secs
                )));
            }
        }

        if self.search_batch_size == 0 {
            return Err(QuoteError::config("Search batch size cannot be 0"));
        }

        if self.distill_concurrency == 0 {
            return Err(QuoteError::config("Distill concurrency cannot be 0"));
        }

        Ok(())
    }
}
