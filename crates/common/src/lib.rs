//! QuoteQuest shared configuration, errors and logging

pub mod config;
pub mod error;
pub mod logger;

// Re-export commonly used types
pub use config::{AppConfig, DelayRange};
pub use error::QuoteError;
pub type Result<T> = std::result::Result<T, QuoteError>;
