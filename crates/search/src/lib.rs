//! QuoteQuest library search
//!
//! Paginated, rate-limited full-text search that writes one raw partition
//! per keyword filter

mod client;
mod filters;
mod query;

pub use client::{backoff_delay, random_delay, SearchBackend, SearchClient, SearchOptions};
pub use filters::{load_keyword_filters, run_search, SearchReport};
pub use query::{parse_hits, search_payload, SearchPage};
