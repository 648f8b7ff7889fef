use quotequest_common::{DelayRange, QuoteError, Result};
use quotequest_pipeline::{write_records, KeywordLayout};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::client::{random_delay, SearchBackend};

/// Keyword filters, one per non-blank line
pub fn load_keyword_filters(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .map_err(|e| QuoteError::not_found(format!("Keyword filter file {}: {}", path.display(), e)))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

#[derive(Debug, Clone, Default)]
pub struct SearchReport {
    pub filters: usize,
    pub records: usize,

    /// Raw partitions written; filters without hits write nothing
    pub outputs: Vec<PathBuf>,
}

/// Search the keyword under every filter, writing `<keyword>_<filter>.txt` for each non-empty result
pub async fn run_search(
    backend: &dyn SearchBackend,
    layout: &KeywordLayout,
    filters: &[String],
    filter_delay: DelayRange,
) -> Result<SearchReport> {
    fs::create_dir_all(layout.dir())?;
    let mut report = SearchReport::default();

    for (i, filter) in filters.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(random_delay(&filter_delay)).await;
        }

        info!("Searching for '{}' with filter '{}'", layout.keyword(), filter);
        let records = backend.search(layout.keyword(), filter).await?;
        report.filters += 1;

        if records.is_empty() {
            continue;
        }

        let path = layout.raw_path(filter);
        write_records(&path, &records)?;
        info!("  -> Saved {} results to {}", records.len(), path.display());
        report.records += records.len();
        report.outputs.push(path);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quotequest_pipeline::{Partition, Record};
    use tempfile::TempDir;

    /// Two hits for "hidden-words", none otherwise
    struct FakeBackend;

    #[async_trait]
    impl SearchBackend for FakeBackend {
        async fn search(&self, query: &str, filter: &str) -> Result<Vec<Record>> {
            if filter != "hidden-words" {
                return Ok(Vec::new());
            }
            Ok(vec![
                Record::new("hw#1", format!("{} one", query)).with_title("The Hidden Words"),
                Record::new("hw#2", format!("{} two", query)),
            ])
        }
    }

    #[test]
    fn test_load_keyword_filters() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keyword_filter.txt");
        fs::write(&path, "hidden-words\n\n  kitab-i-aqdas  \r\n").unwrap();
        assert_eq!(load_keyword_filters(&path).unwrap(), vec!["hidden-words", "kitab-i-aqdas"]);
    }

    #[test]
    fn test_missing_filter_file() {
        let dir = TempDir::new().unwrap();
        let err = load_keyword_filters(&dir.path().join("absent.txt")).unwrap_err();
        assert!(matches!(err, QuoteError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_run_search_writes_non_empty_results() {
        let dir = TempDir::new().unwrap();
        let layout = KeywordLayout::new("unity", dir.path().join("unity"), dir.path());
        let filters = vec!["hidden-words".to_string(), "paris-talks".to_string()];

        let report = run_search(&FakeBackend, &layout, &filters, DelayRange::zero()).await.unwrap();
        assert_eq!(report.filters, 2);
        assert_eq!(report.records, 2);
        assert_eq!(report.outputs, vec![layout.raw_path("hidden-words")]);
        assert!(!layout.raw_path("paris-talks").exists());

        let partition = Partition::<Record>::load(&layout.raw_path("hidden-words")).unwrap();
        assert_eq!(partition.records[0].text, "unity one");
        assert_eq!(partition.records[0].title.as_deref(), Some("The Hidden Words"));
    }
}
