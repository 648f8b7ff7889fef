//! Stage file naming and discovery
//!
//! Filename suffixes are the only record of which stage produced a file:
//!
//! | stage | name |
//! |---|---|
//! | raw | `<keyword>_<filter>.txt` |
//! | categorized | `<keyword>_<filter>_categorized-<Model>.txt` |
//! | final | `<keyword>_<filter>_final_for_wiki-<Model>.txt` |
//! | rendered | `final_output[_<Model>]_<keyword>.txt` (output directory) |

use quotequest_common::{AppConfig, QuoteError, Result};
use quotequest_llm::ModelKind;
use std::fs;
use std::path::{Path, PathBuf};

const CATEGORIZED_SUFFIX: &str = "_categorized-";
const FINAL_SUFFIX: &str = "_final_for_wiki-";
const RENDERED_PREFIX: &str = "final_output_";

/// Markers of derived (non-raw) artifacts
const DERIVED_MARKERS: [&str; 4] = ["_categorized", "_final", "_distilled", "_organized"];

/// Where one keyword's artifacts live
#[derive(Debug, Clone)]
pub struct KeywordLayout {
    keyword: String,
    dir: PathBuf,
    output_dir: PathBuf,
}

impl KeywordLayout {
    pub fn new(keyword: impl Into<String>, dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            keyword: keyword.into(),
            dir: dir.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn from_config(config: &AppConfig, keyword: &str) -> Self {
        Self::new(keyword, config.keyword_dir(keyword), config.output_dir.clone())
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Raw partition file for one search filter
    pub fn raw_path(&self, filter: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.txt", self.keyword, filter))
    }

    pub fn is_raw_filename(&self, name: &str) -> bool {
        name.starts_with(&format!("{}_", self.keyword))
            && name.ends_with(".txt")
            && !DERIVED_MARKERS.iter().any(|m| name.contains(m))
    }

    /// Raw partitions, sorted by name
    pub fn raw_partitions(&self) -> Result<Vec<PathBuf>> {
        list_files(&self.dir, |name| self.is_raw_filename(name))
    }

    pub fn categorized_filename(raw_name: &str, model: ModelKind) -> String {
        let stem = raw_name.strip_suffix(".txt").unwrap_or(raw_name);
        format!("{}{}{}.txt", stem, CATEGORIZED_SUFFIX, model.tag())
    }

    pub fn categorized_partitions(&self, model: ModelKind) -> Result<Vec<PathBuf>> {
        let suffix = format!("{}{}.txt", CATEGORIZED_SUFFIX, model.tag());
        list_files(&self.dir, |name| name.ends_with(&suffix))
    }

    /// Final filename derived from a categorized one
    pub fn final_filename(categorized_name: &str, model: ModelKind) -> String {
        let base = match categorized_name.rfind(CATEGORIZED_SUFFIX) {
            Some(idx) => &categorized_name[..idx],
            None => categorized_name.strip_suffix(".txt").unwrap_or(categorized_name),
        };
        format!("{}{}{}.txt", base, FINAL_SUFFIX, model.tag())
    }

    pub fn final_partitions(&self, model: ModelKind) -> Result<Vec<PathBuf>> {
        let suffix = format!("{}{}.txt", FINAL_SUFFIX, model.tag());
        list_files(&self.dir, |name| name.ends_with(&suffix))
    }

    /// Source key (`kitab-i-aqdas`) of a final file, used for citation lookup
    pub fn source_key(&self, final_name: &str) -> String {
        let prefix = format!("{}_", self.keyword);
        let name = final_name.strip_prefix(&prefix).unwrap_or(final_name);

        let lower = name.to_ascii_lowercase();
        match lower.rfind(FINAL_SUFFIX) {
            Some(idx) if lower.ends_with(".txt") => name[..idx].to_string(),
            _ => name.to_string(),
        }
    }

    /// Rendered wiki file; `None` is the default pipeline output
    pub fn rendered_path(&self, model: Option<ModelKind>) -> PathBuf {
        let name = match model {
            Some(model) => format!("{}{}_{}.txt", RENDERED_PREFIX, model.tag(), self.keyword),
            None => format!("{}{}.txt", RENDERED_PREFIX, self.keyword),
        };
        self.output_dir.join(name)
    }

    /// Every rendered file for this keyword, sorted by name
    pub fn rendered_files(&self) -> Result<Vec<PathBuf>> {
        let suffix = format!("_{}.txt", self.keyword);
        list_files(&self.output_dir, |name| {
            name.starts_with(RENDERED_PREFIX) && name.ends_with(&suffix)
        })
    }

    /// Categorization prompt as sent
    pub fn payload_path(&self, model: ModelKind) -> PathBuf {
        self.dir.join(format!("api_request_payload_{}.txt", model.audit_name()))
    }

    /// Categorization reply as received
    pub fn reply_path(&self, model: ModelKind) -> PathBuf {
        self.dir.join(format!("api_request_return_{}.txt", model.audit_name()))
    }
}

/// Regular files in `dir` whose name matches, sorted by name
fn list_files(dir: &Path, matches: impl Fn(&str) -> bool) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(QuoteError::not_found(format!("Directory {}", dir.display())));
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if matches(name) {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}
