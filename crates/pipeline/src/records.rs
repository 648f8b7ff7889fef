//! On-disk record types and partition files
//!
//! Every stage reads and writes a UTF-8 JSON array of objects. Field names
//! are fixed by the file format (`title`, `location`, `quote`); the Rust
//! names say what each field means at that stage.

use quotequest_common::{QuoteError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Anything addressed by a corpus location key
pub trait Keyed {
    fn key(&self) -> &str;
}

/// Raw search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Source title reported by the search service
    #[serde(default)]
    pub title: Option<String>,

    /// Corpus location, unique within a keyword's corpus
    #[serde(rename = "location")]
    pub key: String,

    /// Full paragraph
    #[serde(rename = "quote")]
    pub text: String,
}

/// Paragraph annotated with its theme
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorizedRecord {
    #[serde(rename = "title")]
    pub category: String,

    #[serde(rename = "location")]
    pub key: String,

    #[serde(rename = "quote")]
    pub text: String,
}

/// Distilled excerpt ready for rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalRecord {
    #[serde(rename = "title")]
    pub category: String,

    #[serde(rename = "location")]
    pub key: String,

    #[serde(rename = "quote")]
    pub excerpt: String,
}

impl Record {
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: None,
            key: key.into(),
            text: text.into(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Attach a category, keeping the full paragraph
    pub fn categorize(&self, category: impl Into<String>) -> CategorizedRecord {
        CategorizedRecord {
            category: category.into(),
            key: self.key.clone(),
            text: self.text.clone(),
        }
    }
}

impl CategorizedRecord {
    pub fn into_final(self, excerpt: impl Into<String>) -> FinalRecord {
        FinalRecord {
            category: self.category,
            key: self.key,
            excerpt: excerpt.into(),
        }
    }
}

impl Keyed for Record {
    fn key(&self) -> &str {
        &self.key
    }
}

impl Keyed for CategorizedRecord {
    fn key(&self) -> &str {
        &self.key
    }
}

impl Keyed for FinalRecord {
    fn key(&self) -> &str {
        &self.key
    }
}

/// One source file's worth of records
#[derive(Debug, Clone)]
pub struct Partition<T> {
    /// File name, used to derive the next stage's file name
    pub name: String,

    pub path: PathBuf,

    pub records: Vec<T>,
}

impl<T: DeserializeOwned + Keyed> Partition<T> {
    /// Load and validate a partition file
    pub fn load(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| QuoteError::invalid_input(format!("Invalid partition path: {}", path.display())))?
            .to_string();

        let data = fs::read_to_string(path).map_err(|e| {
            QuoteError::file_system(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let records: Vec<T> = serde_json::from_str(&data).map_err(|e| {
            QuoteError::malformed_input(format!("{} is not a valid record file: {}", name, e))
        })?;

        if let Some(pos) = records.iter().position(|r| r.key().trim().is_empty()) {
            return Err(QuoteError::malformed_input(format!(
                "{}: record {} has an empty location",
                name, pos
            )));
        }

        Ok(Self {
            name,
            path: path.to_path_buf(),
            records,
        })
    }
}

/// Write records as pretty-printed JSON
pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let data = serde_json::to_string_pretty(records)?;
    write_atomic(path, &data)
}

/// Write data to file atomically (temp file + rename)
pub fn write_atomic(path: &Path, data: &str) -> Result<()> {
    let tmp_path = path.with_extension("tmp");

    let mut file = fs::File::create(&tmp_path)?;
    file.write_all(data.as_bytes())?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp_path, path)?;

    Ok(())
}
