//! Verbatim check of rendered excerpts against their source paragraphs
//!
//! Each `{{q|EXCERPT|KEY|REFERENCE}}` line is looked up by key in the raw
//! corpus. An excerpt that is not a substring of its paragraph, after tags
//! and whitespace are normalized on both sides, gets a `[Warning] ` prefix in
//! place. Flagged lines are never checked again, so the pass is idempotent.

use quotequest_common::{QuoteError, Result};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use crate::layout::KeywordLayout;
use crate::records::{write_atomic, Partition, Record};

pub const WARNING_MARKER: &str = "[Warning] ";

static QUOTE_TEMPLATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{q\|(.*?)\|(.*?)\|(.*?)\}\}").unwrap());

static MARKUP_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</?[A-Za-z][^<>]*>").unwrap());

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Replace markup tags with `tag_replacement` and collapse whitespace
fn normalize_with(text: &str, tag_replacement: &str) -> String {
    let untagged = MARKUP_TAG.replace_all(text, tag_replacement);
    WHITESPACE.replace_all(&untagged, " ").trim().to_string()
}

fn trim_ellipses(text: &str) -> &str {
    text.trim_matches(|c: char| c == '.' || c == '…' || c.is_whitespace())
}

/// Replace markup tags with a space and collapse whitespace
pub fn normalize_text(text: &str) -> String {
    normalize_with(text, " ")
}

/// [`normalize_text`] plus removal of leading/trailing ellipses
pub fn normalize_excerpt(excerpt: &str) -> String {
    trim_ellipses(&normalize_text(excerpt)).to_string()
}

/// Whether an excerpt occurs verbatim in the original, modulo markup and whitespace
///
/// Whitespace is only ever collapsed, never removed, so shifted word
/// boundaries still count as a mismatch.
pub fn is_verbatim(excerpt: &str, original: &str) -> bool {
    if normalize_text(original).contains(&normalize_excerpt(excerpt)) {
        return true;
    }

    // Tags inside a word (`Bahá<i>'</i>u'lláh`) vanish instead of splitting it
    let excerpt = trim_ellipses(&normalize_with(excerpt, "")).to_string();
    normalize_with(original, "").contains(&excerpt)
}

/// Counters for one validated text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationCounts {
    /// Quote templates seen
    pub quotes: usize,
    pub warnings_added: usize,

    /// Lines skipped because they already carry the marker
    pub already_flagged: usize,

    /// Lines whose key has no original
    pub unresolved: usize,
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub path: PathBuf,
    pub counts: ValidationCounts,
}

/// Validate rendered text, returning the annotated text and its counters
///
/// Line endings and everything outside the excerpt field are preserved.
pub fn validate_text(text: &str, originals: &HashMap<String, String>) -> (String, ValidationCounts) {
    let mut counts = ValidationCounts::default();
    let mut out = String::with_capacity(text.len() + 64);

    for line in text.split_inclusive('\n') {
        let Some(caps) = QUOTE_TEMPLATE.captures(line) else {
            out.push_str(line);
            continue;
        };
        counts.quotes += 1;

        let excerpt = caps.get(1).map_or("", |m| m.as_str());
        let excerpt_start = caps.get(1).map_or(0, |m| m.start());
        let key = caps.get(2).map_or("", |m| m.as_str()).trim();

        if excerpt.trim_start().starts_with(WARNING_MARKER.trim_end()) {
            counts.already_flagged += 1;
            out.push_str(line);
            continue;
        }

        let original = match originals.get(key) {
            Some(original) if !original.is_empty() => original,
            _ => {
                warn!("No original text found for location '{}'. Skipping", key);
                counts.unresolved += 1;
                out.push_str(line);
                continue;
            }
        };

        if is_verbatim(excerpt, original) {
            out.push_str(line);
            continue;
        }

        debug!("Mismatch for location {}: {}", key, excerpt);
        counts.warnings_added += 1;
        out.push_str(&line[..excerpt_start]);
        out.push_str(WARNING_MARKER);
        out.push_str(&line[excerpt_start..]);
    }

    (out, counts)
}

/// Validate one rendered file in place; it is rewritten only if a warning was added
pub fn validate_file(path: &Path, originals: &HashMap<String, String>) -> Result<ValidationReport> {
    info!("Validating {}", path.display());

    let text = fs::read_to_string(path)
        .map_err(|e| QuoteError::file_system(format!("Failed to read {}: {}", path.display(), e)))?;

    let (annotated, counts) = validate_text(&text, originals);

    if counts.warnings_added > 0 {
        info!(
            "Found {} issues out of {} quotes; updating file",
            counts.warnings_added, counts.quotes
        );
        write_atomic(path, &annotated)?;
    } else {
        info!("All {} checked quotes passed validation", counts.quotes - counts.unresolved - counts.already_flagged);
    }

    Ok(ValidationReport {
        path: path.to_path_buf(),
        counts,
    })
}

/// Map every location in the raw corpus to its paragraph
pub fn load_originals(layout: &KeywordLayout) -> Result<HashMap<String, String>> {
    let paths = layout.raw_partitions()?;
    if paths.is_empty() {
        return Err(QuoteError::not_found(format!(
            "No original source files in {}",
            layout.dir().display()
        )));
    }

    let mut originals = HashMap::new();
    for path in &paths {
        if fs::metadata(path)?.len() == 0 {
            warn!("Skipping empty source file: {}", path.display());
            continue;
        }

        let partition = Partition::<Record>::load(path)?;
        for record in partition.records {
            originals.insert(record.key, record.text);
        }
    }

    if originals.is_empty() {
        return Err(QuoteError::not_found(format!(
            "No original quotes in {}",
            layout.dir().display()
        )));
    }

    info!("Loaded {} original quotes", originals.len());
    Ok(originals)
}

/// Validate every rendered file for the keyword
pub fn validate(layout: &KeywordLayout) -> Result<Vec<ValidationReport>> {
    let originals = load_originals(layout)?;

    let files = layout.rendered_files()?;
    if files.is_empty() {
        return Err(QuoteError::not_found(format!(
            "No final_output_*{}.txt files in {}",
            layout.keyword(),
            layout.output_dir().display()
        )));
    }

    files.iter().map(|path| validate_file(path, &originals)).collect()
}
