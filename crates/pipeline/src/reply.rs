//! Categorization reply micro-format
//!
//! ```text
//! reply    = *( line [CR] LF )
//! line     = category ":" ids
//! category = 1*( any char except ":" )        ; trimmed
//! ids      = *id                             ; trimmed, no separators
//! id       = width( ALPHA / DIGIT )          ; width shared with the codec
//! ```
//!
//! Lines without a colon or with an empty category are ignored. Chunks that
//! do not resolve to a known id are dropped, which also absorbs a truncated
//! final chunk. Parsing never fails.

use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::codec::CompactIds;

/// Category given to keys the model did not place
pub const UNCATEGORIZED: &str = "Uncategorized";

/// One syntactically valid reply line, ids still unresolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyLine<'a> {
    pub category: &'a str,
    pub ids: Vec<String>,
}

/// Split one line into its category and fixed-width id chunks
pub fn parse_line(line: &str, width: usize) -> Option<ReplyLine<'_>> {
    let (category, ids) = line.split_once(':')?;
    let category = category.trim();
    if category.is_empty() || width == 0 {
        return None;
    }

    let symbols: Vec<char> = ids.chars().filter(|c| !c.is_whitespace()).collect();
    let ids: Vec<String> = symbols.chunks(width).map(|chunk| chunk.iter().collect()).collect();

    Some(ReplyLine { category, ids })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CategoryKeys {
    name: String,
    keys: Vec<String>,
    seen: HashSet<String>,
}

/// Category name to keys, in reply order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryMap {
    entries: Vec<CategoryKeys>,

    /// Category name to its position in `entries`
    index: HashMap<String, usize>,
}

impl CategoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key to a category, creating the category on first use
    pub fn insert(&mut self, category: &str, key: impl Into<String>) {
        let position = match self.index.get(category) {
            Some(&position) => position,
            None => {
                self.entries.push(CategoryKeys {
                    name: category.to_string(),
                    ..CategoryKeys::default()
                });
                self.index.insert(category.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };

        let entry = &mut self.entries[position];
        let key = key.into();
        if entry.seen.insert(key.clone()) {
            entry.keys.push(key);
        }
    }

    pub fn get(&self, category: &str) -> Option<&[String]> {
        self.index
            .get(category)
            .map(|&position| self.entries[position].keys.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|entry| (entry.name.as_str(), entry.keys.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Invert into a per-key lookup; a key listed twice keeps its last category
    pub fn lookup(&self) -> CategoryLookup {
        let mut by_key = HashMap::new();
        for entry in &self.entries {
            for key in &entry.keys {
                if let Some(previous) = by_key.insert(key.clone(), entry.name.clone()) {
                    debug!("Location {} moved from '{}' to '{}'", key, previous, entry.name);
                }
            }
        }
        CategoryLookup { by_key }
    }
}

/// Per-key category, defaulting to [`UNCATEGORIZED`]
#[derive(Debug, Clone, Default)]
pub struct CategoryLookup {
    by_key: HashMap<String, String>,
}

impl CategoryLookup {
    pub fn category(&self, key: &str) -> &str {
        self.by_key.get(key).map(String::as_str).unwrap_or(UNCATEGORIZED)
    }
}

/// Parse a raw model reply against the ids sent with the request
pub fn parse_reply(raw: &str, ids: &CompactIds) -> CategoryMap {
    let mut map = CategoryMap::new();

    for line in raw.lines() {
        let Some(parsed) = parse_line(line, ids.width()) else {
            if !line.trim().is_empty() {
                debug!("Ignoring malformed reply line: {}", line);
            }
            continue;
        };

        let keys: Vec<&str> = parsed.ids.iter().filter_map(|id| ids.resolve(id)).collect();
        let dropped = parsed.ids.len() - keys.len();
        if dropped > 0 {
            debug!("Dropped {} unresolved ids under '{}'", dropped, parsed.category);
        }

        for key in keys {
            map.insert(parsed.category, key);
        }
    }

    map
}

/// Write a category map in the reply format
pub fn render_reply(map: &CategoryMap, ids: &CompactIds) -> String {
    let mut out = String::new();
    for (category, keys) in map.iter() {
        out.push_str(category);
        out.push(':');
        for key in keys {
            if let Some(id) = ids.id_for_key(key) {
                out.push_str(id);
            }
        }
        out.push('\n');
    }
    out
}
