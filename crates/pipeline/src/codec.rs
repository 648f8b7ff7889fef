//! Compact identifiers for categorization requests
//!
//! Every record in a corpus gets a dense index `0..N-1` written in base 62
//! (`0-9`, `a-z`, `A-Z`) and left-padded to a shared width, so a model can
//! list them back to back without separators.

use quotequest_common::{QuoteError, Result};
use std::collections::HashMap;

/// Digit symbols in value order
pub const ALPHABET: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

const BASE: usize = ALPHABET.len();

/// Base-62 representation of `index`, left-padded with `0` to `width` chars
pub fn encode(index: usize, width: usize) -> Result<String> {
    let mut digits = Vec::with_capacity(width);
    let mut n = index;
    while n > 0 {
        digits.push(ALPHABET[n % BASE]);
        n /= BASE;
    }

    if digits.len() > width {
        return Err(QuoteError::OutOfRange { index, width });
    }

    digits.resize(width, ALPHABET[0]);
    Ok(digits.iter().rev().map(|&b| char::from(b)).collect())
}

/// Number of base-62 digits needed to write `max_index` (at least 1)
pub fn digits_for(max_index: usize) -> usize {
    let mut width = 1;
    let mut n = max_index / BASE;
    while n > 0 {
        width += 1;
        n /= BASE;
    }
    width
}

/// Identifier width for a corpus of `count` records
pub fn width_for(count: usize) -> usize {
    digits_for(count.saturating_sub(1))
}

/// Bijection between compact ids and record keys for one categorization call
#[derive(Debug, Clone, Default)]
pub struct CompactIds {
    width: usize,
    ids: Vec<String>,
    keys: Vec<String>,
    index_by_id: HashMap<String, usize>,
    index_by_key: HashMap<String, usize>,
}

impl CompactIds {
    /// Assign ids `0..N-1` in iteration order; duplicate keys are malformed input
    pub fn assign<I, S>(keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        let width = width_for(keys.len());

        let mut ids = Vec::with_capacity(keys.len());
        let mut index_by_id = HashMap::with_capacity(keys.len());
        let mut index_by_key = HashMap::with_capacity(keys.len());

        for (index, key) in keys.iter().enumerate() {
            if index_by_key.insert(key.clone(), index).is_some() {
                return Err(QuoteError::malformed_input(format!(
                    "Location '{}' appears more than once in the corpus",
                    key
                )));
            }
            let id = encode(index, width)?;
            index_by_id.insert(id.clone(), index);
            ids.push(id);
        }

        Ok(Self {
            width,
            ids,
            keys,
            index_by_id,
            index_by_key,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Id assigned to the record at `index`
    pub fn id(&self, index: usize) -> Option<&str> {
        self.ids.get(index).map(String::as_str)
    }

    /// Key behind an id
    pub fn resolve(&self, id: &str) -> Option<&str> {
        self.index_by_id.get(id).map(|&i| self.keys[i].as_str())
    }

    /// Id assigned to a key
    pub fn id_for_key(&self, key: &str) -> Option<&str> {
        self.index_by_key.get(key).map(|&i| self.ids[i].as_str())
    }

    /// `(id, key)` pairs in assignment order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.ids.iter().map(String::as_str).zip(self.keys.iter().map(String::as_str))
    }
}
