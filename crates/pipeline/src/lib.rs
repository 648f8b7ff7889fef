//! QuoteQuest pipeline stages
//!
//! Categorization with compact ids, distillation, wiki rendering and
//! verbatim validation over per-keyword partition files

mod categorize;
mod codec;
mod distill;
mod layout;
mod records;
mod render;
mod reply;
mod validate;

pub use categorize::{categorize, check_unique_locations, CategorizeReport};
pub use codec::{digits_for, encode, width_for, CompactIds, ALPHABET};
pub use distill::{distill, distill_file, distill_records, DistillOptions, DistillReport};
pub use layout::KeywordLayout;
pub use records::{write_atomic, write_records, CategorizedRecord, FinalRecord, Keyed, Partition, Record};
pub use render::{abbreviation, quote_template, render, render_sections};
pub use reply::{parse_line, parse_reply, render_reply, CategoryLookup, CategoryMap, ReplyLine, UNCATEGORIZED};
pub use validate::{
    is_verbatim, load_originals, normalize_excerpt, normalize_text, validate, validate_file, validate_text,
    ValidationCounts, ValidationReport, WARNING_MARKER,
};
