use quotequest_common::{QuoteError, Result};
use quotequest_llm::ModelKind;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

use crate::layout::KeywordLayout;
use crate::records::{write_atomic, FinalRecord, Partition};

/// Citation abbreviations by source key
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("days-remembrance", "DR"),
    ("epistle-son-wolf", "ESW"),
    ("gems-divine-mysteries", "GDM"),
    ("gleanings-writings-bahaullah", "GWB"),
    ("hidden-words", "HW"),
    ("kitab-i-aqdas", "KA"),
    ("kitab-i-iqan", "KI"),
    ("prayers-meditations-bahaullah", "PM"),
    ("call-divine-beloved", "CDB"),
    ("summons-lord-hosts", "SLH"),
    ("tabernacle-unity", "TU"),
    ("tablets-bahaullah", "TB"),
    ("additional-prayers-revealed-bahaullah", "APB"),
    ("additional-tablets-extracts-from-tablets-revealed-bahaullah", "ATB"),
    ("selections-writings-bab", "SWB"),
    ("memorials-faithful", "MF"),
    ("light-of-the-world", "LW"),
    ("paris-talks", "PT"),
    ("promulgation-universal-peace", "PUP"),
    ("secret-divine-civilization", "SDC"),
    ("selections-writings-abdul-baha", "SWAB"),
    ("some-answered-questions", "SAQ"),
    ("tablet-auguste-forel", "TAF"),
    ("tablets-divine-plan", "TDP"),
    ("tablets-hague-abdul-baha", "TTH"),
    ("travelers-narrative", "TN"),
    ("twelve-table-talks-abdul-baha", "TTT"),
    ("will-testament-abdul-baha", "WT"),
    ("prayers-abdul-baha", "TPR"),
    ("additional-tablets-extracts-talks-abdul-baha", "ATET"),
    ("additional-prayers-revealed-abdul-baha", "APR"),
];

pub fn abbreviation(source_key: &str) -> Option<&'static str> {
    ABBREVIATIONS
        .iter()
        .find(|(key, _)| *key == source_key)
        .map(|(_, abbr)| *abbr)
}

/// `{{q|excerpt|location|reference}}`
pub fn quote_template(excerpt: &str, key: &str, reference: &str) -> String {
    format!("{{{{q|{}|{}|{}}}}}", excerpt, key, reference)
}

/// Render sections from template lines grouped by category
pub fn render_sections(sections: &BTreeMap<String, Vec<String>>) -> String {
    let mut out = String::new();
    for (category, lines) in sections {
        let mut lines = lines.clone();
        lines.sort();

        out.push_str(&format!("== {} ==\n", category));
        for line in lines {
            out.push_str(&line);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

/// Render every final file of `source_model` into `output_path`
pub fn render(layout: &KeywordLayout, source_model: ModelKind, output_path: &Path) -> Result<usize> {
    info!("Formatting wiki output to {}", output_path.display());

    let files = layout.final_partitions(source_model)?;
    if files.is_empty() {
        return Err(QuoteError::not_found(format!(
            "No {} final files in {}",
            source_model,
            layout.dir().display()
        )));
    }
    info!("Found {} files to format", files.len());

    let mut sections: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut count = 0;

    for path in &files {
        let partition = Partition::<FinalRecord>::load(path)?;
        let source_key = layout.source_key(&partition.name);
        let reference = abbreviation(&source_key);
        if reference.is_none() {
            warn!("No abbreviation found for '{}' in {}", source_key, partition.name);
        }

        for record in partition.records {
            let line = quote_template(&record.excerpt, &record.key, reference.unwrap_or(&record.key));
            sections.entry(record.category).or_default().push(line);
            count += 1;
        }
    }

    write_atomic(output_path, &render_sections(&sections))?;
    info!("Wrote {} quotes in {} sections to {}", count, sections.len(), output_path.display());

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{write_records, Record};
    use std::fs;
    use tempfile::TempDir;

    fn final_record(category: &str, key: &str, excerpt: &str) -> FinalRecord {
        Record::new(key, "paragraph").categorize(category).into_final(excerpt)
    }

    #[test]
    fn test_abbreviations() {
        assert_eq!(abbreviation("kitab-i-aqdas"), Some("KA"));
        assert_eq!(abbreviation("hidden-words"), Some("HW"));
        assert_eq!(abbreviation("paris-talks"), Some("PT"));
        assert_eq!(abbreviation("unknown-book"), None);
        assert_eq!(ABBREVIATIONS.len(), 31);
    }

    #[test]
    fn test_quote_template() {
        assert_eq!(quote_template("justice and mercy", "ka#12", "KA"), "{{q|justice and mercy|ka#12|KA}}");
    }

    #[test]
    fn test_render_groups_and_sorts() {
        let dir = TempDir::new().unwrap();
        let layout = KeywordLayout::new("justice", dir.path(), dir.path());
        write_records(
            &dir.path().join("justice_kitab-i-aqdas_final_for_wiki-ChatGPT.txt"),
            &[
                final_record("Unity", "ka#2", "zeal for unity"),
                final_record("Justice", "ka#1", "the balance of justice"),
            ],
        )
        .unwrap();
        write_records(
            &dir.path().join("justice_mystery-book_final_for_wiki-ChatGPT.txt"),
            &[final_record("Justice", "mb#9", "a just ruler")],
        )
        .unwrap();
        write_records(
            &dir.path().join("justice_hidden-words_final_for_wiki-Gemini.txt"),
            &[final_record("Ignored", "hw#1", "other model")],
        )
        .unwrap();

        let output = dir.path().join("final_output_justice.txt");
        assert_eq!(render(&layout, ModelKind::ChatGpt, &output).unwrap(), 3);

        let expected = "== Justice ==\n\
                        {{q|a just ruler|mb#9|mb#9}}\n\
                        {{q|the balance of justice|ka#1|KA}}\n\
                        \n\
                        == Unity ==\n\
                        {{q|zeal for unity|ka#2|KA}}\n\
                        \n";
        assert_eq!(fs::read_to_string(&output).unwrap(), expected);
    }

    #[test]
    fn test_render_without_finals() {
        let dir = TempDir::new().unwrap();
        let layout = KeywordLayout::new("justice", dir.path(), dir.path());
        let err = render(&layout, ModelKind::Gemini, &dir.path().join("out.txt")).unwrap_err();
        assert!(matches!(err, QuoteError::NotFound(_)));
    }
}
