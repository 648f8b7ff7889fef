use quotequest_common::{QuoteError, Result};
use quotequest_llm::{Categorizer, IdQuote, ModelKind};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::codec::CompactIds;
use crate::layout::KeywordLayout;
use crate::records::{write_records, Partition, Record};
use crate::reply::{parse_reply, UNCATEGORIZED};

/// Outcome of one categorization run
#[derive(Debug, Clone, Default)]
pub struct CategorizeReport {
    /// Records sent to the model
    pub records: usize,

    /// Width of the compact ids used
    pub id_width: usize,

    /// Distinct categories the reply resolved to
    pub categories: usize,

    /// Records that ended up in "Uncategorized"
    pub uncategorized: usize,

    /// Categorized partition files written
    pub outputs: Vec<PathBuf>,
}

/// Fail on a location that appears twice, naming both partition files
pub fn check_unique_locations(partitions: &[Partition<Record>]) -> Result<()> {
    let mut seen: HashMap<&str, &str> = HashMap::new();

    for partition in partitions {
        for record in &partition.records {
            if let Some(first) = seen.insert(record.key.as_str(), partition.name.as_str()) {
                return Err(QuoteError::malformed_input(format!(
                    "Location '{}' appears in both {} and {}",
                    record.key, first, partition.name
                )));
            }
        }
    }

    Ok(())
}

/// Categorize every raw partition of a keyword in one model call
///
/// Any unreadable partition aborts the run before the model is called, since
/// the compact ids span the whole corpus.
pub async fn categorize(
    layout: &KeywordLayout,
    categorizer: &Categorizer,
    model: ModelKind,
) -> Result<CategorizeReport> {
    info!("Categorizing '{}' with {} ({})", layout.keyword(), model, categorizer.model());

    let partitions = layout
        .raw_partitions()?
        .iter()
        .map(|path| Partition::<Record>::load(path))
        .collect::<Result<Vec<_>>>()?;

    let records: Vec<&Record> = partitions.iter().flat_map(|p| p.records.iter()).collect();
    if records.is_empty() {
        warn!("No quotes found to categorize in {}", layout.dir().display());
        return Ok(CategorizeReport::default());
    }

    check_unique_locations(&partitions)?;
    let ids = CompactIds::assign(records.iter().map(|r| r.key.as_str()))?;
    info!(
        "Aggregated {} paragraphs from {} files; ids are {} chars wide",
        ids.len(),
        partitions.len(),
        ids.width()
    );

    let quotes: Vec<IdQuote> = ids
        .iter()
        .zip(&records)
        .map(|((id, _), record)| IdQuote::new(id, record.text.as_str()))
        .collect();

    let prompt = categorizer.prompt(layout.keyword(), &quotes)?;
    let payload_path = layout.payload_path(model);
    fs::write(&payload_path, &prompt)?;
    info!("Saved request payload to {}", payload_path.display());

    let reply = categorizer.send(&prompt).await?;

    let reply_path = layout.reply_path(model);
    fs::write(&reply_path, &reply)?;
    info!("Saved raw model output to {}", reply_path.display());

    let category_map = parse_reply(&reply, &ids);
    let lookup = category_map.lookup();

    let mut report = CategorizeReport {
        records: ids.len(),
        id_width: ids.width(),
        categories: category_map.len(),
        ..Default::default()
    };

    for partition in &partitions {
        let categorized: Vec<_> = partition
            .records
            .iter()
            .map(|record| record.categorize(lookup.category(&record.key)))
            .collect();

        report.uncategorized += categorized
            .iter()
            .filter(|r| r.category == UNCATEGORIZED)
            .count();

        let output = layout
            .dir()
            .join(KeywordLayout::categorized_filename(&partition.name, model));
        write_records(&output, &categorized)?;
        info!("  -> Saved categorized output to {}", output.display());
        report.outputs.push(output);
    }

    info!(
        "Categorized {} paragraphs into {} categories ({} uncategorized)",
        report.records, report.categories, report.uncategorized
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::CategorizedRecord;
    use async_trait::async_trait;
    use quotequest_llm::LlmClient;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Returns a canned reply and remembers the prompt it was sent
    struct ScriptedClient {
        reply: std::result::Result<String, String>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(message.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone().map_err(QuoteError::external_service)
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    fn write_raw(dir: &std::path::Path, name: &str, records: &[Record]) {
        write_records(&dir.join(name), records).unwrap();
    }

    fn setup() -> (TempDir, KeywordLayout) {
        let dir = TempDir::new().unwrap();
        let layout = KeywordLayout::new("justice", dir.path(), dir.path());
        write_raw(
            dir.path(),
            "justice_hidden-words.txt",
            &[
                Record::new("hw#1", "The best beloved of all things is justice."),
                Record::new("hw#2", "Justice is His servant.").with_title("The Hidden Words"),
            ],
        );
        write_raw(
            dir.path(),
            "justice_kitab-i-aqdas.txt",
            &[Record::new("ka#7", "Tread ye the path of justice.")],
        );
        (dir, layout)
    }

    fn load(path: &std::path::Path) -> Vec<CategorizedRecord> {
        Partition::<CategorizedRecord>::load(path).unwrap().records
    }

    #[tokio::test]
    async fn test_categorize_annotates_every_partition() {
        let (dir, layout) = setup();
        // hidden-words sorts first: hw#1 -> 0, hw#2 -> 1, ka#7 -> 2
        let client = ScriptedClient::replying("Justice as a divine attribute:02\nmalformed\n");
        let categorizer = Categorizer::new(client.clone());

        let report = categorize(&layout, &categorizer, ModelKind::Gemini).await.unwrap();
        assert_eq!(report.records, 3);
        assert_eq!(report.id_width, 1);
        assert_eq!(report.categories, 1);
        assert_eq!(report.uncategorized, 1);
        assert_eq!(report.outputs.len(), 2);

        let hidden = load(&dir.path().join("justice_hidden-words_categorized-Gemini.txt"));
        assert_eq!(hidden[0].category, "Justice as a divine attribute");
        assert_eq!(hidden[1].category, UNCATEGORIZED);
        assert_eq!(hidden[1].text, "Justice is His servant.");

        let aqdas = load(&dir.path().join("justice_kitab-i-aqdas_categorized-Gemini.txt"));
        assert_eq!(aqdas[0].category, "Justice as a divine attribute");

        // Audit trail and untouched sources
        let prompt = &client.prompts.lock().unwrap()[0];
        assert_eq!(fs::read_to_string(layout.payload_path(ModelKind::Gemini)).unwrap(), *prompt);
        assert!(fs::read_to_string(layout.reply_path(ModelKind::Gemini))
            .unwrap()
            .starts_with("Justice as a divine attribute:02"));
        assert_eq!(
            Partition::<Record>::load(&dir.path().join("justice_hidden-words.txt")).unwrap().records.len(),
            2
        );
    }

    #[tokio::test]
    async fn test_external_failure_is_fatal() {
        let (dir, layout) = setup();
        let categorizer = Categorizer::new(ScriptedClient::failing("quota exceeded"));

        let err = categorize(&layout, &categorizer, ModelKind::ChatGpt).await.unwrap_err();
        assert!(matches!(err, QuoteError::ExternalService(_)));
        assert!(!dir.path().join("justice_hidden-words_categorized-ChatGPT.txt").exists());
        assert!(!layout.reply_path(ModelKind::ChatGpt).exists());
    }

    #[tokio::test]
    async fn test_malformed_partition_aborts_before_model_call() {
        let (dir, layout) = setup();
        fs::write(dir.path().join("justice_broken.txt"), "{not json").unwrap();
        let client = ScriptedClient::replying("A:0");
        let categorizer = Categorizer::new(client.clone());

        let err = categorize(&layout, &categorizer, ModelKind::Gemini).await.unwrap_err();
        assert!(matches!(err, QuoteError::MalformedInput(_)));
        assert!(client.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_location_names_both_files() {
        let (dir, layout) = setup();
        write_raw(
            dir.path(),
            "justice_paris-talks.txt",
            &[Record::new("hw#2", "Justice is His servant.")],
        );
        let client = ScriptedClient::replying("A:0");
        let categorizer = Categorizer::new(client.clone());

        let err = categorize(&layout, &categorizer, ModelKind::Gemini).await.unwrap_err();
        assert!(matches!(err, QuoteError::MalformedInput(_)));
        let message = err.to_string();
        assert!(message.contains("'hw#2'"), "{}", message);
        assert!(message.contains("justice_hidden-words.txt"), "{}", message);
        assert!(message.contains("justice_paris-talks.txt"), "{}", message);
        assert!(client.prompts.lock().unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_within_one_file() {
        let partition = Partition {
            name: "justice_hidden-words.txt".to_string(),
            path: PathBuf::from("/tmp/justice_hidden-words.txt"),
            records: vec![Record::new("hw#1", "a"), Record::new("hw#1", "b")],
        };
        let err = check_unique_locations(&[partition]).unwrap_err();
        assert!(err
            .to_string()
            .contains("both justice_hidden-words.txt and justice_hidden-words.txt"));
    }

    #[tokio::test]
    async fn test_empty_corpus_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let layout = KeywordLayout::new("justice", dir.path(), dir.path());
        write_raw(dir.path(), "justice_empty.txt", &[]);
        let client = ScriptedClient::replying("A:0");
        let categorizer = Categorizer::new(client.clone());

        let report = categorize(&layout, &categorizer, ModelKind::Gemini).await.unwrap();
        assert_eq!(report.records, 0);
        assert!(report.outputs.is_empty());
        assert!(client.prompts.lock().unwrap().is_empty());
    }
}
