use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use quotequest_common::{QuoteError, Result};
use quotequest_llm::{Distiller, ModelKind};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::layout::KeywordLayout;
use crate::records::{write_records, CategorizedRecord, FinalRecord, Partition};

/// Distillation run options
#[derive(Debug, Clone)]
pub struct DistillOptions {
    /// Paragraphs in flight at once
    pub concurrency: usize,

    /// Draw a progress bar on stderr
    pub show_progress: bool,
}

impl Default for DistillOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            show_progress: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DistillReport {
    pub partitions: usize,
    pub records: usize,

    /// Records carrying the failure sentinel
    pub failed: usize,

    pub outputs: Vec<PathBuf>,
}

impl DistillReport {
    fn absorb(&mut self, other: DistillReport) {
        self.partitions += other.partitions;
        self.records += other.records;
        self.failed += other.failed;
        self.outputs.extend(other.outputs);
    }
}

/// Distill every categorized partition produced by `source`
///
/// Partitions are independent; one failed paragraph never aborts the batch.
pub async fn distill(
    layout: &KeywordLayout,
    distiller: &Distiller,
    source: ModelKind,
    target: ModelKind,
    options: &DistillOptions,
) -> Result<DistillReport> {
    let inputs = layout.categorized_partitions(source)?;
    if inputs.is_empty() {
        warn!(
            "No {} categorized files found in {}",
            source,
            layout.dir().display()
        );
        return Ok(DistillReport::default());
    }

    info!(
        "Distilling {} files for '{}' with {}",
        inputs.len(),
        layout.keyword(),
        target
    );

    let mut report = DistillReport::default();
    for path in &inputs {
        let partial = distill_file(path, layout.dir(), layout.keyword(), distiller, target, options).await?;
        report.absorb(partial);
    }

    info!(
        "Distilled {} paragraphs in {} files ({} failed)",
        report.records, report.partitions, report.failed
    );
    Ok(report)
}

/// Distill a single categorized partition into `out_dir`
pub async fn distill_file(
    path: &Path,
    out_dir: &Path,
    keyword: &str,
    distiller: &Distiller,
    target: ModelKind,
    options: &DistillOptions,
) -> Result<DistillReport> {
    if !path.is_file() {
        return Err(QuoteError::not_found(format!("Categorized file {}", path.display())));
    }

    let partition = Partition::<CategorizedRecord>::load(path)?;
    info!("Processing {} ({} paragraphs)", partition.name, partition.records.len());

    let progress = progress_bar(partition.records.len(), &partition.name, options.show_progress);
    let finals = distill_records(partition.records, keyword, distiller, options.concurrency, &progress).await;
    progress.finish_and_clear();

    let sentinel = distiller.failure_sentinel();
    let failed = finals.iter().filter(|r| r.excerpt == sentinel).count();

    let output = out_dir.join(KeywordLayout::final_filename(&partition.name, target));
    write_records(&output, &finals)?;
    info!("  -> Saved final output to {}", output.display());

    Ok(DistillReport {
        partitions: 1,
        records: finals.len(),
        failed,
        outputs: vec![output],
    })
}

/// Distill records with at most `concurrency` calls in flight, keeping input order
pub async fn distill_records(
    records: Vec<CategorizedRecord>,
    keyword: &str,
    distiller: &Distiller,
    concurrency: usize,
    progress: &ProgressBar,
) -> Vec<FinalRecord> {
    stream::iter(records)
        .map(|record| async move {
            let excerpt = distiller.distill(&record.text, keyword).await;
            progress.inc(1);
            record.into_final(excerpt)
        })
        .buffered(concurrency.max(1))
        .collect()
        .await
}

fn progress_bar(len: usize, name: &str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(name.to_string());
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Record;
    use async_trait::async_trait;
    use quotequest_llm::LlmClient;
    use std::fs;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Returns the first five words of the paragraph, fails on "FAIL"
    struct FirstWords;

    #[async_trait]
    impl LlmClient for FirstWords {
        async fn generate(&self, prompt: &str) -> Result<String> {
            if prompt.contains("FAIL") {
                return Err(QuoteError::external_service("model overloaded"));
            }
            let paragraph = prompt
                .rsplit("Paragraph:")
                .next()
                .unwrap_or_default()
                .trim()
                .trim_end_matches("Excerpt:")
                .trim()
                .trim_matches('"');
            // Later paragraphs answer sooner, so ordering is exercised
            let delay = 30u64.saturating_sub(paragraph.len() as u64);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(format!(
                " {} \n",
                paragraph.split_whitespace().take(5).collect::<Vec<_>>().join(" ")
            ))
        }

        fn model(&self) -> &str {
            "first-words"
        }
    }

    fn distiller() -> Distiller {
        Distiller::new(Arc::new(FirstWords), "ChatGPT").with_retries(2, Duration::ZERO)
    }

    fn categorized(key: &str, text: &str) -> CategorizedRecord {
        Record::new(key, text).categorize("Justice")
    }

    #[tokio::test]
    async fn test_order_preserved_under_concurrency() {
        let records: Vec<_> = (0..12)
            .map(|i| categorized(&format!("loc#{}", i), &"word ".repeat(i + 1)))
            .collect();
        let expected: Vec<_> = records.iter().map(|r| r.key.clone()).collect();

        let finals = distill_records(records, "justice", &distiller(), 4, &ProgressBar::hidden()).await;
        let keys: Vec<_> = finals.iter().map(|r| r.key.clone()).collect();
        assert_eq!(keys, expected);
        assert_eq!(finals[0].excerpt, "word");
        assert_eq!(finals[0].category, "Justice");
    }

    #[tokio::test]
    async fn test_failed_paragraph_keeps_sentinel() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("justice_hidden-words_categorized-Gemini.txt");
        write_records(
            &path,
            &[
                categorized("hw#1", "O Son of Being! Walk in My statutes for love of Me"),
                categorized("hw#2", "FAIL this one"),
            ],
        )
        .unwrap();

        let d = distiller();
        let report = distill_file(&path, dir.path(), "justice", &d, ModelKind::ChatGpt, &DistillOptions::default())
            .await
            .unwrap();
        assert_eq!(report.records, 2);
        assert_eq!(report.failed, 1);

        let output = dir.path().join("justice_hidden-words_final_for_wiki-ChatGPT.txt");
        assert_eq!(report.outputs, vec![output.clone()]);

        let finals = Partition::<FinalRecord>::load(&output).unwrap().records;
        assert_eq!(finals[0].excerpt, "O Son of Being! Walk");
        assert_eq!(finals[1].excerpt, "[[ChatGPT distillation failed]]");
        assert_eq!(finals[1].key, "hw#2");
    }

    #[tokio::test]
    async fn test_directory_mode_uses_source_model_files() {
        let dir = TempDir::new().unwrap();
        let layout = KeywordLayout::new("justice", dir.path(), dir.path());
        write_records(
            &dir.path().join("justice_a_categorized-Gemini.txt"),
            &[categorized("a#1", "the balance of justice and mercy")],
        )
        .unwrap();
        write_records(
            &dir.path().join("justice_b_categorized-ChatGPT.txt"),
            &[categorized("b#1", "ignored by this run")],
        )
        .unwrap();
        fs::write(dir.path().join("justice_a.txt"), "[]").unwrap();

        let report = distill(&layout, &distiller(), ModelKind::Gemini, ModelKind::ChatGpt, &DistillOptions::default())
            .await
            .unwrap();
        assert_eq!(report.partitions, 1);
        assert!(dir.path().join("justice_a_final_for_wiki-ChatGPT.txt").exists());
        assert!(!dir.path().join("justice_b_final_for_wiki-ChatGPT.txt").exists());
    }

    #[tokio::test]
    async fn test_missing_single_file() {
        let dir = TempDir::new().unwrap();
        let err = distill_file(
            &dir.path().join("absent.txt"),
            dir.path(),
            "justice",
            &distiller(),
            ModelKind::ChatGpt,
            &DistillOptions::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, QuoteError::NotFound(_)));
    }
}
