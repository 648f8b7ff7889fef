use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use quotequest_common::{logger, AppConfig, QuoteError};
use quotequest_llm::{build_client, estimate_tokens, Categorizer, Distiller, ModelKind, ModelRole};
use quotequest_pipeline::{self as pipeline, DistillOptions, KeywordLayout};
use quotequest_search::{load_keyword_filters, run_search, SearchClient, SearchOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::info;

/// Find project root by looking for .git directory
fn find_project_root() -> Option<PathBuf> {
    let mut current_dir = std::env::current_dir().ok()?;

    loop {
        if current_dir.join(".git").exists() {
            return Some(current_dir);
        }

        if !current_dir.pop() {
            break;
        }
    }

    None
}

/// Load .env file from project root
fn load_dotenv_from_project_root() {
    if let Some(root) = find_project_root() {
        let env_path = root.join(".env");
        if env_path.exists() {
            dotenv::from_path(&env_path).ok();
        }
    } else {
        dotenv::dotenv().ok();
    }
}

#[derive(Parser)]
#[command(name = "quotequest")]
#[command(about = "QuoteQuest - thematic quote pages from the Bahá'í writings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search, categorize, distill, format and validate one keyword
    Run {
        keyword: String,

        /// Model that groups paragraphs by theme
        #[arg(long, default_value = "gemini")]
        categorize_model: ModelKind,

        /// Model that shortens paragraphs to excerpts
        #[arg(long, default_value = "chatgpt")]
        distill_model: ModelKind,

        /// Reuse raw search results already in the workspace
        #[arg(long)]
        skip_search: bool,
    },

    /// Search the library once per keyword filter
    Search { keyword: String },

    /// Group the raw search results by theme (ChatGPT and Gemini when no model is given)
    Categorize {
        keyword: String,

        #[arg(long)]
        model: Option<ModelKind>,
    },

    /// Shorten categorized paragraphs to verbatim excerpts
    Distill {
        keyword: String,

        #[arg(long, default_value = "chatgpt")]
        model: ModelKind,

        /// Model whose categorized files are read
        #[arg(long, default_value = "gemini")]
        source_model: ModelKind,

        /// Process a single categorized file in the keyword directory
        #[arg(long)]
        file: Option<String>,
    },

    /// Render final files as wiki markup
    Format {
        keyword: String,

        /// Render this model's finals into a model-specific output file
        #[arg(long)]
        model: Option<ModelKind>,
    },

    /// Flag rendered excerpts that are not verbatim
    Validate { keyword: String },

    /// Estimate the token count of a file
    CountTokens { file: PathBuf },
}

fn categorizer(config: &AppConfig, kind: ModelKind) -> Result<Categorizer> {
    Ok(Categorizer::new(build_client(kind, ModelRole::Categorize, config)?))
}

fn distiller(config: &AppConfig, kind: ModelKind) -> Result<Distiller> {
    let client = build_client(kind, ModelRole::Distill, config)?;
    Ok(Distiller::new(client, kind.tag()).with_retries(
        config.distill_max_retries,
        Duration::from_secs(config.distill_retry_delay_secs),
    ))
}

fn distill_options(config: &AppConfig) -> DistillOptions {
    DistillOptions {
        concurrency: config.distill_concurrency,
        show_progress: true,
    }
}

async fn search(config: &AppConfig, layout: &KeywordLayout) -> Result<()> {
    let filters = load_keyword_filters(&config.keyword_filter_file)?;
    let client = SearchClient::new(SearchOptions::from_config(config)?)?;

    let report = run_search(&client, layout, &filters, config.search_filter_delay).await?;
    info!(
        "Search complete: {} results in {} of {} filters",
        report.records,
        report.outputs.len(),
        report.filters
    );
    Ok(())
}

async fn categorize(config: &AppConfig, layout: &KeywordLayout, kind: ModelKind) -> Result<()> {
    let categorizer = categorizer(config, kind)?;
    pipeline::categorize(layout, &categorizer, kind).await?;
    Ok(())
}

async fn distill(
    config: &AppConfig,
    layout: &KeywordLayout,
    kind: ModelKind,
    source: ModelKind,
    file: Option<&str>,
) -> Result<()> {
    let distiller = distiller(config, kind)?;
    let options = distill_options(config);

    let report = match file {
        Some(name) => {
            let path = layout.dir().join(name);
            pipeline::distill_file(&path, layout.dir(), layout.keyword(), &distiller, kind, &options).await?
        }
        None => pipeline::distill(layout, &distiller, source, kind, &options).await?,
    };

    if report.failed > 0 {
        tracing::warn!("{} of {} paragraphs could not be distilled", report.failed, report.records);
    }
    Ok(())
}

fn validate(layout: &KeywordLayout) -> Result<()> {
    for report in pipeline::validate(layout)? {
        let counts = report.counts;
        info!(
            "{}: {} quotes, {} new warnings, {} already flagged, {} without original",
            report.path.display(),
            counts.quotes,
            counts.warnings_added,
            counts.already_flagged,
            counts.unresolved
        );
    }
    Ok(())
}

fn count_tokens(path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    println!(
        "{}: {} characters, ~{} tokens",
        path.display(),
        text.chars().count(),
        estimate_tokens(&text)
    );
    Ok(())
}

async fn run(command: Commands) -> Result<()> {
    if let Commands::CountTokens { file } = &command {
        logger::setup_console_logging("warn")?;
        return count_tokens(file);
    }

    let config = AppConfig::from_env()?;
    logger::setup_logging(&config.log_dir, &config.log_level)?;

    match command {
        Commands::Run {
            keyword,
            categorize_model,
            distill_model,
            skip_search,
        } => {
            let keyword = keyword.to_lowercase();
            config.ensure_keyword_dir(&keyword)?;
            let layout = KeywordLayout::from_config(&config, &keyword);

            info!("Starting workflow for '{}'", keyword);
            info!(
                "Using {} for categorization and {} for distillation",
                categorize_model, distill_model
            );

            if skip_search {
                info!("Skipping search; using existing raw files");
            } else {
                search(&config, &layout).await?;
            }
            categorize(&config, &layout, categorize_model).await?;
            distill(&config, &layout, distill_model, categorize_model, None).await?;

            let output = layout.rendered_path(None);
            pipeline::render(&layout, distill_model, &output)?;
            validate(&layout)?;

            info!("Workflow complete for '{}'", keyword);
            info!("Intermediate files are in {}", layout.dir().display());
            info!("Final validated output is in {}", output.display());
        }
        Commands::Search { keyword } => {
            let keyword = keyword.to_lowercase();
            config.ensure_keyword_dir(&keyword)?;
            search(&config, &KeywordLayout::from_config(&config, &keyword)).await?;
        }
        Commands::Categorize { keyword, model } => {
            let layout = KeywordLayout::from_config(&config, &keyword.to_lowercase());
            let models = match model {
                Some(model) => vec![model],
                None => vec![ModelKind::ChatGpt, ModelKind::Gemini],
            };
            for model in models {
                categorize(&config, &layout, model).await?;
            }
        }
        Commands::Distill {
            keyword,
            model,
            source_model,
            file,
        } => {
            let layout = KeywordLayout::from_config(&config, &keyword.to_lowercase());
            distill(&config, &layout, model, source_model, file.as_deref()).await?;
        }
        Commands::Format { keyword, model } => {
            let layout = KeywordLayout::from_config(&config, &keyword.to_lowercase());
            let output = layout.rendered_path(model);
            pipeline::render(&layout, model.unwrap_or(ModelKind::ChatGpt), &output)?;
        }
        Commands::Validate { keyword } => {
            validate(&KeywordLayout::from_config(&config, &keyword.to_lowercase()))?;
        }
        Commands::CountTokens { file } => count_tokens(&file)?,
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    load_dotenv_from_project_root();

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            let code = e.downcast_ref::<QuoteError>().map_or(1, QuoteError::exit_code);
            ExitCode::from(code)
        }
    }
}
