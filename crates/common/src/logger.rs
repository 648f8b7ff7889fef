use crate::error::QuoteError;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Appended to on every run
pub const LOG_FILE_NAME: &str = "quotequest.log";

/// HTTP internals stay at warn unless RUST_LOG says otherwise
const QUIET_DEPENDENCIES: &[&str] = &["hyper", "reqwest", "h2", "rustls"];

/// Filter directives for a configured level
pub fn filter_directives(log_level: &str) -> String {
    let level = parse_log_level(log_level).as_str().to_lowercase();
    let mut directives = vec![level];
    directives.extend(QUIET_DEPENDENCIES.iter().map(|dep| format!("{}=warn", dep)));
    directives.join(",")
}

fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_directives(log_level)))
}

/// Create the log directory if needed and open the run log for appending
pub fn open_log_file(log_dir: &Path) -> Result<(File, PathBuf), QuoteError> {
    std::fs::create_dir_all(log_dir).map_err(|e| {
        QuoteError::config(format!(
            "Failed to create log directory {}: {}",
            log_dir.display(),
            e
        ))
    })?;

    let path = log_dir.join(LOG_FILE_NAME);
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| QuoteError::config(format!("Failed to open log file {}: {}", path.display(), e)))?;

    Ok((file, path))
}

/// Initialize logging to stderr and to `<log_dir>/quotequest.log`
///
/// Stdout is left to command output. `RUST_LOG` overrides `log_level`.
pub fn setup_logging(log_dir: &Path, log_level: &str) -> Result<(), QuoteError> {
    let (log_file, log_file_path) = open_log_file(log_dir)?;

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(env_filter(log_level));

    let file_layer = fmt::layer()
        .with_writer(log_file)
        .with_target(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_filter(env_filter(log_level));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| QuoteError::config(format!("Failed to initialize logging: {}", e)))?;

    tracing::debug!("Logging initialized: level={}, log_file={}", log_level, log_file_path.display());

    Ok(())
}

/// Stderr-only logging for commands that touch no workspace
pub fn setup_console_logging(log_level: &str) -> Result<(), QuoteError> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(env_filter(log_level))
        .try_init()
        .map_err(|e| QuoteError::config(format!("Failed to initialize logging: {}", e)))
}

/// Parse a configured level; unknown values fall back to INFO
pub fn parse_log_level(level: &str) -> Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!("Invalid log level '{}', defaulting to INFO", level);
            Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("debug"), Level::DEBUG);
        assert_eq!(parse_log_level(" WARNING "), Level::WARN);
        assert_eq!(parse_log_level("verbose"), Level::INFO);
    }

    #[test]
    fn test_filter_directives_quiet_http() {
        let directives = filter_directives("DEBUG");
        assert!(directives.starts_with("debug,"));
        assert!(directives.contains("reqwest=warn"));
        assert!(directives.contains("hyper=warn"));
    }

    #[test]
    fn test_open_log_file_creates_directory() {
        let dir = TempDir::new().unwrap();
        let log_dir = dir.path().join("workspace").join("log");
        let (_, path) = open_log_file(&log_dir).unwrap();
        assert_eq!(path, log_dir.join(LOG_FILE_NAME));
        assert!(path.exists());

        // Reopening appends instead of failing
        assert!(open_log_file(&log_dir).is_ok());
    }
}
