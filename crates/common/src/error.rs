/// QuoteQuest error types
#[derive(Debug, thiserror::Error)]
pub enum QuoteError {
    /// A source artifact is not valid structured data
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// An external collaborator (LLM, search) failed
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Compact ID does not fit the requested width
    #[error("Index {index} does not fit in {width} base-62 digits")]
    OutOfRange { index: usize, width: usize },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system error
    #[error("File system error: {0}")]
    FileSystem(String),

    /// Network/HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General error (anyhow integration)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl QuoteError {
    /// Create malformed input error
    pub fn malformed_input<S: Into<String>>(msg: S) -> Self {
        Self::MalformedInput(msg.into())
    }

    /// Create external service error
    pub fn external_service<S: Into<String>>(msg: S) -> Self {
        Self::ExternalService(msg.into())
    }

    /// Create config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create file system error
    pub fn file_system<S: Into<String>>(msg: S) -> Self {
        Self::FileSystem(msg.into())
    }

    /// Create network error
    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::Network(msg.into())
    }

    /// Create invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create not found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Process exit status for a run aborted by this error (sysexits.h values)
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidInput(_) => 64,
            Self::MalformedInput(_) | Self::Json(_) => 65,
            Self::NotFound(_) => 66,
            Self::ExternalService(_) | Self::Network(_) => 69,
            Self::OutOfRange { .. } | Self::Other(_) => 70,
            Self::FileSystem(_) | Self::Io(_) => 74,
            Self::Config(_) => 78,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_message() {
        let err = QuoteError::OutOfRange { index: 62, width: 1 };
        assert_eq!(err.to_string(), "Index 62 does not fit in 1 base-62 digits");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: QuoteError = io.into();
        assert!(matches!(err, QuoteError::Io(_)));
        assert_eq!(err.exit_code(), 74);
    }

    #[test]
    fn test_exit_codes_by_category() {
        assert_eq!(QuoteError::malformed_input("bad json").exit_code(), 65);
        assert_eq!(QuoteError::external_service("quota").exit_code(), 69);
        assert_eq!(QuoteError::config("missing key").exit_code(), 78);
    }
}
