//! Error types for paperrag.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for paperrag operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Document loading failed
    #[error("load error: {0}")]
    Load(#[from] LoadError),

    /// Invalid configuration
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Embedding or generation service failed outside of answer generation
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Vector index operation failed
    #[error("index error: {0}")]
    Index(#[from] IndexError),

    /// Answer generation failed
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Document loading errors.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("invalid PDF: {0}")]
    InvalidPdf(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("loading failed: {0}")]
    Failed(String),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid chunking parameters: {0}")]
    InvalidChunking(String),

    #[error("invalid prompt template: {0}")]
    InvalidTemplate(String),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Failures of the external embedding and generation services.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("missing credential: {0}")]
    MissingCredential(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Classify a non-success HTTP status returned by a provider.
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::Auth(message),
            429 => Self::RateLimited(message),
            _ => Self::Api { status, message },
        }
    }

    /// Classify an error response, using the `error.message` field of an
    /// OpenAI-style JSON body when there is one.
    #[must_use]
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|value| {
                value
                    .pointer("/error/message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| body.trim().to_string());
        Self::from_status(status, message)
    }
}

/// Vector index errors.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("cannot build an index from an empty chunk sequence")]
    EmptyBuild,

    #[error("index has not been built")]
    NotBuilt,

    #[error("storage collision at {}: holds document {existing}", location.display())]
    Collision { location: PathBuf, existing: String },

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("storage error: {0}")]
    Storage(String),
}

/// Answer generation errors.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("provider failed during generation: {0}")]
    Provider(#[from] ProviderError),

    #[error("empty answer from model")]
    EmptyAnswer,
}

/// Result type alias for paperrag operations.
pub type Result<T> = std::result::Result<T, Error>;
