use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Empty content: {0}")]
    EmptyContent(String),

    #[error("External service failed: {0}")]
    ExternalService(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Index error: {0}")]
    Index(String),
}

/// Coarse classification of a [`RagError`], stable enough to branch on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    EmptyContent,
    ExternalService,
    Timeout,
    Io,
    Config,
    Index,
}

impl RagError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::EmptyContent(_) => ErrorKind::EmptyContent,
            Self::ExternalService(_) => ErrorKind::ExternalService,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Io { .. } => ErrorKind::Io,
            // A corrupt artifact on disk is an I/O-side failure to the caller.
            Self::Serialization(_) => ErrorKind::Io,
            Self::Config(_) => ErrorKind::Config,
            Self::Index(_) => ErrorKind::Index,
        }
    }

    /// Timeouts are report-only; the same request may succeed when repeated.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, RagError>;
