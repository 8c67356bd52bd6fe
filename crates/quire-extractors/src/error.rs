//! Extraction error types.

use thiserror::Error;

/// Errors that can occur while validating or extracting a PDF.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Bytes do not start with a PDF header.
    #[error("missing %PDF- header")]
    MissingHeader,

    /// The file ends before its trailer.
    #[error("file is truncated (no %%EOF marker)")]
    Truncated,

    /// The object graph could not be parsed.
    #[error("{0}")]
    Parse(String),

    /// The document is encrypted.
    #[error("document is encrypted")]
    Encrypted,

    /// Catalog or page tree is broken.
    #[error("invalid document structure: {0}")]
    Structure(String),

    /// The document has no pages.
    #[error("document has no pages")]
    NoPages,

    /// A page's content could not be interpreted.
    #[error("page {page}: {message}")]
    Content { page: usize, message: String },

    /// The parser panicked on hostile input.
    #[error("parser aborted: {0}")]
    Panicked(String),

    /// Task join error from spawn_blocking.
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl ExtractError {
    pub(crate) fn structure(message: impl Into<String>) -> Self {
        Self::Structure(message.into())
    }

    pub(crate) fn content(page: usize, message: impl std::fmt::Display) -> Self {
        Self::Content {
            page,
            message: message.to_string(),
        }
    }
}

impl From<lopdf::Error> for ExtractError {
    fn from(err: lopdf::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;
