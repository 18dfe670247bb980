//! Error types for the rozip crate.

use thiserror::Error;

/// Errors that can occur when exploring ZIP archives.
#[derive(Debug, Error)]
pub enum Error {
    /// The byte source could not be opened or does not support ranged reads.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// The archive violates the ZIP format.
    #[error("malformed archive: {0}")]
    MalformedArchive(String),

    /// Compression method other than stored (0) or DEFLATE (8).
    #[error("unsupported compression method: {0}")]
    UnsupportedCompression(u16),

    /// Operation not valid for the target, e.g. extracting a directory.
    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),

    /// Entry path or metadata key not present.
    #[error("entry not found: {0}")]
    NotFound(String),

    /// The archive holds no `ro-crate-metadata.json` document.
    #[error("archive contains no RO-Crate metadata")]
    NoCrate,

    /// Enriched metadata was accessed before `extract_metadata`.
    #[error("metadata has not been extracted")]
    MetadataNotExtracted,

    /// The RO-Crate metadata document is not valid JSON of the expected shape.
    #[error("invalid RO-Crate metadata: {0}")]
    InvalidCrate(#[from] serde_json::Error),

    /// The operation was cancelled by the caller.
    #[error("operation cancelled")]
    Cancelled,

    /// I/O or decoder error.
    #[error("I/O error: {0}")]
    Io(std::io::Error),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::Interrupted => Error::Cancelled,
            _ => Error::Io(err),
        }
    }
}

/// Result type for rozip operations.
pub type Result<T> = std::result::Result<T, Error>;
