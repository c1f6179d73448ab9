//! Error types for snapshot and journal persistence.

/// Errors raised while reading or writing snapshot and journal files.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error (reading/writing snapshot or journal files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON, surfaced exactly as `serde_json` reported it.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type for file-backed core operations.
pub type Result<T> = std::result::Result<T, Error>;
