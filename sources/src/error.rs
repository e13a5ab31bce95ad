//! Source adapter error types.

use thiserror::Error;

/// Errors produced by a single rate source fetch.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The HTTP request failed (connection, status, or body read).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The fetch did not complete within the per-source bound.
    #[error("source timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The document was fetched but no usable rate could be extracted.
    #[error("no usable rate found at {url}")]
    RateNotFound { url: String },

    /// The fetch task failed before producing a result.
    #[error("source task failed: {0}")]
    TaskFailed(String),
}

/// Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;
