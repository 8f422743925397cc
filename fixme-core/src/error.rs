//! Error types for fixme

use thiserror::Error;

/// Result type alias for fixme operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for configuration and input handling
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unparseable user input (repository URLs, enum names)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

/// Failure raised while ingesting issues
///
/// None of these end a reconciliation pass. The reconciler logs them and
/// moves on to the next issue or repository.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Upstream could not be reached or did not answer in time
    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    /// Upstream answered with a non-success status
    #[error("upstream returned status {status}: {detail}")]
    UpstreamError { status: u16, detail: String },

    /// Free-text markers are missing from an issue body
    #[error("issue {issue_id} is missing markers: {}", missing.join(", "))]
    ExtractionIncomplete {
        issue_id: i64,
        missing: Vec<&'static str>,
    },

    /// A single label on an issue is unusable
    #[error("label on issue {issue_id} skipped: {reason}")]
    LabelParseFailure { issue_id: i64, reason: String },

    /// Storage state disagrees with the requested change (e.g. deleting an absent row)
    #[error("storage conflict: {0}")]
    StorageConflict(String),

    /// Unexpected storage failure
    #[error("storage error: {0}")]
    Storage(String),
}
