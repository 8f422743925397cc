//! Error types for GitHub client setup
//!
//! Request failures are not reported through this type: fetches return the
//! tagged [`FetchError`](fixme_core::FetchError) so that callers never see
//! transport faults.

use thiserror::Error;

/// Result type for GitHub client setup
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building a GitHub client
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP client could not be constructed
    #[error("Failed to create HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    /// Secrets could not be loaded
    #[error("GitHub authentication error: {0}")]
    Auth(String),

    /// Invalid client configuration
    #[error("Invalid GitHub configuration: {0}")]
    Config(String),
}
