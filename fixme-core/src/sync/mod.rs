//! Issue ingestion pipeline
//!
//! A reconciliation pass fetches every tracked repository through an
//! [`IssueSource`], derives fields with an
//! [`ExtractionStrategy`](crate::extract::ExtractionStrategy) and converges an
//! [`IssueStore`] with upstream state.

mod reconciler;
pub mod scheduler;
mod summary;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SyncError;
use crate::types::{IssueRecord, LabelRecord, RepoRef, TrackedRepository, UpstreamIssue};

pub use reconciler::Reconciler;
pub use scheduler::{CountedScheduler, IntervalScheduler, Scheduler};
pub use summary::{PassSummary, RepoSummary};

/// Why a fetch failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Connection failure or timeout
    NetworkUnavailable,
    /// Non-success HTTP status
    UpstreamError(u16),
}

/// Tagged fetch failure carrying whatever detail upstream gave us
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub detail: String,
}

impl FetchError {
    pub fn network(detail: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::NetworkUnavailable,
            detail: detail.into(),
        }
    }

    pub fn upstream(status: u16, detail: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::UpstreamError(status),
            detail: detail.into(),
        }
    }

    /// HTTP status for upstream errors
    pub fn status_code(&self) -> Option<u16> {
        match self.kind {
            FetchErrorKind::UpstreamError(status) => Some(status),
            FetchErrorKind::NetworkUnavailable => None,
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FetchErrorKind::NetworkUnavailable => write!(f, "network unavailable: {}", self.detail),
            FetchErrorKind::UpstreamError(status) => {
                write!(f, "upstream error {}: {}", status, self.detail)
            }
        }
    }
}

impl std::error::Error for FetchError {}

impl From<FetchError> for SyncError {
    fn from(err: FetchError) -> Self {
        match err.kind {
            FetchErrorKind::NetworkUnavailable => SyncError::NetworkUnavailable(err.detail),
            FetchErrorKind::UpstreamError(status) => SyncError::UpstreamError {
                status,
                detail: err.detail,
            },
        }
    }
}

/// Result of a fetch call
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result of a store call
pub type StoreResult<T> = std::result::Result<T, SyncError>;

/// Read-only access to the upstream issue tracker
#[async_trait]
pub trait IssueSource: Send + Sync {
    /// All issues of a repository, open and closed
    async fn fetch_issues(&self, repo: &RepoRef) -> FetchResult<Vec<UpstreamIssue>>;

    /// Primary language from repository metadata
    async fn fetch_primary_language(&self, repo: &RepoRef) -> FetchResult<Option<String>>;
}

/// Whether an upsert inserted or overwrote a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Keyed storage the reconciler writes into
#[async_trait]
pub trait IssueStore: Send + Sync {
    /// Repositories to poll
    async fn tracked_repositories(&self) -> StoreResult<Vec<TrackedRepository>>;

    /// Insert or overwrite the issue keyed by its external id
    async fn upsert_issue(&self, issue: &IssueRecord) -> StoreResult<UpsertOutcome>;

    /// Delete an issue; `StorageConflict` when it was not stored
    async fn delete_issue(&self, issue_id: i64) -> StoreResult<()>;

    /// Create the label on first sighting, otherwise refresh it
    async fn upsert_label(&self, label: &LabelRecord) -> StoreResult<()>;

    /// Associate a label with an issue; existing associations are kept
    async fn attach_label(&self, issue_id: i64, label_id: i64) -> StoreResult<()>;

    /// Record that a repository finished a pass
    async fn mark_parsed(&self, repository_id: i64, at: DateTime<Utc>) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_status_code() {
        let err = FetchError::upstream(404, "Not Found");
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(err.to_string(), "upstream error 404: Not Found");

        let err = FetchError::network("timed out");
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn test_fetch_error_into_sync_error() {
        let err: SyncError = FetchError::upstream(502, "Bad Gateway").into();
        assert_eq!(
            err,
            SyncError::UpstreamError {
                status: 502,
                detail: "Bad Gateway".into()
            }
        );
    }
}
