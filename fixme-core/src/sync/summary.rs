//! Per-pass bookkeeping

use serde::Serialize;
use tracing::{info, warn};

/// What happened to one repository during a pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepoSummary {
    /// `owner/name`
    pub repository: String,
    pub fetched: usize,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Closed issues and pull requests that were not stored anyway
    pub skipped: usize,
    /// Open issues the extraction strategy refused
    pub rejected: usize,
    /// Issues whose storage writes failed
    pub failed: usize,
    /// Fetch failure that made the pass skip this repository
    pub error: Option<String>,
}

impl RepoSummary {
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            ..Default::default()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    pub repositories: Vec<RepoSummary>,
    /// Set when the tracked repository list itself could not be read
    pub error: Option<String>,
}

impl PassSummary {
    pub fn failed_repositories(&self) -> usize {
        self.repositories.iter().filter(|r| !r.is_ok()).count()
    }

    pub fn total_created(&self) -> usize {
        self.repositories.iter().map(|r| r.created).sum()
    }

    pub fn total_updated(&self) -> usize {
        self.repositories.iter().map(|r| r.updated).sum()
    }

    pub fn total_deleted(&self) -> usize {
        self.repositories.iter().map(|r| r.deleted).sum()
    }

    /// Emit one log line for the pass
    pub fn log(&self) {
        if let Some(ref error) = self.error {
            warn!(error = %error, "Reconciliation pass aborted");
            return;
        }
        info!(
            repositories = self.repositories.len(),
            failed = self.failed_repositories(),
            created = self.total_created(),
            updated = self.total_updated(),
            deleted = self.total_deleted(),
            "Reconciliation pass finished"
        );
    }
}
