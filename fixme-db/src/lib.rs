//! Database layer for fixme
//!
//! Provides the SQLite store the reconciler writes into, the tracked
//! repository and project registry, and the filtered read API over stored
//! issues.

pub mod error;
pub mod models;
pub mod query;
pub mod repos;
mod store;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

pub use error::{Error, Result};
pub use models::{IssueMetadata, NewProject, Project, StoredIssue};
pub use query::{parse_filter_values, IssueQuery, OrderField, Ordering};
pub use repos::{IssueRepository, ProjectRepository, TrackedRepositories};

/// Database connection pool
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection from a file path
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();

        // Create parent directory if needed
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Io(format!("Failed to create database directory: {}", e)))?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        debug!(path = %db_path.display(), "Opened database");
        Self::migrate(pool).await
    }

    /// Create a private in-memory database for testing
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        // Every connection to :memory: is a separate database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| Error::Migration(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get the tracked repositories registry
    pub fn repositories(&self) -> TrackedRepositories<'_> {
        TrackedRepositories::new(&self.pool)
    }

    /// Get the project repository
    pub fn projects(&self) -> ProjectRepository<'_> {
        ProjectRepository::new(&self.pool)
    }

    /// Get the issue repository
    pub fn issues(&self) -> IssueRepository<'_> {
        IssueRepository::new(&self.pool)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("connections", &self.pool.size())
            .finish_non_exhaustive()
    }
}
