//! Tracked repository records

use chrono::{DateTime, Utc};
use fixme_core::{RepoRef, TrackedRepository};
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::projects::ProjectRepository;
use crate::error::unique_violation;
use crate::{Error, Result};

#[derive(Debug, sqlx::FromRow)]
struct RepositoryRow {
    id: i64,
    owner: String,
    name: String,
    url: String,
    project_id: Option<i64>,
    created_at: DateTime<Utc>,
    last_parsed: Option<DateTime<Utc>>,
}

impl From<RepositoryRow> for TrackedRepository {
    fn from(row: RepositoryRow) -> Self {
        Self {
            id: row.id,
            owner: row.owner,
            name: row.name,
            url: row.url,
            project_id: row.project_id,
            created_at: row.created_at,
            last_parsed: row.last_parsed,
        }
    }
}

/// Repository for the set of upstream repositories being polled
pub struct TrackedRepositories<'a> {
    pool: &'a SqlitePool,
}

impl<'a> TrackedRepositories<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Start tracking a repository
    pub async fn track(&self, repo: &RepoRef, project_id: Option<i64>) -> Result<TrackedRepository> {
        if let Some(project_id) = project_id {
            ProjectRepository::new(self.pool).get(project_id).await?;
        }

        let result = sqlx::query(
            r#"
            INSERT INTO repositories (owner, name, url, project_id, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&repo.owner)
        .bind(&repo.name)
        .bind(repo.html_url())
        .bind(project_id)
        .bind(Utc::now())
        .execute(self.pool)
        .await
        .map_err(|e| unique_violation(e, || format!("repository {} is already tracked", repo)))?;

        info!(repository = %repo, ?project_id, "Tracking repository");
        self.get_by_id(result.last_insert_rowid()).await
    }

    /// Stop tracking a repository; its stored issues go with it
    pub async fn untrack(&self, repo: &RepoRef) -> Result<()> {
        let result = sqlx::query("DELETE FROM repositories WHERE owner = ? AND name = ?")
            .bind(&repo.owner)
            .bind(&repo.name)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("repository {} is not tracked", repo)));
        }
        info!(repository = %repo, "Stopped tracking repository");
        Ok(())
    }

    /// Set or clear the project a repository belongs to
    pub async fn link(&self, repo: &RepoRef, project_id: Option<i64>) -> Result<TrackedRepository> {
        if let Some(project_id) = project_id {
            ProjectRepository::new(self.pool).get(project_id).await?;
        }

        let result = sqlx::query("UPDATE repositories SET project_id = ? WHERE owner = ? AND name = ?")
            .bind(project_id)
            .bind(&repo.owner)
            .bind(&repo.name)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("repository {} is not tracked", repo)));
        }
        debug!(repository = %repo, ?project_id, "Linked repository");
        self.get(repo).await
    }

    pub async fn get(&self, repo: &RepoRef) -> Result<TrackedRepository> {
        sqlx::query_as::<_, RepositoryRow>("SELECT * FROM repositories WHERE owner = ? AND name = ?")
            .bind(&repo.owner)
            .bind(&repo.name)
            .fetch_optional(self.pool)
            .await?
            .map(Into::into)
            .ok_or_else(|| Error::NotFound(format!("repository {} is not tracked", repo)))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<TrackedRepository> {
        sqlx::query_as::<_, RepositoryRow>("SELECT * FROM repositories WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .map(Into::into)
            .ok_or_else(|| Error::NotFound(format!("repository id {}", id)))
    }

    /// All tracked repositories ordered by owner and name
    pub async fn list(&self) -> Result<Vec<TrackedRepository>> {
        let rows = sqlx::query_as::<_, RepositoryRow>(
            "SELECT * FROM repositories ORDER BY owner, name",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Record the completion time of a reconciliation pass
    pub async fn mark_parsed(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query("UPDATE repositories SET last_parsed = ? WHERE id = ?")
            .bind(at)
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("repository id {}", id)));
        }
        Ok(())
    }
}
