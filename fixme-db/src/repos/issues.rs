//! Issue repository: reconciler writes and the read API

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use fixme_core::{ExperienceLevel, IssueRecord, IssueType, UpsertOutcome};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::models::{IssueMetadata, StoredIssue};
use crate::query::IssueQuery;
use crate::{Error, Result};

const SELECT_ISSUE: &str = r#"
    SELECT i.*, r.owner || '/' || r.name AS repository
    FROM issues i
    JOIN repositories r ON r.id = i.repository_id
"#;

#[derive(Debug, sqlx::FromRow)]
struct IssueRow {
    issue_id: i64,
    repository_id: i64,
    repository: String,
    number: i64,
    title: String,
    body: String,
    url: String,
    language: String,
    tech_stack: String,
    expected_time: String,
    experience_needed: String,
    issue_type: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl IssueRow {
    fn into_issue(self, labels: Vec<String>) -> Result<StoredIssue> {
        let experience_needed: ExperienceLevel = self
            .experience_needed
            .parse()
            .map_err(|e: fixme_core::Error| Error::InvalidData(e.to_string()))?;
        let issue_type: IssueType = self
            .issue_type
            .parse()
            .map_err(|e: fixme_core::Error| Error::InvalidData(e.to_string()))?;

        Ok(StoredIssue {
            issue_id: self.issue_id,
            repository_id: self.repository_id,
            repository: self.repository,
            number: self.number,
            title: self.title,
            body: self.body,
            url: self.url,
            language: self.language,
            tech_stack: self.tech_stack,
            expected_time: self.expected_time,
            experience_needed,
            issue_type,
            labels,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Repository for stored issues and their label associations
pub struct IssueRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> IssueRepository<'a> {
    /// Create a new issue repository
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert the issue or overwrite every field of the stored copy
    ///
    /// Both statements run in one transaction. The insert comes first so the
    /// transaction takes the write lock immediately.
    pub async fn upsert(&self, issue: &IssueRecord) -> Result<UpsertOutcome> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO issues (
                issue_id, repository_id, number, title, body, url,
                language, tech_stack, expected_time, experience_needed, issue_type,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(issue_id) DO NOTHING
            "#,
        )
        .bind(issue.issue_id)
        .bind(issue.repository_id)
        .bind(issue.number)
        .bind(&issue.title)
        .bind(&issue.body)
        .bind(&issue.url)
        .bind(&issue.language)
        .bind(&issue.tech_stack)
        .bind(&issue.expected_time)
        .bind(issue.experience_needed.as_str())
        .bind(issue.issue_type.as_str())
        .bind(issue.created_at)
        .bind(issue.updated_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 1 {
            tx.commit().await?;
            debug!(issue_id = issue.issue_id, "Created issue");
            return Ok(UpsertOutcome::Created);
        }

        sqlx::query(
            r#"
            UPDATE issues SET
                repository_id = ?, number = ?, title = ?, body = ?, url = ?,
                language = ?, tech_stack = ?, expected_time = ?,
                experience_needed = ?, issue_type = ?,
                created_at = ?, updated_at = ?
            WHERE issue_id = ?
            "#,
        )
        .bind(issue.repository_id)
        .bind(issue.number)
        .bind(&issue.title)
        .bind(&issue.body)
        .bind(&issue.url)
        .bind(&issue.language)
        .bind(&issue.tech_stack)
        .bind(&issue.expected_time)
        .bind(issue.experience_needed.as_str())
        .bind(issue.issue_type.as_str())
        .bind(issue.created_at)
        .bind(issue.updated_at)
        .bind(issue.issue_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        debug!(issue_id = issue.issue_id, "Updated issue");
        Ok(UpsertOutcome::Updated)
    }

    /// Delete an issue and its label associations
    pub async fn delete(&self, issue_id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM issues WHERE issue_id = ?")
            .bind(issue_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("issue {}", issue_id)));
        }
        debug!(issue_id, "Deleted issue");
        Ok(())
    }

    /// Create a label or refresh its name, color and URL
    pub async fn upsert_label(&self, label_id: i64, name: &str, color: &str, url: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO labels (label_id, name, color, url)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(label_id) DO UPDATE SET
                name = excluded.name,
                color = excluded.color,
                url = excluded.url
            "#,
        )
        .bind(label_id)
        .bind(name)
        .bind(color)
        .bind(url)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Associate a label with an issue; a repeated association is a no-op
    pub async fn attach_label(&self, issue_id: i64, label_id: i64) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO issue_labels (issue_id, label_id) VALUES (?, ?)")
            .bind(issue_id)
            .bind(label_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Fetch one issue by its upstream id
    pub async fn get(&self, issue_id: i64) -> Result<StoredIssue> {
        let row = sqlx::query_as::<_, IssueRow>(&format!("{} WHERE i.issue_id = ?", SELECT_ISSUE))
            .bind(issue_id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("issue {}", issue_id)))?;

        let mut labels = self.label_names(&[issue_id]).await?;
        row.into_issue(labels.remove(&issue_id).unwrap_or_default())
    }

    /// List issues matching `query`
    pub async fn list(&self, query: &IssueQuery) -> Result<Vec<StoredIssue>> {
        let mut builder = QueryBuilder::<Sqlite>::new(SELECT_ISSUE);
        query.push_clauses(&mut builder);

        let rows: Vec<IssueRow> = builder.build_query_as().fetch_all(self.pool).await?;
        let ids: Vec<i64> = rows.iter().map(|r| r.issue_id).collect();
        let mut labels = self.label_names(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let names = labels.remove(&row.issue_id).unwrap_or_default();
                row.into_issue(names)
            })
            .collect()
    }

    /// Distinct language, tech stack and experience values in storage
    pub async fn metadata(&self) -> Result<IssueMetadata> {
        let language = self.distinct("language").await?;
        let tech_stack = self.distinct("tech_stack").await?;
        let experience_needed = self
            .distinct("experience_needed")
            .await?
            .iter()
            .map(|v| {
                v.parse()
                    .map_err(|e: fixme_core::Error| Error::InvalidData(e.to_string()))
            })
            .collect::<Result<Vec<ExperienceLevel>>>()?;

        Ok(IssueMetadata {
            language,
            tech_stack,
            experience_needed,
        })
    }

    /// Number of stored issues
    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM issues")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    async fn distinct(&self, column: &'static str) -> Result<Vec<String>> {
        let values: Vec<(String,)> = sqlx::query_as(&format!(
            "SELECT DISTINCT {col} FROM issues WHERE {col} != '' ORDER BY {col}",
            col = column
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(values.into_iter().map(|(v,)| v).collect())
    }

    /// Label names per issue, sorted by name
    async fn label_names(&self, issue_ids: &[i64]) -> Result<HashMap<i64, Vec<String>>> {
        let mut names: HashMap<i64, Vec<String>> = HashMap::new();
        if issue_ids.is_empty() {
            return Ok(names);
        }

        // SQLite caps bound parameters per statement
        for chunk in issue_ids.chunks(500) {
            let mut builder = QueryBuilder::<Sqlite>::new(
                "SELECT il.issue_id, l.name FROM issue_labels il \
                 JOIN labels l ON l.label_id = il.label_id WHERE il.issue_id IN (",
            );
            let mut separated = builder.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            separated.push_unseparated(") ORDER BY l.name");

            let rows: Vec<(i64, String)> = builder.build_query_as().fetch_all(self.pool).await?;
            for (issue_id, name) in rows {
                names.entry(issue_id).or_default().push(name);
            }
        }
        Ok(names)
    }
}
