//! Project records

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::unique_violation;
use crate::models::{NewProject, Project};
use crate::{Error, Result};

const SELECT_PROJECT: &str = r#"
    SELECT p.*,
        (SELECT COUNT(*) FROM issues i
         JOIN repositories r ON r.id = i.repository_id
         WHERE r.project_id = p.id) AS issues_count
    FROM projects p
"#;

#[derive(Debug, sqlx::FromRow)]
struct ProjectRow {
    id: i64,
    display_name: String,
    first_color: String,
    second_color: String,
    description: String,
    logo: Option<String>,
    link: String,
    setup_duration: String,
    tags: String,
    issues_count: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProjectRow> for Project {
    type Error = Error;

    fn try_from(row: ProjectRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            display_name: row.display_name,
            first_color: row.first_color,
            second_color: row.second_color,
            description: row.description,
            logo: row.logo,
            link: row.link,
            setup_duration: row.setup_duration,
            tags: serde_json::from_str(&row.tags)?,
            issues_count: row.issues_count,
            created_at: row.created_at,
        })
    }
}

/// Repository for project display metadata
pub struct ProjectRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ProjectRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a project; display names are unique
    pub async fn create(&self, project: &NewProject) -> Result<Project> {
        if project.display_name.trim().is_empty() {
            return Err(Error::InvalidData("project display name is empty".to_string()));
        }
        let tags = serde_json::to_string(&project.tags)?;

        let result = sqlx::query(
            r#"
            INSERT INTO projects (
                display_name, first_color, second_color, description,
                logo, link, setup_duration, tags, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&project.display_name)
        .bind(&project.first_color)
        .bind(&project.second_color)
        .bind(&project.description)
        .bind(&project.logo)
        .bind(&project.link)
        .bind(&project.setup_duration)
        .bind(&tags)
        .bind(Utc::now())
        .execute(self.pool)
        .await
        .map_err(|e| unique_violation(e, || format!("project '{}'", project.display_name)))?;

        let id = result.last_insert_rowid();
        info!(project_id = id, display_name = %project.display_name, "Created project");
        self.get(id).await
    }

    pub async fn get(&self, id: i64) -> Result<Project> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!("{} WHERE p.id = ?", SELECT_PROJECT))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("project {}", id)))?;
        row.try_into()
    }

    /// All projects ordered by display name, with their issue counts
    pub async fn list(&self) -> Result<Vec<Project>> {
        sqlx::query_as::<_, ProjectRow>(&format!("{} ORDER BY p.display_name", SELECT_PROJECT))
            .fetch_all(self.pool)
            .await?
            .into_iter()
            .map(TryInto::try_into)
            .collect()
    }
}
