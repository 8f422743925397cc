//! Records returned by the read API

use chrono::{DateTime, Utc};
use fixme_core::{ExperienceLevel, IssueType};
use serde::{Deserialize, Serialize};

/// Display metadata for a group of repositories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub display_name: String,
    pub first_color: String,
    pub second_color: String,
    pub description: String,
    pub logo: Option<String>,
    pub link: String,
    pub setup_duration: String,
    pub tags: Vec<String>,
    /// Stored issues across the project's repositories
    pub issues_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProject {
    pub display_name: String,
    #[serde(default)]
    pub first_color: String,
    #[serde(default)]
    pub second_color: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub setup_duration: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewProject {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            ..Default::default()
        }
    }
}

/// Issue as served by the read API, with its repository and label names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredIssue {
    pub issue_id: i64,
    pub repository_id: i64,
    /// `owner/name` of the owning repository
    pub repository: String,
    pub number: i64,
    pub title: String,
    pub body: String,
    pub url: String,
    pub language: String,
    pub tech_stack: String,
    pub expected_time: String,
    pub experience_needed: ExperienceLevel,
    pub issue_type: IssueType,
    pub labels: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Distinct filter values present in storage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueMetadata {
    pub language: Vec<String>,
    pub tech_stack: Vec<String>,
    pub experience_needed: Vec<ExperienceLevel>,
}
