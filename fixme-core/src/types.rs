//! Domain types shared by the fetcher, the reconciler and the store

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Coarse difficulty of an issue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceLevel {
    Easy,
    #[default]
    Moderate,
    Senior,
}

impl ExperienceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceLevel::Easy => "easy",
            ExperienceLevel::Moderate => "moderate",
            ExperienceLevel::Senior => "senior",
        }
    }
}

impl fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExperienceLevel {
    type Err = Error;

    /// Accepts the stored names plus `easyfix`, which older issue bodies use
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" | "easyfix" => Ok(ExperienceLevel::Easy),
            "moderate" => Ok(ExperienceLevel::Moderate),
            "senior" => Ok(ExperienceLevel::Senior),
            other => Err(Error::Parse(format!("unknown experience level: {}", other))),
        }
    }
}

/// Coarse category of the work an issue asks for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    Bugfix,
    Enhancement,
    #[default]
    Unclassified,
}

impl IssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::Bugfix => "bugfix",
            IssueType::Enhancement => "enhancement",
            IssueType::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "bugfix" => Ok(IssueType::Bugfix),
            "enhancement" => Ok(IssueType::Enhancement),
            "unclassified" => Ok(IssueType::Unclassified),
            other => Err(Error::Parse(format!("unknown issue type: {}", other))),
        }
    }
}

/// Owner/name pair identifying an upstream repository
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse a repository reference
    ///
    /// Supports formats:
    /// - owner/repo
    /// - https://github.com/owner/repo
    /// - git@github.com:owner/repo.git
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim().trim_end_matches('/');

        if input.starts_with("https://") || input.starts_with("http://") {
            let url = url::Url::parse(input).map_err(|e| Error::Parse(e.to_string()))?;
            let path = url.path().trim_start_matches('/').trim_end_matches(".git");
            let parts: Vec<&str> = path.split('/').collect();
            if parts.len() >= 2 && !parts[0].is_empty() && !parts[1].is_empty() {
                return Ok(Self::new(parts[0], parts[1]));
            }
            return Err(Error::Parse(format!("Invalid GitHub URL path: {}", path)));
        }

        if let Some(rest) = input.strip_prefix("git@") {
            if let Some(path) = rest.split(':').nth(1) {
                let parts: Vec<&str> = path.trim_end_matches(".git").split('/').collect();
                if parts.len() >= 2 && !parts[0].is_empty() && !parts[1].is_empty() {
                    return Ok(Self::new(parts[0], parts[1]));
                }
            }
            return Err(Error::Parse(format!("Invalid SSH URL: {}", input)));
        }

        let parts: Vec<&str> = input.split('/').collect();
        if parts.len() == 2 && !parts[0].is_empty() && !parts[1].is_empty() {
            return Ok(Self::new(parts[0], parts[1].trim_end_matches(".git")));
        }

        Err(Error::Parse(format!(
            "Invalid repository format: {}. Expected owner/repo",
            input
        )))
    }

    /// Canonical web URL of the repository
    pub fn html_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A repository the system polls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedRepository {
    pub id: i64,
    pub owner: String,
    pub name: String,
    pub url: String,
    pub project_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub last_parsed: Option<DateTime<Utc>>,
}

impl TrackedRepository {
    pub fn repo_ref(&self) -> RepoRef {
        RepoRef::new(&self.owner, &self.name)
    }
}

/// Upstream issue state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

/// Label as sent by upstream
///
/// Every field is optional so that one damaged label does not make the whole
/// issue undecodable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamLabel {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// Issue as sent by `GET /repos/{owner}/{repo}/issues`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamIssue {
    pub id: i64,
    #[serde(default)]
    pub number: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub html_url: String,
    pub state: IssueState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub labels: Vec<UpstreamLabel>,
    /// Present when the record is a pull request listed through the issues endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<serde_json::Value>,
}

impl UpstreamIssue {
    /// Whether the record belongs in storage at all
    pub fn is_open_issue(&self) -> bool {
        self.state == IssueState::Open && self.pull_request.is_none()
    }

    /// Label names in upstream order, skipping nameless labels
    pub fn label_names(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().filter_map(|l| l.name.as_deref())
    }
}

/// Structured attributes derived from one issue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueFields {
    pub experience_needed: ExperienceLevel,
    pub issue_type: IssueType,
    pub language: String,
    pub tech_stack: String,
    pub expected_time: String,
}

/// Row written to storage for one open upstream issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    pub issue_id: i64,
    pub repository_id: i64,
    pub number: i64,
    pub title: String,
    pub body: String,
    pub url: String,
    pub language: String,
    pub tech_stack: String,
    pub expected_time: String,
    pub experience_needed: ExperienceLevel,
    pub issue_type: IssueType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IssueRecord {
    pub fn new(repository_id: i64, issue: &UpstreamIssue, fields: IssueFields) -> Self {
        Self {
            issue_id: issue.id,
            repository_id,
            number: issue.number,
            title: issue.title.clone(),
            body: issue.body.clone().unwrap_or_default(),
            url: issue.html_url.clone(),
            language: fields.language,
            tech_stack: fields.tech_stack,
            expected_time: fields.expected_time,
            experience_needed: fields.experience_needed,
            issue_type: fields.issue_type,
            created_at: issue.created_at,
            updated_at: issue.updated_at,
        }
    }

    pub fn fields(&self) -> IssueFields {
        IssueFields {
            experience_needed: self.experience_needed,
            issue_type: self.issue_type,
            language: self.language.clone(),
            tech_stack: self.tech_stack.clone(),
            expected_time: self.expected_time.clone(),
        }
    }
}

/// Label row keyed by its upstream id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRecord {
    pub label_id: i64,
    pub name: String,
    pub color: String,
    pub url: String,
}

impl TryFrom<&UpstreamLabel> for LabelRecord {
    type Error = String;

    fn try_from(label: &UpstreamLabel) -> std::result::Result<Self, Self::Error> {
        let label_id = label.id.ok_or_else(|| "label has no id".to_string())?;
        let name = label
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| format!("label {} has no name", label_id))?;

        Ok(Self {
            label_id,
            name: name.to_string(),
            color: label.color.clone().unwrap_or_default(),
            url: label.url.clone().unwrap_or_default(),
        })
    }
}
