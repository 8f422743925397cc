//! Issue and repository metadata fetching

use async_trait::async_trait;
use fixme_core::{FetchResult, IssueSource, RepoRef, UpstreamIssue};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::client::DEFAULT_PAGE_SIZE;
use crate::GitHubClient;

/// Subset of `GET /repos/{owner}/{repo}` the pipeline uses
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryMetadata {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub open_issues_count: Option<u64>,
}

impl GitHubClient {
    /// List issues in any state
    ///
    /// Only the first page is requested unless `max_pages` is raised, so large
    /// repositories are not listed completely. Entries that fail to decode are
    /// logged and dropped without affecting the rest of the page.
    pub async fn list_issues(&self, repo: &RepoRef) -> FetchResult<Vec<UpstreamIssue>> {
        let path = format!("/repos/{}/{}/issues", repo.owner, repo.name);
        let page_size = self.per_page().map(u32::from).unwrap_or(DEFAULT_PAGE_SIZE);
        let mut issues = Vec::new();

        for page in 1..=self.max_pages() {
            let mut query = vec![("state", "all".to_string())];
            if let Some(per_page) = self.per_page() {
                query.push(("per_page", per_page.to_string()));
            }
            if page > 1 {
                query.push(("page", page.to_string()));
            }

            let raw: Vec<serde_json::Value> = self.get_json(&path, &query).await?;
            let received = raw.len();
            debug!(repository = %repo, page, received, "Fetched issue page");

            issues.extend(raw.into_iter().filter_map(|value| decode_issue(repo, value)));

            if (received as u32) < page_size {
                break;
            }
        }

        info!(repository = %repo, count = issues.len(), "Fetched issues");
        Ok(issues)
    }

    /// Fetch repository metadata
    pub async fn repository_metadata(&self, repo: &RepoRef) -> FetchResult<RepositoryMetadata> {
        let path = format!("/repos/{}/{}", repo.owner, repo.name);
        self.get_json(&path, &[]).await
    }
}

fn decode_issue(repo: &RepoRef, value: serde_json::Value) -> Option<UpstreamIssue> {
    let id = value.get("id").and_then(serde_json::Value::as_i64);
    match serde_json::from_value::<UpstreamIssue>(value) {
        Ok(issue) => Some(issue),
        Err(e) => {
            warn!(repository = %repo, issue_id = ?id, error = %e, "Skipping malformed issue");
            None
        }
    }
}

#[async_trait]
impl IssueSource for GitHubClient {
    async fn fetch_issues(&self, repo: &RepoRef) -> FetchResult<Vec<UpstreamIssue>> {
        self.list_issues(repo).await
    }

    async fn fetch_primary_language(&self, repo: &RepoRef) -> FetchResult<Option<String>> {
        Ok(self.repository_metadata(repo).await?.language)
    }
}
