//! Read API commands over stored issues

use clap::Args;
use fixme_core::{Config, RepoRef};
use fixme_db::{IssueQuery, Ordering};

use super::{open_database, print_json};

/// List stored issues as JSON
///
/// Filters take comma-separated values (`rust,go` or `["rust","go"]`) and
/// match any of them.
#[derive(Args, Debug)]
pub struct IssuesArgs {
    #[arg(long)]
    language: Option<String>,

    #[arg(long)]
    tech_stack: Option<String>,

    /// easy, moderate or senior
    #[arg(long)]
    experience_needed: Option<String>,

    #[arg(long)]
    expected_time: Option<String>,

    /// bugfix, enhancement or unclassified
    #[arg(long)]
    issue_type: Option<String>,

    /// Only issues of this repository
    #[arg(short, long)]
    repo: Option<String>,

    /// experience_needed or expected_time, prefix with '-' for descending
    #[arg(short, long, allow_hyphen_values = true)]
    ordering: Option<String>,
}

impl IssuesArgs {
    fn query(&self) -> anyhow::Result<IssueQuery> {
        let mut query = IssueQuery::new();
        if let Some(ref v) = self.language {
            query = query.language(v);
        }
        if let Some(ref v) = self.tech_stack {
            query = query.tech_stack(v);
        }
        if let Some(ref v) = self.experience_needed {
            query = query.experience_needed(v)?;
        }
        if let Some(ref v) = self.expected_time {
            query = query.expected_time(v);
        }
        if let Some(ref v) = self.issue_type {
            query = query.issue_type(v)?;
        }
        if let Some(ref repo) = self.repo {
            query = query.repository(RepoRef::parse(repo)?);
        }
        if let Some(ref ordering) = self.ordering {
            query = query.ordering(ordering.parse::<Ordering>()?);
        }
        Ok(query)
    }

    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let query = self.query()?;
        let db = open_database(config).await?;
        print_json(&db.issues().list(&query).await?)
    }
}

/// Print the distinct language, tech stack and experience values as JSON
pub async fn metadata(config: &Config) -> anyhow::Result<()> {
    let db = open_database(config).await?;
    print_json(&db.issues().metadata().await?)
}
