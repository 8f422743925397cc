//! Tracked repository commands

use clap::Args;
use fixme_core::{Config, RepoRef};

use super::{open_database, print_json};

/// Start polling a repository
#[derive(Args, Debug)]
pub struct TrackArgs {
    /// Repository (owner/repo, https URL or git@ URL)
    repo: String,

    /// Project to attach the repository to
    #[arg(short, long)]
    project: Option<i64>,
}

impl TrackArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let repo = RepoRef::parse(&self.repo)?;
        let db = open_database(config).await?;
        let tracked = db.repositories().track(&repo, self.project).await?;
        println!("Tracking {} (id {})", tracked.repo_ref(), tracked.id);
        Ok(())
    }
}

/// Stop polling a repository and drop its stored issues
#[derive(Args, Debug)]
pub struct UntrackArgs {
    /// Repository (owner/repo, https URL or git@ URL)
    repo: String,
}

impl UntrackArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let repo = RepoRef::parse(&self.repo)?;
        let db = open_database(config).await?;
        db.repositories().untrack(&repo).await?;
        println!("Stopped tracking {}", repo);
        Ok(())
    }
}

/// Attach a repository to a project, or detach it when no project is given
#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Repository (owner/repo, https URL or git@ URL)
    repo: String,

    /// Project id; omit to clear the link
    #[arg(short, long)]
    project: Option<i64>,
}

impl LinkArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let repo = RepoRef::parse(&self.repo)?;
        let db = open_database(config).await?;
        let tracked = db.repositories().link(&repo, self.project).await?;
        match tracked.project_id {
            Some(project) => println!("Linked {} to project {}", repo, project),
            None => println!("Unlinked {}", repo),
        }
        Ok(())
    }
}

/// Print tracked repositories as JSON
pub async fn list(config: &Config) -> anyhow::Result<()> {
    let db = open_database(config).await?;
    print_json(&db.repositories().list().await?)
}
