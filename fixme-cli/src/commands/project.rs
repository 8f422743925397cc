//! Project commands

use clap::{Args, Subcommand};
use fixme_core::Config;
use fixme_db::NewProject;

use super::{open_database, print_json};

/// Project management commands
#[derive(Args, Debug)]
pub struct ProjectArgs {
    #[command(subcommand)]
    pub command: ProjectCommand,
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// Create a project
    Add {
        /// Display name (unique)
        display_name: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Primary color, e.g. #ff0000
        #[arg(long, default_value = "")]
        first_color: String,

        /// Secondary color
        #[arg(long, default_value = "")]
        second_color: String,

        /// Logo URL
        #[arg(long)]
        logo: Option<String>,

        /// Project home page
        #[arg(long, default_value = "")]
        link: String,

        /// Rough time to get a development setup running
        #[arg(long, default_value = "")]
        setup_duration: String,

        /// Comma-separated tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },

    /// List projects with their issue counts as JSON
    List,
}

impl ProjectArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let db = open_database(config).await?;

        match &self.command {
            ProjectCommand::Add {
                display_name,
                description,
                first_color,
                second_color,
                logo,
                link,
                setup_duration,
                tags,
            } => {
                let project = NewProject {
                    display_name: display_name.clone(),
                    first_color: first_color.clone(),
                    second_color: second_color.clone(),
                    description: description.clone(),
                    logo: logo.clone(),
                    link: link.clone(),
                    setup_duration: setup_duration.clone(),
                    tags: tags.iter().map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect(),
                };
                let created = db.projects().create(&project).await?;
                println!("Created project {} (id {})", created.display_name, created.id);
            }
            ProjectCommand::List => {
                print_json(&db.projects().list().await?)?;
            }
        }
        Ok(())
    }
}
