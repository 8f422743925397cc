//! CLI command implementations

pub mod issues;
pub mod project;
pub mod repos;
pub mod sync;

pub use issues::IssuesArgs;
pub use project::ProjectArgs;
pub use repos::{LinkArgs, TrackArgs, UntrackArgs};

use fixme_core::Config;
use fixme_db::Database;
use serde::Serialize;

/// Open the database named by the configuration
pub async fn open_database(config: &Config) -> anyhow::Result<Database> {
    let path = config.database_path()?;
    Database::new(&path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open database {}: {}", path.display(), e))
}

/// Print a value as pretty JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
