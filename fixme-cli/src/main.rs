//! fixme CLI - command line interface for the issue ingestion pipeline
//!
//! Tracks GitHub repositories, reconciles their open issues into SQLite and
//! serves the stored issues as JSON.

mod commands;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use fixme_core::config::parse_interval;
use fixme_core::{CliOverrides, Config, Secrets, StrategyKind};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{IssuesArgs, LinkArgs, ProjectArgs, TrackArgs, UntrackArgs};

/// fixme: collect beginner-friendly GitHub issues into a searchable store
#[derive(Parser, Debug)]
#[command(name = "fixme")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// SQLite database file (overrides config and env)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Field extraction strategy: labels or free-text (overrides config and env)
    #[arg(long, global = true, value_parser = parse_strategy)]
    strategy: Option<StrategyKind>,

    /// Time between scheduled passes, e.g. 15m (overrides config and env)
    #[arg(long, global = true, value_parser = parse_duration)]
    interval: Option<Duration>,

    /// GitHub API base URL (overrides config and env)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Start polling a repository
    Track(TrackArgs),

    /// Stop polling a repository and remove its issues
    Untrack(UntrackArgs),

    /// Attach a repository to a project
    Link(LinkArgs),

    /// List tracked repositories as JSON
    Repos,

    /// Manage projects
    Project(ProjectArgs),

    /// Run one reconciliation pass now
    Sync,

    /// Run reconciliation passes on the configured interval until Ctrl-C
    Daemon,

    /// List stored issues as JSON
    #[command(visible_alias = "ls")]
    Issues(IssuesArgs),

    /// Show distinct languages, tech stacks and experience levels as JSON
    Meta,

    /// Show current configuration
    Config,
}

fn parse_strategy(value: &str) -> Result<StrategyKind, String> {
    value.parse().map_err(|e: fixme_core::Error| e.to_string())
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    parse_interval(value).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    // Load configuration with overrides
    let config = Config::load_with_overrides(CliOverrides {
        database: cli.database.clone(),
        strategy: cli.strategy,
        interval: cli.interval,
        api_url: cli.api_url.clone(),
    })?;

    tracing::debug!(
        api_url = %config.github.api_url,
        strategy = config.sync.strategy.as_str(),
        interval_secs = config.sync.interval.as_secs(),
        "Configuration loaded"
    );

    match cli.command {
        Some(Commands::Version) => {
            println!("fixme {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Track(args)) => args.execute(&config).await?,
        Some(Commands::Untrack(args)) => args.execute(&config).await?,
        Some(Commands::Link(args)) => args.execute(&config).await?,
        Some(Commands::Repos) => commands::repos::list(&config).await?,
        Some(Commands::Project(args)) => args.execute(&config).await?,
        Some(Commands::Sync) => commands::sync::sync_once(&config).await?,
        Some(Commands::Daemon) => commands::sync::daemon(&config).await?,
        Some(Commands::Issues(args)) => args.execute(&config).await?,
        Some(Commands::Meta) => commands::issues::metadata(&config).await?,
        Some(Commands::Config) => print_config(&config)?,
        None => {
            println!("fixme - GitHub issue ingestion");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}

fn print_config(config: &Config) -> anyhow::Result<()> {
    println!("fixme Configuration");
    println!("===================");
    println!();
    println!("GitHub:");
    println!("  api_url: {}", config.github.api_url);
    println!("  timeout: {}s", config.github.timeout.as_secs());
    match config.github.per_page {
        Some(per_page) => println!("  per_page: {}", per_page),
        None => println!("  per_page: (upstream default)"),
    }
    println!("  max_pages: {}", config.github.max_pages);
    let token = Secrets::load().ok().and_then(|s| s.github_token());
    println!("  token: {}", if token.is_some() { "(set)" } else { "(not set)" });
    println!();
    println!("Sync:");
    println!("  interval: {}s", config.sync.interval.as_secs());
    println!("  strategy: {}", config.sync.strategy.as_str());
    println!("  concurrency: {}", config.sync.concurrency);
    println!("  fetch_language: {}", config.sync.fetch_language);
    println!();
    println!("Database:");
    println!("  path: {}", config.database_path()?.display());
    println!();
    if let Some(path) = Config::default_config_path() {
        println!("Config file: {}", path.display());
        if path.exists() {
            println!("  (exists)");
        } else {
            println!("  (not found - using defaults)");
        }
    }
    Ok(())
}
