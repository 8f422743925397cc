//! One-shot and scheduled reconciliation

use std::sync::Arc;

use fixme_core::sync::scheduler::{self, IntervalScheduler};
use fixme_core::{Config, ExtractionStrategy, Reconciler};
use fixme_github::GitHubClient;
use tracing::{info, warn};

use super::{open_database, print_json};

/// Wire the GitHub client, the database and the configured strategy together
async fn build_reconciler(config: &Config) -> anyhow::Result<Reconciler> {
    let db = Arc::new(open_database(config).await?);
    let client = Arc::new(GitHubClient::from_config(&config.github)?);
    let strategy: Arc<dyn ExtractionStrategy> = Arc::from(config.sync.strategy.build());

    info!(
        strategy = strategy.name(),
        concurrency = config.sync.concurrency,
        "Reconciler ready"
    );

    Ok(Reconciler::new(client, db, strategy)
        .with_concurrency(config.sync.concurrency)
        .with_language_lookup(config.sync.fetch_language))
}

/// Run a single pass and print its summary as JSON
pub async fn sync_once(config: &Config) -> anyhow::Result<()> {
    let reconciler = build_reconciler(config).await?;
    let summary = reconciler.run_pass().await;
    summary.log();
    print_json(&summary)?;

    if let Some(error) = summary.error {
        anyhow::bail!("Reconciliation pass failed: {}", error);
    }
    Ok(())
}

/// Reconcile every tracked repository on a fixed period until Ctrl-C
pub async fn daemon(config: &Config) -> anyhow::Result<()> {
    let period = config.sync.interval;
    if period.is_zero() {
        anyhow::bail!("sync.interval must be greater than zero");
    }
    let reconciler = build_reconciler(config).await?;

    info!(interval_secs = period.as_secs(), "Starting scheduled reconciliation");
    let mut ticker = IntervalScheduler::new(period);
    let passes = scheduler::run(&reconciler, &mut ticker, shutdown_signal()).await;
    info!(passes, "Daemon stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl-C"),
        Err(e) => {
            warn!(error = %e, "Cannot listen for Ctrl-C, running until killed");
            std::future::pending::<()>().await;
        }
    }
}

