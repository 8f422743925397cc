//! Periodic triggering of reconciliation passes
//!
//! The reconciler knows nothing about time. A [`Scheduler`] decides when the
//! next pass starts and [`run`] drives the loop until the scheduler runs dry
//! or shutdown is requested.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::info;

use super::Reconciler;

/// Source of pass triggers
#[async_trait]
pub trait Scheduler: Send {
    /// Wait for the next trigger; `false` means no more passes should run
    async fn tick(&mut self) -> bool;
}

/// Fires every `period`, starting immediately
///
/// A pass that overruns the period swallows the missed ticks instead of
/// queueing them, so passes never overlap.
#[derive(Debug)]
pub struct IntervalScheduler {
    interval: Interval,
}

impl IntervalScheduler {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }
}

#[async_trait]
impl Scheduler for IntervalScheduler {
    async fn tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}

/// Fires a fixed number of times without waiting
#[derive(Debug, Clone, Copy)]
pub struct CountedScheduler {
    remaining: usize,
}

impl CountedScheduler {
    pub fn new(passes: usize) -> Self {
        Self { remaining: passes }
    }
}

#[async_trait]
impl Scheduler for CountedScheduler {
    async fn tick(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

/// Run passes on every tick until the scheduler stops or `shutdown` resolves
///
/// A pass in progress at shutdown is dropped; the next start picks up from
/// stored state. Returns the number of completed passes.
pub async fn run<S, F>(reconciler: &Reconciler, scheduler: &mut S, shutdown: F) -> usize
where
    S: Scheduler + ?Sized,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut passes = 0;

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            more = scheduler.tick() => {
                if !more {
                    break;
                }
            }
        }

        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested, abandoning current pass");
                break;
            }
            summary = reconciler.run_pass() => {
                summary.log();
                passes += 1;
            }
        }
    }

    info!(passes, "Scheduler stopped");
    passes
}
