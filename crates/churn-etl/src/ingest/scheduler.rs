//! Interval scheduler
//!
//! Runs the orchestrator once at startup and then every `interval` until
//! shutdown is signalled. Each run is awaited before the next tick, so runs
//! never overlap; ticks missed during a long run are not replayed.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};

use super::orchestrator::BatchOrchestrator;

pub struct Scheduler {
    orchestrator: Arc<BatchOrchestrator>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(orchestrator: Arc<BatchOrchestrator>, interval: Duration) -> Self {
        Self {
            orchestrator,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    async fn tick(&self) {
        match self.orchestrator.run_once().await {
            Ok(summary) if summary.skipped => {}
            Ok(summary) => info!(
                archived = summary.archived,
                failed = summary.failed,
                "Scheduled run finished"
            ),
            Err(e) => error!(error = %e, "Scheduled run failed"),
        }
    }

    /// Run until `shutdown` resolves; returns the number of runs started.
    ///
    /// A run in progress when shutdown arrives is finished first.
    pub async fn run<F>(self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        info!(
            interval_secs = self.interval.as_secs(),
            feed_dir = %self.orchestrator.feed().feed_dir.display(),
            "Scheduler started"
        );

        self.tick().await;
        let mut runs = 1u64;

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!(runs, "Shutdown signal received, stopping scheduler");
                    break;
                }
                _ = ticker.tick() => {
                    self.tick().await;
                    runs += 1;
                }
            }
        }

        runs
    }
}
