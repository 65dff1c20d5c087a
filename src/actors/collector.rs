//! CollectorActor - Polls the station API and stores each batch
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick → Fetch all sources → Parse snapshots → StationStore::save(batch)
//!     ↑
//!     └─── Commands (PollNow, UpdateInterval, GetStats, Shutdown)
//! ```
//!
//! A failing cycle (unreachable API, malformed response, storage error) is
//! logged and abandoned. The actor keeps its schedule and tries again on
//! the next tick.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{SubsecRound, Utc};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior, interval};
use tracing::{debug, error, info, instrument, warn};

use crate::fetcher::StationFetcher;
use crate::storage::StationStore;

use super::messages::{CollectorCommand, CollectorStats, CycleReport};

/// Actor that runs fetch-and-store cycles on a timer
pub struct CollectorActor {
    fetcher: StationFetcher,

    store: Box<dyn StationStore>,

    /// Command receiver for control messages
    command_rx: mpsc::Receiver<CollectorCommand>,

    /// Current polling interval
    interval_duration: Duration,

    stats: CollectorStats,
}

impl CollectorActor {
    /// Create a new collector actor
    ///
    /// A zero interval is raised to one second; use [`run_once`] for a
    /// single collection.
    pub fn new(
        fetcher: StationFetcher,
        store: Box<dyn StationStore>,
        command_rx: mpsc::Receiver<CollectorCommand>,
        interval_secs: u64,
    ) -> Self {
        if interval_secs == 0 {
            warn!("poll interval of 0s is not usable for periodic polling, using 1s");
        }

        Self {
            fetcher,
            store,
            command_rx,
            interval_duration: Duration::from_secs(interval_secs.max(1)),
            stats: CollectorStats::default(),
        }
    }

    fn ticker(&self) -> Interval {
        let mut ticker = interval(self.interval_duration);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }

    /// Run the actor's main loop
    ///
    /// The first cycle starts immediately. The loop runs until:
    /// - A Shutdown command is received
    /// - The command channel is closed
    #[instrument(skip(self), fields(interval = ?self.interval_duration))]
    pub async fn run(mut self) {
        debug!("starting collector actor");

        let mut ticker = self.ticker();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Errors are already logged and counted
                    let _ = self.run_cycle().await;
                }

                cmd = self.command_rx.recv() => {
                    let Some(cmd) = cmd else {
                        debug!("every handle dropped, shutting down");
                        break;
                    };

                    match cmd {
                        CollectorCommand::PollNow { respond_to } => {
                            debug!("received PollNow command");
                            let result = self.run_cycle().await;
                            let _ = respond_to.send(result);
                        }

                        CollectorCommand::UpdateInterval { interval_secs: 0 } => {
                            warn!("ignoring interval update to 0s");
                        }

                        CollectorCommand::UpdateInterval { interval_secs } => {
                            debug!("updating interval to {interval_secs}s");
                            self.interval_duration = Duration::from_secs(interval_secs);
                            ticker = self.ticker();
                            // interval() ticks immediately, skip that tick
                            ticker.reset();
                        }

                        CollectorCommand::GetStats { respond_to } => {
                            let _ = respond_to.send(self.stats.clone());
                        }

                        CollectorCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }
            }
        }

        if let Err(e) = self.store.close().await {
            error!("error closing storage backend: {}", e);
        }

        debug!("collector actor stopped");
    }

    /// Run one cycle and update the counters
    async fn run_cycle(&mut self) -> Result<CycleReport> {
        match collect_and_store(&self.fetcher, self.store.as_ref()).await {
            Ok(report) => {
                self.stats.cycles_completed += 1;
                self.stats.snapshots_saved += report.stations as u64;
                self.stats.last_success = Some(report.retrieved_at);
                Ok(report)
            }
            Err(e) => {
                self.stats.cycles_failed += 1;
                Err(e)
            }
        }
    }
}

/// Fetch every source once and save the batch
///
/// Errors are logged here and returned to the caller; the cycle is then
/// considered skipped.
#[instrument(skip_all)]
pub async fn collect_and_store(
    fetcher: &StationFetcher,
    store: &dyn StationStore,
) -> Result<CycleReport> {
    let retrieved_at = Utc::now().trunc_subsecs(3);

    let result = async {
        let batch = fetcher
            .fetch(retrieved_at)
            .await
            .context("failed to fetch stations")?;

        store
            .save(&batch)
            .await
            .context("failed to save station batch")?;

        Ok::<_, anyhow::Error>(CycleReport {
            retrieved_at,
            stations: batch.len(),
        })
    }
    .await;

    match &result {
        Ok(report) => info!(
            "stored {} station snapshots retrieved at {}",
            report.stations, report.retrieved_at
        ),
        Err(e) => error!("cycle skipped: {:#}", e),
    }

    result
}

/// Collect a single batch, then close the store
pub async fn run_once(fetcher: StationFetcher, store: Box<dyn StationStore>) -> Result<CycleReport> {
    let result = collect_and_store(&fetcher, store.as_ref()).await;

    if let Err(e) = store.close().await {
        error!("error closing storage backend: {}", e);
    }

    result
}

/// Handle for controlling a CollectorActor
///
/// This handle provides a typed API for sending commands to the actor.
/// It can be cloned and shared across tasks.
#[derive(Clone)]
pub struct CollectorHandle {
    sender: mpsc::Sender<CollectorCommand>,
}

impl CollectorHandle {
    /// Spawn a new collector actor
    pub fn spawn(fetcher: StationFetcher, store: Box<dyn StationStore>, interval_secs: u64) -> Self {
        Self::spawn_with_task(fetcher, store, interval_secs).0
    }

    /// Spawn a new collector actor and keep its task handle
    ///
    /// Awaiting the task waits until the actor has shut down and closed
    /// its store.
    pub fn spawn_with_task(
        fetcher: StationFetcher,
        store: Box<dyn StationStore>,
        interval_secs: u64,
    ) -> (Self, JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = CollectorActor::new(fetcher, store, cmd_rx, interval_secs);
        let task = tokio::spawn(actor.run());

        (Self { sender: cmd_tx }, task)
    }

    /// Run a cycle immediately and wait for its outcome
    pub async fn poll_now(&self) -> Result<CycleReport> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(CollectorCommand::PollNow { respond_to: tx })
            .await
            .context("failed to send PollNow command")?;

        rx.await.context("failed to receive response")?
    }

    /// Update the polling interval
    pub async fn update_interval(&self, interval_secs: u64) -> Result<()> {
        self.sender
            .send(CollectorCommand::UpdateInterval { interval_secs })
            .await
            .context("failed to send UpdateInterval command")?;
        Ok(())
    }

    pub async fn get_stats(&self) -> Result<CollectorStats> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(CollectorCommand::GetStats { respond_to: tx })
            .await
            .context("failed to send GetStats command")?;

        rx.await.context("failed to receive stats")
    }

    /// Gracefully shut down the collector
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(CollectorCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }
}
