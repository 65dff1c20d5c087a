//! Message types for the collector actor
//!
//! Commands are sent to the actor over an mpsc channel; replies come back
//! on oneshot channels.

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

/// Commands that can be sent to a CollectorActor
#[derive(Debug)]
pub enum CollectorCommand {
    /// Run one fetch-and-store cycle now (bypassing the interval timer)
    ///
    /// Used for testing and manual refresh operations.
    PollNow {
        /// Channel to send the cycle result back
        respond_to: oneshot::Sender<anyhow::Result<CycleReport>>,
    },

    /// Update the polling interval
    ///
    /// The new interval starts counting from the moment it is applied.
    UpdateInterval {
        /// New interval in seconds, must be positive
        interval_secs: u64,
    },

    /// Get cycle counters
    GetStats {
        respond_to: oneshot::Sender<CollectorStats>,
    },

    /// Gracefully shut down the collector
    ///
    /// The actor finishes any in-flight cycle, closes the store and exits.
    Shutdown,
}

/// Outcome of a successful cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Retrieval timestamp shared by the batch
    pub retrieved_at: DateTime<Utc>,

    /// Number of snapshots saved
    pub stations: usize,
}

/// Collector statistics
#[derive(Debug, Clone, Default)]
pub struct CollectorStats {
    /// Cycles whose batch was saved
    pub cycles_completed: u64,

    /// Cycles abandoned because fetching or saving failed
    pub cycles_failed: u64,

    /// Snapshots saved across all cycles
    pub snapshots_saved: u64,

    /// Retrieval time of the last saved batch
    pub last_success: Option<DateTime<Utc>>,
}
