//! Actor-based collector
//!
//! The collector runs as a single Tokio task that owns the fetcher and the
//! storage backend. It is controlled through a cloneable handle that sends
//! commands over an mpsc channel.
//!
//! ```text
//! Timer tick ──┐
//!              ├─► fetch all sources ─► StationStore::save(batch)
//! PollNow  ────┘
//! ```
//!
//! Cycles run one at a time inside the actor loop, so two fetches never
//! overlap and the backend is never written concurrently.

pub mod collector;
pub mod messages;
