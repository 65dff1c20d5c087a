pub mod actors;
pub mod config;
pub mod fetcher;
pub mod station;
pub mod storage;

pub use station::{StationSnapshot, StationStatus};
