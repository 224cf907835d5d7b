//! Statistics for broadcast sessions

pub mod metrics;

pub use metrics::{BroadcastStats, StatsSnapshot};
