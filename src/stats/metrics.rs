//! Broadcast counters

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Live counters for one broadcast session
///
/// Updated by the broadcast sink on every chunk; readable from any task.
#[derive(Debug)]
pub struct BroadcastStats {
    started_at: Instant,
    chunks: AtomicU64,
    bytes: AtomicU64,
    deliveries: AtomicU64,
    pruned: AtomicU64,
}

impl BroadcastStats {
    /// Create zeroed counters starting now
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            chunks: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            pruned: AtomicU64::new(0),
        }
    }

    /// Record one chunk fanned out to `delivered` listeners
    pub fn record_chunk(&self, len: usize, delivered: usize) {
        self.chunks.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(len as u64, Ordering::Relaxed);
        self.deliveries.fetch_add(delivered as u64, Ordering::Relaxed);
    }

    /// Record listeners removed because their stream closed
    pub fn record_pruned(&self, count: usize) {
        self.pruned.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Take a consistent-enough copy of the counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            chunks: self.chunks.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            pruned_listeners: self.pruned.load(Ordering::Relaxed),
            duration: self.started_at.elapsed(),
        }
    }
}

impl Default for BroadcastStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`BroadcastStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Chunks emitted by the pipeline
    pub chunks: u64,
    /// Bytes emitted by the pipeline
    pub bytes: u64,
    /// Chunk writes that reached a listener
    pub deliveries: u64,
    /// Listeners removed after their stream closed
    pub pruned_listeners: u64,
    /// Time since the counters were created
    #[serde(serialize_with = "serialize_secs")]
    pub duration: Duration,
}

impl StatsSnapshot {
    /// Observed emission rate in bits per second
    pub fn bitrate(&self) -> u64 {
        let millis = self.duration.as_millis() as u64;
        if millis > 0 {
            self.bytes * 8 * 1000 / millis
        } else {
            0
        }
    }
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}
