//! Real-time pacing stage

use std::time::Duration;

use tokio::time::Instant;

/// Largest chunk released at once
pub const MAX_CHUNK_SIZE: usize = 64 * 1024;

/// Chunks released per second of audio at the configured rate
const CHUNKS_PER_SECOND: u64 = 10;

/// Releases bytes no faster than a fixed rate
///
/// The first chunk leaves immediately; every later chunk waits until the
/// bytes already released would have taken that long to play.
#[derive(Debug)]
pub struct Throttle {
    bytes_per_second: u64,
    started_at: Option<Instant>,
    released: u64,
}

impl Throttle {
    /// Create a throttle for `bytes_per_second` (zero is treated as one)
    pub fn new(bytes_per_second: u64) -> Self {
        Self {
            bytes_per_second: bytes_per_second.max(1),
            started_at: None,
            released: 0,
        }
    }

    /// Configured rate in bytes per second
    pub fn bytes_per_second(&self) -> u64 {
        self.bytes_per_second
    }

    /// Bytes released so far
    pub fn released(&self) -> u64 {
        self.released
    }

    /// Read size that gives roughly ten chunks per second
    pub fn chunk_size(&self) -> usize {
        let size = (self.bytes_per_second / CHUNKS_PER_SECOND).max(1);
        usize::try_from(size).map_or(MAX_CHUNK_SIZE, |size| size.min(MAX_CHUNK_SIZE))
    }

    /// Wait until a chunk of `len` bytes may be released, then account for it
    ///
    /// Cancel safe: if the wait is dropped the chunk is not counted.
    pub async fn acquire(&mut self, len: usize) {
        let started_at = *self.started_at.get_or_insert_with(Instant::now);
        let due = started_at + self.elapsed_for(self.released);

        tokio::time::sleep_until(due).await;

        self.released += len as u64;
    }

    fn elapsed_for(&self, bytes: u64) -> Duration {
        let nanos = u128::from(bytes) * 1_000_000_000 / u128::from(self.bytes_per_second);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}
