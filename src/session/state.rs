//! Session state machine
//!
//! Tracks the broadcast from start command to stop or end of track.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::broadcast::BroadcastSink;
use crate::pipeline::PipelineHandle;
use crate::stats::StatsSnapshot;
use crate::track::{Bitrate, Track};

/// Broadcast lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// No broadcast running
    Idle,
    /// Probing the track and assembling the pipeline
    Starting,
    /// Pipeline connected and emitting
    Streaming,
    /// Pipeline being torn down
    Stopping,
}

impl SessionPhase {
    /// Check if a broadcast is starting or running
    pub fn is_live(self) -> bool {
        matches!(self, SessionPhase::Starting | SessionPhase::Streaming)
    }
}

/// One active broadcast
///
/// Owned exclusively by the session controller.
#[derive(Debug)]
pub struct Session {
    /// Unique session ID
    pub id: u64,

    /// Track being broadcast
    pub track: Track,

    /// Bitrate sampled when the session started
    pub bitrate: Bitrate,

    /// Pacing rate derived from the bitrate
    pub bytes_per_second: u64,

    /// When the pipeline was assembled
    pub started_at: Instant,

    /// Fan-out stage, kept for its counters
    pub(super) sink: BroadcastSink,

    /// Running pipeline
    pub(super) handle: PipelineHandle,
}

impl Session {
    /// Get session duration
    pub fn duration(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Current broadcast counters
    pub fn stats(&self) -> StatsSnapshot {
        self.sink.stats().snapshot()
    }
}

/// Serializable view of the controller
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    /// Current phase
    pub phase: SessionPhase,
    /// Track of the active session, if any
    pub track: Option<String>,
    /// Track that the next start will use
    pub selected_track: String,
    /// Sampled bitrate in bits per second
    pub bitrate: Option<u64>,
    /// Pacing rate in bytes per second
    pub bytes_per_second: Option<u64>,
    /// Rate actually emitted so far, in bits per second
    pub observed_bitrate: Option<u64>,
    /// Registered listeners
    pub listeners: usize,
    /// Counters of the active session
    pub stats: Option<StatsSnapshot>,
}
