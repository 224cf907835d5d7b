//! Session controller
//!
//! Owns the single active broadcast and exposes the command surface used by
//! the transport layer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{watch, Mutex, RwLock};

use crate::broadcast::BroadcastSink;
use crate::config::{CommandPolicy, RelayConfig};
use crate::error::Result;
use crate::pipeline::{PipelineExit, ThrottledPipeline};
use crate::probe::{BitrateProbe, ProbeTool, SoxTool};
use crate::registry::{ClientRegistry, ListenerId, ListenerStream};
use crate::stats::StatsSnapshot;
use crate::track::{Bitrate, Track};

use super::command::{Command, CommandResponse};
use super::state::{Session, SessionPhase, SessionStatus};

/// The active session and its observable phase
///
/// Shared with the task that watches for the pipeline ending on its own.
#[derive(Debug)]
struct SessionSlot {
    current: Mutex<Option<Session>>,
    phase: watch::Sender<SessionPhase>,
}

impl SessionSlot {
    fn set_phase(&self, phase: SessionPhase) {
        self.phase.send_replace(phase);
    }

    /// Tear a session down; the caller has already taken it out of `current`
    async fn end(&self, session: Session) -> PipelineExit {
        self.set_phase(SessionPhase::Stopping);

        let id = session.id;
        let track = session.track.clone();
        let duration = session.duration();
        let stats = session.stats();
        let exit = session.handle.stop().await;

        self.set_phase(SessionPhase::Idle);

        match &exit {
            PipelineExit::Failed(error) => tracing::error!(
                session_id = id,
                track = %track,
                error = %error,
                "Broadcast failed"
            ),
            _ => tracing::info!(
                session_id = id,
                track = %track,
                exit = ?exit,
                duration_secs = duration.as_secs(),
                bytes = stats.bytes,
                pruned_listeners = stats.pruned_listeners,
                "Broadcast ended"
            ),
        }

        exit
    }
}

/// Controls the broadcast lifecycle
///
/// At most one session is active. Starting while a session is live replaces
/// it; stopping while idle does nothing.
pub struct SessionController<T: ProbeTool = SoxTool> {
    config: RelayConfig,
    probe: BitrateProbe<T>,
    registry: Arc<ClientRegistry>,
    track: RwLock<Track>,
    slot: Arc<SessionSlot>,
    start_lock: Mutex<()>,
    stop_epoch: AtomicU64,
    next_session_id: AtomicU64,
}

impl SessionController<SoxTool> {
    /// Create a controller that probes with `sox` and owns a fresh registry
    pub fn with_config(config: RelayConfig) -> Self {
        let tool = SoxTool::new(config.probe_program.clone(), config.probe_timeout);
        Self::new(config, tool, Arc::new(ClientRegistry::new()))
    }
}

impl<T: ProbeTool> SessionController<T> {
    /// Create a controller with an injected probe tool and registry
    pub fn new(config: RelayConfig, tool: T, registry: Arc<ClientRegistry>) -> Self {
        let fallback = Bitrate::clamped(config.fallback_bitrate);
        let (phase, _) = watch::channel(SessionPhase::Idle);

        Self {
            track: RwLock::new(Track::new(config.default_track.clone())),
            probe: BitrateProbe::new(tool, fallback),
            registry,
            slot: Arc::new(SessionSlot {
                current: Mutex::new(None),
                phase,
            }),
            start_lock: Mutex::new(()),
            stop_epoch: AtomicU64::new(0),
            next_session_id: AtomicU64::new(1),
            config,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Get the listener registry
    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    /// Current phase
    pub fn phase(&self) -> SessionPhase {
        *self.slot.phase.borrow()
    }

    /// Watch phase changes
    pub fn subscribe_phase(&self) -> watch::Receiver<SessionPhase> {
        self.slot.phase.subscribe()
    }

    /// Track the next start will broadcast
    pub async fn track(&self) -> Track {
        self.track.read().await.clone()
    }

    /// Replace the track used by the next start
    ///
    /// A running session keeps its track until it is stopped or restarted.
    pub async fn select_track(&self, track: Track) {
        tracing::info!(track = %track, "Track selected");
        *self.track.write().await = track;
    }

    /// Handle free-text command input
    ///
    /// Always acknowledges with `ok` unless the strict policy rejects the
    /// text; a failed start is logged, not reported.
    pub async fn handle_command(&self, text: &str) -> CommandResponse {
        let command = Command::parse(text);
        tracing::info!(text = text, command = ?command, "Command received");

        match (command, self.config.command_policy) {
            (Command::Stop, _) => {
                self.stop().await;
                CommandResponse::ok()
            }
            (Command::Start, _) | (Command::Unknown, CommandPolicy::Lenient) => {
                if let Err(e) = self.start().await {
                    tracing::error!(error = %e, "Failed to start broadcast");
                }
                CommandResponse::ok()
            }
            (Command::Unknown, CommandPolicy::Strict) => {
                tracing::warn!(text = text, "Unknown command rejected");
                CommandResponse::unknown_command()
            }
        }
    }

    /// Start broadcasting the selected track, replacing any live session
    ///
    /// Returns an error if the track cannot be opened; the controller is
    /// left idle in that case. The probe runs without holding the session
    /// lock, so status and stop stay responsive; a stop issued while the
    /// start is probing cancels it.
    pub async fn start(&self) -> Result<()> {
        let _starting = self.start_lock.lock().await;

        let epoch = {
            let mut current = self.slot.current.lock().await;

            if let Some(previous) = current.take() {
                tracing::info!(session_id = previous.id, "Restarting broadcast");
                self.slot.end(previous).await;
            }

            self.slot.set_phase(SessionPhase::Starting);
            self.stop_epoch.load(Ordering::Acquire)
        };

        let track = self.track().await;
        let bitrate = self.probe.detect(&track).await;
        let bytes_per_second = bitrate.pacing_rate(self.config.bitrate_divisor);

        let mut current = self.slot.current.lock().await;

        if self.stop_epoch.load(Ordering::Acquire) != epoch {
            tracing::info!(track = %track, "Start cancelled by stop");
            self.slot.set_phase(SessionPhase::Idle);
            return Ok(());
        }

        let sink = BroadcastSink::new(Arc::clone(&self.registry));
        let handle = match ThrottledPipeline::spawn(&track, bytes_per_second, sink.clone()).await {
            Ok(handle) => handle,
            Err(e) => {
                self.slot.set_phase(SessionPhase::Idle);
                return Err(e);
            }
        };

        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        let finished = handle.finished();

        *current = Some(Session {
            id,
            track: track.clone(),
            bitrate,
            bytes_per_second,
            started_at: Instant::now(),
            sink,
            handle,
        });
        self.slot.set_phase(SessionPhase::Streaming);
        drop(current);

        let listeners = self.registry.len().await;
        tracing::info!(
            session_id = id,
            track = %track,
            bitrate = %bitrate,
            bytes_per_second = bytes_per_second,
            listeners = listeners,
            "Broadcast started"
        );

        // End the session when the pipeline finishes on its own
        let slot = Arc::clone(&self.slot);
        tokio::spawn(async move {
            finished.await;

            let mut current = slot.current.lock().await;
            if current.as_ref().is_some_and(|session| session.id == id) {
                if let Some(session) = current.take() {
                    slot.end(session).await;
                }
            }
        });

        Ok(())
    }

    /// Stop the live session, or cancel a start that is still probing
    ///
    /// Returns `false` when there was nothing to stop.
    pub async fn stop(&self) -> bool {
        self.stop_epoch.fetch_add(1, Ordering::AcqRel);
        let mut current = self.slot.current.lock().await;

        match current.take() {
            Some(session) => {
                self.slot.end(session).await;
                true
            }
            None if self.phase() == SessionPhase::Starting => {
                tracing::info!("Stop requested while starting");
                true
            }
            None => {
                tracing::debug!("Stop ignored, no active broadcast");
                false
            }
        }
    }

    /// Register a new listener
    pub async fn attach_listener(&self) -> (ListenerId, ListenerStream) {
        self.registry.register().await
    }

    /// Unregister a listener; unknown ids are ignored
    pub async fn detach_listener(&self, id: &ListenerId) {
        self.registry.unregister(id).await;
    }

    /// Snapshot of the controller for reporting
    pub async fn status(&self) -> SessionStatus {
        let selected_track = self.track().await.to_string();
        let listeners = self.registry.len().await;
        let current = self.slot.current.lock().await;
        let stats = current.as_ref().map(|s| s.stats());

        SessionStatus {
            phase: self.phase(),
            track: current.as_ref().map(|s| s.track.to_string()),
            selected_track,
            bitrate: current.as_ref().map(|s| s.bitrate.bits_per_second()),
            bytes_per_second: current.as_ref().map(|s| s.bytes_per_second),
            observed_bitrate: stats.as_ref().map(StatsSnapshot::bitrate),
            listeners,
            stats,
        }
    }
}
