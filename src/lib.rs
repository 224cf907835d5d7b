//! Live single-source audio broadcast relay
//!
//! Reads one audio file, paces it to approximately real playback speed and
//! fans the bytes out to every connected listener.
//!
//! ```text
//!   SessionController::start()
//!        │
//!        ├─► BitrateProbe::detect(track) ── sox --i -B ──► Bitrate (or fallback)
//!        │
//!        └─► ThrottledPipeline::spawn(track, bitrate / divisor)
//!                 │
//!                 └─► File ─► Throttle ─► BroadcastSink ─► ClientRegistry ─► listeners
//! ```
//!
//! Listeners attach and detach through the [`registry::ClientRegistry`]
//! independently of the session lifecycle.
//!
//! # Example
//! ```no_run
//! use audio_relay::{RelayConfig, RelayServer};
//!
//! # async fn example() -> audio_relay::error::Result<()> {
//! let config = RelayConfig::default().public_root("public");
//! let server = RelayServer::new(config);
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod broadcast;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod probe;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;
pub mod track;

pub use config::{CommandPolicy, RelayConfig};
pub use error::{Error, Result};
pub use server::RelayServer;
pub use session::{SessionController, SessionPhase};
pub use track::{Bitrate, Track};
