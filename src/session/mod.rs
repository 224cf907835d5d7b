//! Broadcast session lifecycle
//!
//! ```text
//!            start                  pipeline connected
//!   Idle ──────────────► Starting ─────────────────────► Streaming
//!    ▲                       │ track unavailable / stop      │
//!    │◄──────────────────────┘                               │ stop / end of track /
//!    │                                                       │ pipeline failure
//!    └────────────────────── Stopping ◄──────────────────────┘
//! ```
//!
//! A start while `Starting` or `Streaming` tears the current session down
//! first, so there is never more than one broadcast.

pub mod command;
pub mod controller;
pub mod state;

pub use command::{Command, CommandRequest, CommandResponse};
pub use controller::SessionController;
pub use state::{Session, SessionPhase, SessionStatus};
