//! Listener registry for broadcast fan-out
//!
//! The registry maps listener ids to the sending half of each listener's
//! byte channel. The transport layer registers a listener when a connection
//! arrives and streams the receiving half back to the client.
//!
//! # Architecture
//!
//! ```text
//!                          Arc<ClientRegistry>
//!                     ┌──────────────────────────┐
//!                     │ listeners: HashMap<Id,   │
//!                     │   ListenerSink {         │
//!                     │     tx: mpsc::Unbounded, │
//!                     │   }                      │
//!                     │ >                        │
//!                     └────────────┬─────────────┘
//!                                  │
//!          ┌───────────────────────┼───────────────────────┐
//!          │                       │                       │
//!          ▼                       ▼                       ▼
//!   [BroadcastSink]         [ListenerStream]        [ListenerStream]
//!   write(chunk)            next().await            next().await
//!          │                       │                       │
//!          └──► sink.write() ──────┴──► HTTP body ──► TCP ─┘
//! ```
//!
//! # Zero-Copy Design
//!
//! `bytes::Bytes` uses reference counting, so every listener shares the same
//! chunk allocation; fan-out only bumps a reference count per listener.

pub mod listener;
pub mod store;

pub use listener::{ListenerClosed, ListenerId, ListenerSink, ListenerStream};
pub use store::ClientRegistry;
