//! HTTP transport
//!
//! Hands out per-listener response streams, accepts control commands and
//! serves the static pages. The broadcast engine itself lives in
//! [`crate::session`]; this module only adapts it to HTTP.

pub mod files;
pub mod http;
pub mod listener;

pub use files::{FileInfo, PublicFiles};
pub use http::{create_router, AppState};
pub use listener::RelayServer;
