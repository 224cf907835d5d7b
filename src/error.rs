//! Error types
//!
//! Only failures that stop an operation surface here. Probe failures and
//! closed listeners are recovered where they happen and never reach callers.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for relay operations
#[derive(Error, Debug)]
pub enum Error {
    /// The selected track could not be opened, so no session was started
    #[error("Track unavailable: {}: {source}", path.display())]
    TrackUnavailable {
        /// Path of the track that failed to open
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A static file lookup did not resolve to an accessible file
    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    /// HTTP server errors (bind, serve)
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Other I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type using the relay [`Error`]
pub type Result<T> = std::result::Result<T, Error>;
