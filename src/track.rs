//! Track and bitrate types

use std::fmt;
use std::path::{Path, PathBuf};

/// The audio file a session broadcasts
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Track {
    path: PathBuf,
}

impl Track {
    /// Create a track reference for a file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the audio file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Bitrate of a track in bits per second
///
/// Sampled once when a session starts and never renegotiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Bitrate(u64);

impl Bitrate {
    /// Create a bitrate; zero is not a valid bitrate
    pub fn new(bits_per_second: u64) -> Option<Self> {
        (bits_per_second > 0).then_some(Self(bits_per_second))
    }

    /// Create a bitrate, raising zero to one bit per second
    pub fn clamped(bits_per_second: u64) -> Self {
        Self(bits_per_second.max(1))
    }

    /// Parse probe tool output such as `"128k\n"`
    ///
    /// Surrounding whitespace is ignored and a trailing `k` means thousands.
    pub fn parse(output: &str) -> Option<Self> {
        let trimmed = output.trim();
        let digits = match trimmed.strip_suffix('k') {
            Some(value) => format!("{}000", value),
            None => trimmed.to_string(),
        };

        digits.parse::<u64>().ok().and_then(Self::new)
    }

    /// Bits per second
    pub fn bits_per_second(self) -> u64 {
        self.0
    }

    /// Pacing rate in bytes per second for the given divisor
    pub fn pacing_rate(self, divisor: u64) -> u64 {
        (self.0 / divisor.max(1)).max(1)
    }
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}bps", self.0)
    }
}
