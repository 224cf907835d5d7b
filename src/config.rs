//! Relay configuration

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Bitrate used when probing fails (`128k`)
pub const DEFAULT_FALLBACK_BITRATE: u64 = 128_000;

/// Converts a bitrate in bits per second into bytes per second
pub const DEFAULT_BITRATE_DIVISOR: u64 = 8;

/// How unrecognized command text is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandPolicy {
    /// Anything that is not a stop command starts streaming
    #[default]
    Lenient,
    /// Only text containing "start" or "stop" is acted on
    Strict,
}

/// Paths of the HTML pages, relative to the public root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pages {
    /// Listener page
    pub home: String,
    /// Broadcast control page
    pub controller: String,
}

impl Default for Pages {
    fn default() -> Self {
        Self {
            home: "home/index.html".into(),
            controller: "controller/index.html".into(),
        }
    }
}

/// Relay configuration options
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address the HTTP transport binds to
    pub bind_addr: SocketAddr,

    /// Directory static files are served from
    pub public_root: PathBuf,

    /// HTML pages under `public_root`
    pub pages: Pages,

    /// Track streamed when a session starts
    pub default_track: PathBuf,

    /// Bitrate in bits per second used when probing fails
    pub fallback_bitrate: u64,

    /// Divisor applied to the bitrate to get the pacing rate in bytes per second
    pub bitrate_divisor: u64,

    /// Executable used to probe a track's bitrate
    pub probe_program: PathBuf,

    /// Upper bound on a single probe invocation
    pub probe_timeout: Duration,

    /// Handling of unrecognized command text
    pub command_policy: CommandPolicy,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            public_root: PathBuf::from("public"),
            pages: Pages::default(),
            default_track: PathBuf::from("audio/songs/conversation.mp3"),
            fallback_bitrate: DEFAULT_FALLBACK_BITRATE,
            bitrate_divisor: DEFAULT_BITRATE_DIVISOR,
            probe_program: PathBuf::from("sox"),
            probe_timeout: Duration::from_secs(5),
            command_policy: CommandPolicy::Lenient,
        }
    }
}

impl RelayConfig {
    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the public root directory
    pub fn public_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.public_root = root.into();
        self
    }

    /// Set the default track
    pub fn default_track(mut self, track: impl Into<PathBuf>) -> Self {
        self.default_track = track.into();
        self
    }

    /// Set the fallback bitrate (bits per second, never zero)
    pub fn fallback_bitrate(mut self, bitrate: u64) -> Self {
        self.fallback_bitrate = bitrate.max(1);
        self
    }

    /// Set the bitrate divisor (never zero)
    pub fn bitrate_divisor(mut self, divisor: u64) -> Self {
        self.bitrate_divisor = divisor.max(1);
        self
    }

    /// Set the probe executable
    pub fn probe_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.probe_program = program.into();
        self
    }

    /// Set the probe timeout
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Set the command policy
    pub fn command_policy(mut self, policy: CommandPolicy) -> Self {
        self.command_policy = policy;
        self
    }
}
