//! Audio relay server
//!
//! Run with: cargo run -- [OPTIONS]
//!
//! Examples:
//!   cargo run                                         # 0.0.0.0:3000, ./public
//!   cargo run -- --port 8080 --track songs/live.mp3
//!   PUBLIC_ROOT=/srv/radio/public cargo run
//!
//! Listen at http://localhost:3000/home, control at http://localhost:3000/controller.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use audio_relay::config::{DEFAULT_BITRATE_DIVISOR, DEFAULT_FALLBACK_BITRATE};
use audio_relay::{CommandPolicy, RelayConfig, RelayServer};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "audio-relay")]
#[command(about = "Live single-source audio broadcast relay")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(long, default_value = "0.0.0.0", env = "HOST")]
    host: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value_t = 3000, env = "PORT")]
    port: u16,

    /// Directory static pages are served from
    #[arg(long, default_value = "public", env = "PUBLIC_ROOT")]
    public_root: PathBuf,

    /// Track broadcast on start
    #[arg(short, long, default_value = "audio/songs/conversation.mp3", env = "TRACK")]
    track: PathBuf,

    /// Bitrate in bits per second used when probing fails
    #[arg(long, default_value_t = DEFAULT_FALLBACK_BITRATE, env = "FALLBACK_BITRATE")]
    fallback_bitrate: u64,

    /// Divisor turning the bitrate into a pacing rate in bytes per second
    #[arg(long, default_value_t = DEFAULT_BITRATE_DIVISOR, env = "BITRATE_DIVISOR")]
    bitrate_divisor: u64,

    /// Bitrate probe executable
    #[arg(long, default_value = "sox", env = "PROBE_PROGRAM")]
    probe_program: PathBuf,

    /// Seconds to wait for the probe before falling back
    #[arg(long, default_value_t = 5, env = "PROBE_TIMEOUT_SECS")]
    probe_timeout_secs: u64,

    /// Reject command text that names neither start nor stop
    #[arg(long, env = "STRICT_COMMANDS")]
    strict_commands: bool,
}

impl Args {
    fn into_config(self) -> RelayConfig {
        let policy = if self.strict_commands {
            CommandPolicy::Strict
        } else {
            CommandPolicy::Lenient
        };

        RelayConfig::default()
            .bind(SocketAddr::new(self.host, self.port))
            .public_root(self.public_root)
            .default_track(self.track)
            .fallback_bitrate(self.fallback_bitrate)
            .bitrate_divisor(self.bitrate_divisor)
            .probe_program(self.probe_program)
            .probe_timeout(Duration::from_secs(self.probe_timeout_secs))
            .command_policy(policy)
    }
}

#[tokio::main]
async fn main() -> audio_relay::Result<()> {
    if std::env::var_os("LOG_DISABLE").is_none() {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "audio_relay=info,tower_http=info".into()),
            )
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let config = Args::parse().into_config();

    tracing::info!(
        addr = %config.bind_addr,
        public_root = %config.public_root.display(),
        track = %config.default_track.display(),
        "Starting audio relay"
    );

    RelayServer::new(config).run_until(shutdown_signal()).await
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
