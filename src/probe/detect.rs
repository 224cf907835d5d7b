//! Bitrate detection with fallback

use thiserror::Error;

use crate::track::{Bitrate, Track};

use super::tool::{ProbeTool, SoxTool};

/// Why a probe run did not yield a bitrate
#[derive(Error, Debug)]
enum ProbeFailure {
    #[error("probe tool failed to run: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("probe tool reported an error: {0}")]
    ToolError(String),

    #[error("unparseable probe output: {0:?}")]
    Unparseable(String),
}

/// Detects a track's bitrate, falling back to a constant on any failure
#[derive(Debug, Clone)]
pub struct BitrateProbe<T = SoxTool> {
    tool: T,
    fallback: Bitrate,
}

impl<T: ProbeTool> BitrateProbe<T> {
    /// Create a probe around `tool`
    pub fn new(tool: T, fallback: Bitrate) -> Self {
        Self { tool, fallback }
    }

    /// Bitrate returned when detection fails
    pub fn fallback(&self) -> Bitrate {
        self.fallback
    }

    /// Detect the bitrate of `track`
    ///
    /// Never fails: any failure is logged and the fallback is returned.
    pub async fn detect(&self, track: &Track) -> Bitrate {
        match self.try_detect(track).await {
            Ok(bitrate) => {
                tracing::info!(track = %track, bitrate = %bitrate, "Bitrate detected");
                bitrate
            }
            Err(e) => {
                tracing::error!(
                    track = %track,
                    error = %e,
                    fallback = %self.fallback,
                    "Bitrate detection failed, using fallback"
                );
                self.fallback
            }
        }
    }

    async fn try_detect(&self, track: &Track) -> Result<Bitrate, ProbeFailure> {
        let output = self.tool.run(track.path()).await?;

        if !output.stderr.is_empty() {
            return Err(ProbeFailure::ToolError(output.stderr.trim().to_string()));
        }

        Bitrate::parse(&output.stdout).ok_or(ProbeFailure::Unparseable(output.stdout))
    }
}
