//! External probe tool invocation

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

/// Raw output of one probe run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Everything the tool wrote to standard output
    pub stdout: String,
    /// Everything the tool wrote to standard error
    pub stderr: String,
}

impl ToolOutput {
    /// Output of a run that only wrote to standard output
    pub fn stdout(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }
}

/// Capability that produces bitrate metadata for a track
///
/// Returns `Err` only when the tool could not be run at all.
pub trait ProbeTool: Send + Sync + 'static {
    /// Run the tool against `track` and collect both output channels
    fn run(&self, track: &Path) -> impl Future<Output = io::Result<ToolOutput>> + Send;
}

/// Probe backed by the `sox` command line tool
#[derive(Debug, Clone)]
pub struct SoxTool {
    program: PathBuf,
    timeout: Duration,
}

impl SoxTool {
    /// Create a probe that runs `program` with a bounded wait
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Executable this probe runs
    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Default for SoxTool {
    fn default() -> Self {
        Self::new("sox", Duration::from_secs(5))
    }
}

impl ProbeTool for SoxTool {
    async fn run(&self, track: &Path) -> io::Result<ToolOutput> {
        // --i: info only, -B: bitrate in kbps
        let child = Command::new(&self.program)
            .arg("--i")
            .arg("-B")
            .arg(track)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("probe did not finish within {:?}", self.timeout),
                )
            })??;

        Ok(ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let tool = SoxTool::new("/nonexistent/bin/sox", Duration::from_secs(1));

        let result = tool.run(Path::new("track.mp3")).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_default_program() {
        let tool = SoxTool::default();
        assert_eq!(tool.program(), Path::new("sox"));
    }
}
