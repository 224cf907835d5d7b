//! Bitrate detection
//!
//! A track's bitrate is read once per session from an external metadata
//! tool (`sox --i -B <track>`). The tool is an injected [`ProbeTool`] so the
//! session controller can run against a stub instead of a real process.
//!
//! Detection never fails outward: a missing tool, output on the error
//! channel, or unparseable output all log at error level and yield the
//! configured fallback bitrate.

pub mod detect;
pub mod tool;

pub use detect::BitrateProbe;
pub use tool::{ProbeTool, SoxTool, ToolOutput};
