//! Control commands

use serde::{Deserialize, Serialize};

/// A recognized control command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Begin or restart the broadcast
    Start,
    /// End the broadcast
    Stop,
    /// Text that names neither command
    Unknown,
}

impl Command {
    /// Interpret free text
    ///
    /// Matching is case-insensitive and by substring; "start" wins over "stop".
    pub fn parse(text: &str) -> Self {
        let text = text.to_lowercase();

        if text.contains("start") {
            Command::Start
        } else if text.contains("stop") {
            Command::Stop
        } else {
            Command::Unknown
        }
    }
}

/// Body of a command request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRequest {
    /// Free-text command
    pub command: String,
}

/// Acknowledgement returned for every command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    /// `"ok"`, or `"unknown command"` under the strict policy
    pub result: String,
}

impl CommandResponse {
    /// Acknowledgement for an accepted command
    pub fn ok() -> Self {
        Self {
            result: "ok".into(),
        }
    }

    /// Rejection of unrecognized text
    pub fn unknown_command() -> Self {
        Self {
            result: "unknown command".into(),
        }
    }
}
