use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failures of a long-lived interactive process.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to spawn {}: {source}", tool.display())]
    Spawn { tool: PathBuf, source: io::Error },

    /// The process exited (or closed stdout) before answering.
    #[error("interactive process died: {reason}")]
    Crashed {
        reason: String,
        exit_code: Option<i32>,
        stdout: Vec<String>,
        stderr: Vec<String>,
    },

    /// No sentinel within the action timeout. The process has been killed.
    #[error("interactive action timed out after {}s", timeout.as_secs_f32())]
    TimedOut {
        timeout: Duration,
        stdout: Vec<String>,
        stderr: Vec<String>,
    },

    #[error("interactive request queue is full ({limit} waiting)")]
    Overloaded { limit: usize },

    #[error("i/o error talking to interactive process: {0}")]
    Io(#[from] io::Error),
}

/// Failures of a one-shot batch invocation.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("failed to spawn {}: {source}", tool.display())]
    Spawn { tool: PathBuf, source: io::Error },

    #[error("{} exited with {}: {}", tool.display(), exit_label(*exit_code), stderr.trim())]
    Failed {
        tool: PathBuf,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("{} timed out after {}s", tool.display(), timeout.as_secs_f32())]
    TimedOut { tool: PathBuf, timeout: Duration },

    #[error("i/o error running {}: {source}", tool.display())]
    Io { tool: PathBuf, source: io::Error },
}

fn exit_label(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}
