use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use gmod_config::ConfigError;
use gmod_process::{BatchError, SessionError};
use thiserror::Error;

/// Failure of a backend operation.
///
/// `Clone` because a probe result is shared by every caller waiting on it;
/// non-clonable sources are held behind `Arc`.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The tool could not be run or its version could not be determined.
    #[error("ghc-mod failed to start for {}: {message}", root.display())]
    Probe {
        root: PathBuf,
        tool: PathBuf,
        message: String,
        stdout: Vec<String>,
        stderr: Vec<String>,
    },

    #[error("ghc-mod crashed: {reason}")]
    Crashed {
        reason: String,
        exit_code: Option<i32>,
        stdout: Vec<String>,
        stderr: Vec<String>,
    },

    #[error("ghc-mod timed out after {}s", timeout.as_secs_f32())]
    TimedOut {
        timeout: Duration,
        stdout: Vec<String>,
        stderr: Vec<String>,
    },

    #[error(transparent)]
    Batch(Arc<BatchError>),

    #[error(transparent)]
    Session(Arc<SessionError>),

    #[error("ghc-mod is disabled for {}", root.display())]
    Disabled { root: PathBuf },

    #[error(transparent)]
    Settings(Arc<ConfigError>),

    #[error("failed to stage unsaved buffer in a temporary file: {0}")]
    TempFile(Arc<io::Error>),

    #[error("no result")]
    NoResult,

    #[error("could not understand ghc-mod output: {0}")]
    Unparsable(String),
}

impl BackendError {
    /// Whether the failure leaves the backend unusable, so its entry must be dropped.
    #[must_use]
    pub fn is_fatal_to_backend(&self) -> bool {
        matches!(self, Self::Crashed { .. } | Self::TimedOut { .. })
    }

    /// Output captured from the tool before it failed, as `(stdout, stderr)`.
    #[must_use]
    pub fn captured_output(&self) -> (Vec<String>, Vec<String>) {
        match self {
            Self::Probe { stdout, stderr, .. }
            | Self::Crashed { stdout, stderr, .. }
            | Self::TimedOut { stdout, stderr, .. } => (stdout.clone(), stderr.clone()),
            Self::Batch(err) => batch_output(err),
            _ => (Vec::new(), Vec::new()),
        }
    }
}

/// Lines captured by a failed batch run, as `(stdout, stderr)`.
pub(crate) fn batch_output(err: &BatchError) -> (Vec<String>, Vec<String>) {
    match err {
        BatchError::Failed { stdout, stderr, .. } => (
            stdout.lines().map(str::to_string).collect(),
            stderr.lines().map(str::to_string).collect(),
        ),
        _ => (Vec::new(), Vec::new()),
    }
}

impl From<SessionError> for BackendError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Crashed {
                reason,
                exit_code,
                stdout,
                stderr,
            } => Self::Crashed {
                reason,
                exit_code,
                stdout,
                stderr,
            },
            SessionError::TimedOut {
                timeout,
                stdout,
                stderr,
            } => Self::TimedOut {
                timeout,
                stdout,
                stderr,
            },
            other => Self::Session(Arc::new(other)),
        }
    }
}

impl From<BatchError> for BackendError {
    fn from(err: BatchError) -> Self {
        Self::Batch(Arc::new(err))
    }
}

impl From<ConfigError> for BackendError {
    fn from(err: ConfigError) -> Self {
        Self::Settings(Arc::new(err))
    }
}
