//! Diagnostic reports attached to error and spawn-failure events.

use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use gmod_types::CapabilityProfile;
use serde::Serialize;

/// Default number of log lines kept for reports.
pub const RECENT_LOG_CAPACITY: usize = 200;

/// Bounded ring of recent log lines, shared between the logger and the backend.
#[derive(Debug, Clone)]
pub struct RecentLog {
    lines: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl Default for RecentLog {
    fn default() -> Self {
        Self::new(RECENT_LOG_CAPACITY)
    }
}

impl RecentLog {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&self, line: impl Into<String>) {
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(line.into());
    }

    /// Oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        let lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        lines.iter().cloned().collect()
    }
}

/// Why a backend could not be created for a root.
#[derive(Debug, Clone, Serialize)]
pub struct SpawnFailureReport {
    pub root: PathBuf,
    pub tool: PathBuf,
    pub error: String,
    /// Search path the tool was resolved against.
    pub path_entries: Vec<PathBuf>,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub recent_log: Vec<String>,
}

impl fmt::Display for SpawnFailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ghc-mod failed to start for {}", self.root.display())?;
        writeln!(f, "tool: {}", self.tool.display())?;
        writeln!(f, "error: {}", self.error)?;
        writeln!(f, "PATH:")?;
        for entry in &self.path_entries {
            writeln!(f, "  {}", entry.display())?;
        }
        write_section(f, "stdout", &self.stdout)?;
        write_section(f, "stderr", &self.stderr)?;
        write_section(f, "log", &self.recent_log)
    }
}

/// A failed command, with everything needed to reproduce it.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub root: PathBuf,
    pub command: String,
    pub args: Vec<String>,
    pub error: String,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub capabilities: Option<CapabilityProfile>,
    pub recent_log: Vec<String>,
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "ghc-mod {} failed in {}: {}",
            self.command,
            self.root.display(),
            self.error
        )?;
        writeln!(f, "args: {:?}", self.args)?;
        if let Some(caps) = &self.capabilities {
            writeln!(f, "ghc-mod version: {}", caps.version)?;
        }
        write_section(f, "stdout", &self.stdout)?;
        write_section(f, "stderr", &self.stderr)?;
        write_section(f, "log", &self.recent_log)
    }
}

fn write_section(f: &mut fmt::Formatter<'_>, title: &str, lines: &[String]) -> fmt::Result {
    if lines.is_empty() {
        return Ok(());
    }
    writeln!(f, "{title}:")?;
    for line in lines {
        writeln!(f, "  {line}")?;
    }
    Ok(())
}
