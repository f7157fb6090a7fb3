//! Lifecycle notifications, delivered over a broadcast channel.

use std::path::PathBuf;

use gmod_types::QueueName;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::diagnostics::{ErrorReport, SpawnFailureReport};

/// Channel capacity; slow subscribers lag rather than block the backend.
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A successful command also wrote to stderr.
    StderrOutput,
    /// The tool was built with a different compiler than the one on PATH.
    VersionMismatch,
    /// The tool version is unsupported or deprecated.
    VersionAdvisory,
    /// The tool reported a warning through its pseudo-location.
    ToolMessage,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BackendEvent {
    /// A command was submitted.
    BackendActive,
    /// Every queue drained.
    BackendIdle,
    QueueIdle {
        queue: QueueName,
    },
    Warning {
        root: PathBuf,
        kind: WarningKind,
        message: String,
    },
    Error(ErrorReport),
    SpawnFailed(SpawnFailureReport),
    /// The manager shut down every backend.
    Destroyed,
}

/// Sending half shared by every component that reports events.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BackendEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Dropping the receiver unsubscribes.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BackendEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: BackendEvent) {
        tracing::trace!(?event, "backend event");
        // No subscribers is fine.
        let _ = self.tx.send(event);
    }

    pub fn warn(&self, root: impl Into<PathBuf>, kind: WarningKind, message: impl Into<String>) {
        let root = root.into();
        let message = message.into();
        tracing::warn!(root = %root.display(), ?kind, "{message}");
        self.emit(BackendEvent::Warning {
            root,
            kind,
            message,
        });
    }
}
