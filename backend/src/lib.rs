//! Per-project ghc-mod backends.
//!
//! [`BackendManager`] is the entry point: it resolves a project root to its
//! [`Backend`] (probing the tool once per root), admits every command through
//! the per-category command queues, and runs it through the interactive process or a one-shot
//! batch invocation. Lifecycle notifications and warnings arrive as
//! [`BackendEvent`]s.

mod backend;
mod diagnostics;
mod error;
mod events;
mod manager;
mod probe;
mod queue;
mod root;

pub use backend::Backend;
pub use diagnostics::{ErrorReport, RecentLog, SpawnFailureReport};
pub use error::BackendError;
pub use events::{BackendEvent, EventBus, WarningKind};
pub use manager::BackendManager;
