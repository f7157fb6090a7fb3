//! Process plumbing for ghc-mod.
//!
//! - [`LineReader`]: stateful line scanner over a child's stdout/stderr.
//! - [`wire`]: request encoding for the interactive protocol.
//! - [`Session`]: one supervised `legacy-interactive` process.
//! - [`execute`]: one-shot batch invocations.

mod batch;
mod error;
mod options;
mod reader;
mod session;
pub mod usage;
pub mod wire;

pub use batch::execute;
pub use error::{BatchError, SessionError};
pub use options::ProcessOptions;
pub use reader::LineReader;
pub use session::{
    DEFAULT_MAX_QUEUED, KillReason, Session, SessionConfig, SessionExit,
};
