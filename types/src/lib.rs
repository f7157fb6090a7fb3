//! Core domain types for gmod.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the workspace: the process layer
//! consults [`CapabilityProfile`] when encoding commands, the backend layer builds
//! [`RunRequest`]s and turns [`Response`] lines into the tagged [`QueryOutput`] shapes.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod capabilities;
mod command;
mod results;
mod version;

pub use capabilities::{CapabilityProfile, VersionAdvisory};
pub use command::{QueueName, Response, RunRequest, SourceFile};
pub use results::{
    BrowseSymbol, CaseSplitEdit, CheckLine, CheckMessage, Position, QueryOutput,
    ResultParseError, Severity, SigFill, SourceRange, SymbolKind, TypeInfo,
};
pub use version::{ToolVersion, VersionInfo, VersionParseError};

/// Line terminating the response to every interactive command.
pub const SENTINEL_LINE: &str = "OK";

/// Platform line ending used on the wire.
#[cfg(windows)]
pub const EOL: &str = "\r\n";
/// Platform line ending used on the wire.
#[cfg(not(windows))]
pub const EOL: &str = "\n";
