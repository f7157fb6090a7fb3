//! Feature flags derived from the detected tool version.
//!
//! Every call site consults the same immutable profile: argument escaping,
//! the `--` option separator, file mapping, and optional command flags all
//! depend on it. A profile is derived once per backend and never revised.

use serde::Serialize;

use crate::version::ToolVersion;

const MIN_SUPPORTED: [u32; 2] = [5, 4];
const DEPRECATED: [u32; 2] = [5, 4];
const FILE_MAP_SINCE: [u32; 2] = [5, 4];
const QUOTE_ARGS_SINCE: [u32; 2] = [5, 5];
const TYPE_CONSTRAINTS_SINCE: [u32; 2] = [5, 6];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityProfile {
    pub version: ToolVersion,
    /// `map-file` / `--map-file` sub-protocol for unsaved buffers.
    pub file_map: bool,
    /// `ascii-escape` mode with `\x02…\x03` bracketed arguments.
    pub quote_args: bool,
    /// Positional arguments must follow a `--` separator.
    pub optparse: bool,
    /// `type -c` reports class constraints.
    pub type_constraints: bool,
    /// `browse -p` reports parent declarations.
    pub browse_parents: bool,
    pub interactive_case_split: bool,
    /// Only enabled when the experimental setting is on.
    pub imported_from: bool,
}

impl CapabilityProfile {
    /// Derive the profile for `version`. Pure: the same input always yields an equal profile.
    #[must_use]
    pub fn derive(version: &ToolVersion, experimental: bool) -> Self {
        let quote_args = version.at_least(&QUOTE_ARGS_SINCE);
        let modern = version.at_least(&TYPE_CONSTRAINTS_SINCE);
        Self {
            version: version.clone(),
            file_map: version.at_least(&FILE_MAP_SINCE),
            quote_args,
            optparse: quote_args,
            type_constraints: modern,
            browse_parents: modern,
            interactive_case_split: modern,
            imported_from: experimental,
        }
    }
}

/// Non-fatal notice about the detected tool version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionAdvisory {
    /// Below the minimum supported version; execution continues at the user's risk.
    Unsupported,
    /// Exactly the deprecated release line.
    Deprecated,
}

impl VersionAdvisory {
    #[must_use]
    pub fn for_version(version: &ToolVersion) -> Option<Self> {
        if !version.at_least(&MIN_SUPPORTED) {
            Some(Self::Unsupported)
        } else if version.matches_prefix(&DEPRECATED) {
            Some(Self::Deprecated)
        } else {
            None
        }
    }

    #[must_use]
    pub fn message(self, version: &ToolVersion) -> String {
        match self {
            Self::Unsupported => format!(
                "ghc-mod {version} is older than 5.4 and not supported. \
                 Use at your own risk or update your ghc-mod installation"
            ),
            Self::Deprecated => format!(
                "ghc-mod {version} (5.4.*) is deprecated. \
                 Use at your own risk or update your ghc-mod installation"
            ),
        }
    }
}
