//! Tool version tuples and version-probe parsing.

use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionParseError {
    #[error("couldn't find a tool version in probe output: {0:?}")]
    MissingVersion(String),
    #[error("couldn't find the compiler version in probe output: {0:?}")]
    MissingCompiler(String),
    #[error("version component {0:?} is not a number")]
    BadComponent(String),
}

/// A dotted version tuple such as `5.6.0` or `5.4.0.1`.
///
/// Comparison is element-wise from the left; a missing trailing component
/// compares as `0`, so `[5]` equals `[5, 0]` and is below `[5, 4]`.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct ToolVersion(Vec<u32>);

impl ToolVersion {
    #[must_use]
    pub fn new(parts: impl Into<Vec<u32>>) -> Self {
        Self(parts.into())
    }

    /// Parse `major.minor[.patch[.build]]`.
    pub fn parse(raw: &str) -> Result<Self, VersionParseError> {
        raw.trim()
            .split('.')
            .map(|part| {
                part.parse::<u32>()
                    .map_err(|_| VersionParseError::BadComponent(part.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    #[must_use]
    pub fn parts(&self) -> &[u32] {
        &self.0
    }

    /// Whether this version is at or above `threshold`.
    #[must_use]
    pub fn at_least(&self, threshold: &[u32]) -> bool {
        compare_padded(&self.0, threshold) != Ordering::Less
    }

    /// Whether the leading components equal `prefix` exactly (`5.4` matches `5.4.2`).
    #[must_use]
    pub fn matches_prefix(&self, prefix: &[u32]) -> bool {
        prefix
            .iter()
            .enumerate()
            .all(|(i, want)| self.0.get(i).copied().unwrap_or(0) == *want)
    }
}

fn compare_padded(a: &[u32], b: &[u32]) -> Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let left = a.get(i).copied().unwrap_or(0);
        let right = b.get(i).copied().unwrap_or(0);
        match left.cmp(&right) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    Ordering::Equal
}

impl PartialEq for ToolVersion {
    fn eq(&self, other: &Self) -> bool {
        compare_padded(&self.0, &other.0) == Ordering::Equal
    }
}

impl Eq for ToolVersion {}

impl PartialOrd for ToolVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ToolVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_padded(&self.0, &other.0)
    }
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.0.iter().map(u32::to_string).collect();
        f.write_str(&joined.join("."))
    }
}

/// Result of the `version` probe: the tool's own version and the compiler it was built with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    pub version: ToolVersion,
    pub compiler: String,
}

fn version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\S+ version (\d+)\.(\d+)\.(\d+)(?:\.(\d+))?").expect("valid version regex")
    })
}

fn compiler_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"GHC (\S+?)[,\s]*$").expect("valid compiler regex"))
}

impl VersionInfo {
    /// Parse the output of `<tool> version`, e.g.
    /// `ghc-mod version 5.6.0.0 compiled by GHC 8.0.2`.
    pub fn parse_probe(output: &str) -> Result<Self, VersionParseError> {
        let trimmed = output.trim();
        let caps = version_regex()
            .captures(trimmed)
            .ok_or_else(|| VersionParseError::MissingVersion(trimmed.to_string()))?;

        let mut parts = Vec::with_capacity(4);
        for group in caps.iter().skip(1).flatten() {
            let raw = group.as_str();
            parts.push(
                raw.parse::<u32>()
                    .map_err(|_| VersionParseError::BadComponent(raw.to_string()))?,
            );
        }

        let compiler = compiler_regex()
            .captures(trimmed)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| VersionParseError::MissingCompiler(trimmed.to_string()))?;

        Ok(Self {
            version: ToolVersion(parts),
            compiler,
        })
    }
}
