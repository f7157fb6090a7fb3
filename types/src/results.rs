//! Tagged result shapes and the line parsers that produce them.
//!
//! Each query kind has its own type; [`QueryOutput`] unifies them so callers
//! can match exhaustively instead of probing optional fields.

use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::capabilities::CapabilityProfile;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResultParseError {
    #[error("could not understand response: {0}")]
    Unrecognised(String),
}

/// Zero-based buffer position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Position {
    pub row: u32,
    pub col: u32,
}

impl Position {
    #[must_use]
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Build from the tool's one-based coordinates.
    #[must_use]
    pub fn from_one_based(row: u32, col: u32) -> Self {
        Self {
            row: row.saturating_sub(1),
            col: col.saturating_sub(1),
        }
    }

    /// The tool's one-based `[row, col]` arguments.
    #[must_use]
    pub fn to_args(self) -> [String; 2] {
        [
            self.row.saturating_add(1).to_string(),
            self.col.saturating_add(1).to_string(),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceRange {
    pub start: Position,
    pub end: Position,
}

impl SourceRange {
    #[must_use]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[must_use]
    pub fn contains(&self, pos: Position) -> bool {
        self.start <= pos && pos <= self.end
    }
}

fn range_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^(\d+)\s+(\d+)\s+(\d+)\s+(\d+)\s+"([\s\S]*)"$"#).expect("valid range regex")
    })
}

fn position_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)\s+(\d+)\s+(\d+)\s+(\d+)$").expect("valid position regex"))
}

fn check_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(.*?):([0-9\s]+):([0-9\s]+): *(?:(Warning|Error): *)?([\s\S]*)")
            .expect("valid check regex")
    })
}

fn num(raw: &str) -> u32 {
    raw.trim().parse().unwrap_or(0)
}

/// Parse `r1 c1 r2 c2 "text"` into a range and the unquoted text.
fn parse_range_line(line: &str) -> Option<(SourceRange, String)> {
    let caps = range_regex().captures(line)?;
    let range = SourceRange::new(
        Position::from_one_based(num(&caps[1]), num(&caps[2])),
        Position::from_one_based(num(&caps[3]), num(&caps[4])),
    );
    Some((range, caps[5].to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeInfo {
    pub range: SourceRange,
    #[serde(rename = "type")]
    pub type_text: String,
}

impl TypeInfo {
    /// Pick the innermost reported type whose range covers `pos`.
    ///
    /// The tool lists candidate expressions from the innermost outwards; empty
    /// ranges are skipped.
    #[must_use]
    pub fn select(lines: &[String], pos: Position) -> Option<Self> {
        lines.iter().find_map(|line| {
            let (range, text) = parse_range_line(line)?;
            if range.is_empty() || !range.contains(pos) {
                return None;
            }
            Some(Self {
                range,
                type_text: text.replace("\\\"", "\""),
            })
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseSplitEdit {
    pub range: SourceRange,
    pub replacement: String,
}

impl CaseSplitEdit {
    #[must_use]
    pub fn parse_line(line: &str) -> Option<Self> {
        parse_range_line(line).map(|(range, replacement)| Self { range, replacement })
    }
}

/// Result of `sig`: the signature line, where to insert, and the generated body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SigFill {
    #[serde(rename = "type")]
    pub type_text: String,
    pub range: SourceRange,
    pub body: String,
}

impl SigFill {
    pub fn parse(lines: &[String]) -> Result<Self, ResultParseError> {
        let unrecognised = || ResultParseError::Unrecognised(lines.join("\n"));
        if lines.len() < 2 {
            return Err(unrecognised());
        }
        let caps = position_regex().captures(&lines[1]).ok_or_else(unrecognised)?;
        Ok(Self {
            type_text: lines[0].clone(),
            range: SourceRange::new(
                Position::from_one_based(num(&caps[1]), num(&caps[2])),
                Position::from_one_based(num(&caps[3]), num(&caps[4])),
            ),
            body: lines[2..].join("\n"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Type,
    Class,
    Operator,
    Tag,
    Function,
}

/// One exported name reported by `browse -d -o [-p]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrowseSymbol {
    pub name: String,
    pub type_signature: Option<String>,
    pub kind: SymbolKind,
    pub parent: Option<String>,
}

impl BrowseSymbol {
    /// Parse `name :: signature[ -- from:Parent]`.
    #[must_use]
    pub fn parse(line: &str, with_parents: bool) -> Self {
        let (mut name, signature, parent) = match line.split_once(" :: ") {
            Some((name, rest)) => {
                let (sig, parent) = if with_parents {
                    match rest.rsplit_once(" -- from:") {
                        Some((sig, parent)) => (sig, Some(parent.to_string())),
                        None => (rest, None),
                    }
                } else {
                    (rest, None)
                };
                (name.to_string(), Some(sig.to_string()), parent)
            }
            None => (line.to_string(), None, None),
        };

        let sig = signature.as_deref().unwrap_or("");
        let kind = if sig.starts_with("type") || sig.starts_with("data") || sig.starts_with("newtype")
        {
            SymbolKind::Type
        } else if sig.starts_with("class") {
            SymbolKind::Class
        } else if name.len() >= 2 && name.starts_with('(') && name.ends_with(')') {
            name = name[1..name.len() - 1].to_string();
            SymbolKind::Operator
        } else if name.chars().next().is_some_and(char::is_uppercase) {
            SymbolKind::Tag
        } else {
            SymbolKind::Function
        };

        Self {
            name,
            type_signature: signature,
            kind,
            parent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Lint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckMessage {
    pub file: PathBuf,
    pub position: Position,
    pub message: String,
    pub severity: Severity,
}

/// One classified line of `check`/`lint` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckLine {
    Message(CheckMessage),
    /// The tool reported its own failure through the `Dummy:0:0` pseudo-location.
    ToolError(String),
    ToolWarning(String),
}

impl CheckMessage {
    /// Classify a `file:row:col: [Warning|Error:] message` line.
    ///
    /// Returns `None` for lines that do not follow the format.
    #[must_use]
    pub fn parse_line(line: &str, lint: bool) -> Option<CheckLine> {
        let caps = check_regex().captures(line)?;
        let file = &caps[1];
        let row = num(&caps[2]);
        let col = num(&caps[3]);
        let tag = caps.get(4).map(|m| m.as_str());
        let message = caps[5].to_string();

        if file == "Dummy" && row == 0 && col == 0 {
            match tag {
                Some("Error") => return Some(CheckLine::ToolError(message)),
                Some("Warning") => return Some(CheckLine::ToolWarning(message)),
                _ => {}
            }
        }

        let severity = if lint {
            Severity::Lint
        } else if tag == Some("Warning") {
            Severity::Warning
        } else {
            Severity::Error
        };

        Some(CheckLine::Message(CheckMessage {
            file: PathBuf::from(file),
            position: Position::from_one_based(row, col),
            message,
            severity,
        }))
    }
}

/// Every shape a query can produce.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "result", rename_all = "snake_case")]
pub enum QueryOutput {
    Lines(Vec<String>),
    Browse(Vec<BrowseSymbol>),
    Type(TypeInfo),
    Info(String),
    CaseSplit(Vec<CaseSplitEdit>),
    SigFill(SigFill),
    Messages(Vec<CheckMessage>),
    Capabilities(CapabilityProfile),
}
