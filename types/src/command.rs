//! Command categories, run requests, and raw responses.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;

/// Admission-control category a command is queued under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueName {
    List,
    Browse,
    TypeInfo,
    Find,
    Init,
    CheckLint,
    /// Shared queue every submission is redirected to in low-memory mode.
    LowMem,
}

impl QueueName {
    pub const ALL: [QueueName; 7] = [
        QueueName::List,
        QueueName::Browse,
        QueueName::TypeInfo,
        QueueName::Find,
        QueueName::Init,
        QueueName::CheckLint,
        QueueName::LowMem,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Browse => "browse",
            Self::TypeInfo => "typeinfo",
            Self::Find => "find",
            Self::Init => "init",
            Self::CheckLint => "checklint",
            Self::LowMem => "lowmem",
        }
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|q| q.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown queue '{s}'"))
    }
}

/// One tool invocation, before argument shaping.
///
/// `dash_args` are command options (placed before the `--` separator when the
/// tool supports it); `args` are positional. `text` carries unsaved buffer
/// content for `file`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunRequest {
    pub command: String,
    pub dash_args: Vec<String>,
    pub args: Vec<String>,
    pub file: Option<PathBuf>,
    pub text: Option<String>,
    pub interactive: bool,
}

impl RunRequest {
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn dash_args<I, S>(mut self, dash_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dash_args = dash_args.into_iter().map(Into::into).collect();
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn text(mut self, text: Option<String>) -> Self {
        self.text = text;
        self
    }
}

/// A source file named by a query, with its unsaved buffer text if any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Unsaved buffer content. `None` means the file on disk is current.
    pub text: Option<String>,
}

impl SourceFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            text: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

/// Raw tool output, split into lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Response {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl Response {
    #[must_use]
    pub fn new(stdout: Vec<String>, stderr: Vec<String>) -> Self {
        Self { stdout, stderr }
    }

    /// Whether stderr carried anything besides whitespace.
    #[must_use]
    pub fn has_stderr(&self) -> bool {
        self.stderr.iter().any(|l| !l.trim().is_empty())
    }

    /// Replace every occurrence of `from` with `to` in both streams.
    #[must_use]
    pub fn replace_all(self, from: &str, to: &str) -> Self {
        if from.is_empty() {
            return self;
        }
        let rewrite = |lines: Vec<String>| -> Vec<String> {
            lines
                .into_iter()
                .map(|line| line.replace(from, to))
                .collect()
        };
        Self {
            stdout: rewrite(self.stdout),
            stderr: rewrite(self.stderr),
        }
    }
}
