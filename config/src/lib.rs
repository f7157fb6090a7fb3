//! Configuration for gmod.
//!
//! Two layers exist:
//!
//! - [`GmodConfig`]: the global file at `~/.gmod/config.toml`. Its `[tool]`
//!   table is read once and handed to the backend as an explicit snapshot;
//!   its `[settings]` table is the global layer of the per-project settings.
//! - Per-project settings in `<root>/.gmod.toml`, resolved through a
//!   [`SettingsProvider`] every time a command is queued.
//!
//! ```toml
//! [tool]
//! path = "ghc-mod"
//! enable_interactive = true
//! interactive_action_timeout_secs = 300
//!
//! [settings]
//! suppress_errors = false
//! compiler_options = ["-Wall"]
//! ```

mod settings;

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use serde::Deserialize;
use thiserror::Error;

pub use settings::{
    FileSettingsProvider, ROOT_SETTINGS_FILE, Settings, SettingsLayer, SettingsProvider,
    StaticSettings,
};

// Default value functions for serde (bool::default() is false, so only true needs a fn)
const fn default_true() -> bool {
    true
}

fn default_tool_path() -> String {
    "ghc-mod".to_string()
}

const fn default_max_browse_processes() -> usize {
    2
}

const fn default_action_timeout_secs() -> u64 {
    300
}

const fn default_inactivity_timeout_mins() -> u64 {
    60
}

const fn default_init_timeout_secs() -> u64 {
    60
}

const fn default_max_mem_megs() -> u64 {
    4 * 1024
}

const fn default_max_queued_requests() -> usize {
    100
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &PathBuf {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GmodConfig {
    #[serde(default)]
    pub tool: ToolConfig,
    /// Global layer of the per-project settings.
    #[serde(default)]
    pub settings: SettingsLayer,
}

/// Tool-wide options. Read once and passed to the backend as a snapshot.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Path or name of the `ghc-mod` executable. `${VAR}` references are expanded.
    pub path: String,
    /// Keep a long-lived interactive process per project.
    pub enable_interactive: bool,
    /// Funnel every command through one queue.
    pub low_memory: bool,
    pub max_browse_processes: usize,
    /// Per-command timeout for interactive calls. 0 disables.
    pub interactive_action_timeout_secs: u64,
    /// Idle interactive processes are killed after this many minutes. 0 disables.
    pub interactive_inactivity_timeout_mins: u64,
    /// Timeout for the version probe.
    pub init_timeout_secs: u64,
    /// Resident memory ceiling for interactive processes. 0 disables.
    pub max_mem_megs: u64,
    /// Callers allowed to wait on a busy interactive process before new ones are rejected.
    pub max_queued_requests: usize,
    /// Directories prepended to `PATH` for every spawned process.
    pub additional_path_directories: Vec<PathBuf>,
    /// Enable capabilities still marked experimental.
    pub experimental: bool,
    /// Options forwarded to hlint via `--hlintOpt`.
    pub hlint_options: Vec<String>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            path: default_tool_path(),
            enable_interactive: default_true(),
            low_memory: false,
            max_browse_processes: default_max_browse_processes(),
            interactive_action_timeout_secs: default_action_timeout_secs(),
            interactive_inactivity_timeout_mins: default_inactivity_timeout_mins(),
            init_timeout_secs: default_init_timeout_secs(),
            max_mem_megs: default_max_mem_megs(),
            max_queued_requests: default_max_queued_requests(),
            additional_path_directories: Vec::new(),
            experimental: false,
            hlint_options: Vec::new(),
        }
    }
}

impl ToolConfig {
    /// Tool path with `${VAR}` references expanded.
    #[must_use]
    pub fn tool_path(&self) -> PathBuf {
        PathBuf::from(expand_env_vars(&self.path))
    }

    #[must_use]
    pub fn action_timeout(&self) -> Duration {
        Duration::from_secs(self.interactive_action_timeout_secs)
    }

    #[must_use]
    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.interactive_inactivity_timeout_mins.saturating_mul(60))
    }

    #[must_use]
    pub fn init_timeout(&self) -> Duration {
        Duration::from_secs(self.init_timeout_secs)
    }

    #[must_use]
    pub fn max_mem_bytes(&self) -> u64 {
        self.max_mem_megs.saturating_mul(1024 * 1024)
    }
}

pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let var = &after[..end];
                if var.is_empty() {
                    out.push_str("${}");
                } else {
                    out.push_str(&env::var(var).unwrap_or_default());
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

impl GmodConfig {
    /// Load the global config. `Ok(None)` when no file exists.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".gmod").join("config.toml"))
}
