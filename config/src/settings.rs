//! Per-project settings, layered over the global `[settings]` table.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::ConfigError;

/// Settings file looked up in each project root.
pub const ROOT_SETTINGS_FILE: &str = ".gmod.toml";

/// One layer of settings; unset fields fall through to the layer below.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SettingsLayer {
    pub disable: Option<bool>,
    pub suppress_errors: Option<bool>,
    /// Extra global options passed to the tool before the command.
    pub tool_options: Option<Vec<String>>,
    /// Options forwarded to the compiler via `--ghc-option`.
    pub compiler_options: Option<Vec<String>>,
}

impl SettingsLayer {
    /// Stack `upper` on top of `self`; fields set in `upper` win.
    #[must_use]
    pub fn overlay(self, upper: SettingsLayer) -> SettingsLayer {
        SettingsLayer {
            disable: upper.disable.or(self.disable),
            suppress_errors: upper.suppress_errors.or(self.suppress_errors),
            tool_options: upper.tool_options.or(self.tool_options),
            compiler_options: upper.compiler_options.or(self.compiler_options),
        }
    }

    #[must_use]
    pub fn resolve(self) -> Settings {
        Settings {
            disable: self.disable.unwrap_or(false),
            suppress_errors: self.suppress_errors.unwrap_or(false),
            tool_options: self.tool_options.unwrap_or_default(),
            compiler_options: self.compiler_options.unwrap_or_default(),
        }
    }
}

/// Fully resolved settings for one project root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// Reject every command for this root.
    pub disable: bool,
    /// Log failures instead of surfacing them.
    pub suppress_errors: bool,
    pub tool_options: Vec<String>,
    pub compiler_options: Vec<String>,
}

impl Settings {
    /// Global options for every invocation: tool options followed by
    /// `--ghc-option <opt>` for each compiler option.
    #[must_use]
    pub fn global_options(&self) -> Vec<String> {
        let mut out = self.tool_options.clone();
        for opt in &self.compiler_options {
            out.push("--ghc-option".to_string());
            out.push(opt.clone());
        }
        out
    }
}

/// Source of per-root settings. Consulted once per queued command.
pub trait SettingsProvider: Send + Sync {
    fn settings(&self, root: &Path) -> Result<Settings, ConfigError>;
}

/// Reads `<root>/.gmod.toml` on every call and layers it over the global layer.
#[derive(Debug, Clone, Default)]
pub struct FileSettingsProvider {
    global: SettingsLayer,
}

impl FileSettingsProvider {
    #[must_use]
    pub fn new(global: SettingsLayer) -> Self {
        Self { global }
    }

    fn read_root_layer(root: &Path) -> Result<SettingsLayer, ConfigError> {
        let path = root.join(ROOT_SETTINGS_FILE);
        if !path.exists() {
            return Ok(SettingsLayer::default());
        }
        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse { path, source })
    }
}

impl SettingsProvider for FileSettingsProvider {
    fn settings(&self, root: &Path) -> Result<Settings, ConfigError> {
        let layer = Self::read_root_layer(root)?;
        Ok(self.global.clone().overlay(layer).resolve())
    }
}

/// Fixed settings for every root.
#[derive(Debug, Clone, Default)]
pub struct StaticSettings(pub Settings);

impl SettingsProvider for StaticSettings {
    fn settings(&self, _root: &Path) -> Result<Settings, ConfigError> {
        Ok(self.0.clone())
    }
}
