//! Tool resolution, version probing and the compiler cross-check.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use gmod_config::ToolConfig;
use gmod_process::{ProcessOptions, execute};
use gmod_types::{CapabilityProfile, VersionAdvisory, VersionInfo};

use crate::error::{BackendError, batch_output};

/// How a tool process is launched for one project root.
#[derive(Debug, Clone)]
pub struct ToolEnvironment {
    /// The tool, resolved against `path_entries` when possible.
    pub tool: PathBuf,
    pub path_entries: Vec<PathBuf>,
    /// Working directory is the project root; `PATH` includes the extra directories.
    pub options: ProcessOptions,
}

impl ToolEnvironment {
    #[must_use]
    pub fn new(config: &ToolConfig, root: &Path) -> Self {
        let mut path_entries = config.additional_path_directories.clone();
        if let Some(inherited) = env::var_os("PATH") {
            path_entries.extend(env::split_paths(&inherited));
        }

        let mut options = ProcessOptions::new(root);
        let joined = env::join_paths(&path_entries).ok();
        if let Some(path) = joined.as_ref().and_then(|p| p.to_str()) {
            options = options.with_env("PATH", path);
        }

        let requested = config.tool_path();
        let tool = resolve_tool(&requested, joined, root);
        Self {
            tool,
            path_entries,
            options,
        }
    }
}

fn resolve_tool(tool: &Path, path: Option<OsString>, cwd: &Path) -> PathBuf {
    match which::which_in(tool, path, cwd) {
        Ok(resolved) => resolved,
        Err(err) => {
            tracing::debug!(tool = %tool.display(), "could not resolve tool on PATH: {err}");
            tool.to_path_buf()
        }
    }
}

/// Result of a successful version probe.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub version: VersionInfo,
    pub capabilities: CapabilityProfile,
    pub advisory: Option<VersionAdvisory>,
}

/// Run `tool version` and derive the capability profile.
pub async fn probe_version(
    env: &ToolEnvironment,
    root: &Path,
    timeout: Duration,
    experimental: bool,
) -> Result<ProbeResult, BackendError> {
    let mut options = env.options.clone();
    if !timeout.is_zero() {
        options = options.with_timeout(timeout);
    }

    let probe_error = |message: String, stdout: Vec<String>, stderr: Vec<String>| {
        BackendError::Probe {
            root: root.to_path_buf(),
            tool: env.tool.clone(),
            message,
            stdout,
            stderr,
        }
    };

    let response = match execute(&env.tool, &["version".to_string()], &options, None).await {
        Ok(response) => response,
        Err(err) => {
            let (stdout, stderr) = batch_output(&err);
            return Err(probe_error(err.to_string(), stdout, stderr));
        }
    };

    let output = response.stdout.join("\n");
    let version = VersionInfo::parse_probe(&output).map_err(|err| {
        probe_error(
            err.to_string(),
            response.stdout.clone(),
            response.stderr.clone(),
        )
    })?;

    let capabilities = CapabilityProfile::derive(&version.version, experimental);
    let advisory = VersionAdvisory::for_version(&version.version);
    tracing::info!(
        root = %root.display(),
        version = %version.version,
        compiler = %version.compiler,
        "ghc-mod version detected"
    );
    tracing::debug!(?capabilities, "capabilities");
    Ok(ProbeResult {
        version,
        capabilities,
        advisory,
    })
}

/// Compare the compiler the tool was built with against the ones on PATH.
///
/// Best effort: a toolchain that cannot be queried is skipped.
pub async fn compiler_mismatches(env: &ToolEnvironment, compiler: &str) -> Vec<String> {
    let (stack, path) = tokio::join!(
        numeric_version(env, "stack", &["ghc", "--", "--numeric-version"]),
        numeric_version(env, "ghc", &["--numeric-version"]),
    );
    mismatch_messages(compiler, stack.as_deref(), path.as_deref())
}

async fn numeric_version(env: &ToolEnvironment, program: &str, args: &[&str]) -> Option<String> {
    let args: Vec<String> = args.iter().map(|a| (*a).to_string()).collect();
    match execute(Path::new(program), &args, &env.options, None).await {
        Ok(response) => response
            .stdout
            .first()
            .map(|line| line.trim().to_string())
            .filter(|v| !v.is_empty()),
        Err(err) => {
            tracing::debug!(program, "compiler version check skipped: {err}");
            None
        }
    }
}

#[must_use]
pub fn mismatch_messages(compiler: &str, stack: Option<&str>, path: Option<&str>) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(stack) = stack
        && stack != compiler
    {
        out.push(format!(
            "GHC version in your Stack '{stack}' doesn't match with GHC version used to build ghc-mod '{compiler}'. This can lead to problems when using Stack projects"
        ));
    }
    if let Some(path) = path
        && path != compiler
    {
        out.push(format!(
            "GHC version in your PATH '{path}' doesn't match with GHC version used to build ghc-mod '{compiler}'. This can lead to problems when using Cabal or Plain projects"
        ));
    }
    out
}
