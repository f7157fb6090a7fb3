//! One project root's backend: capability profile, interactive session and
//! the argument-shaping policy for every command.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gmod_config::{Settings, ToolConfig};
use gmod_process::{Session, SessionConfig, execute, wire};
use gmod_types::{CapabilityProfile, Response, RunRequest, VersionInfo};
use tokio::sync::Mutex;

use crate::error::BackendError;
use crate::events::{EventBus, WarningKind};
use crate::probe::{self, ToolEnvironment};

/// Shaped command for one invocation.
#[derive(Debug, Clone)]
struct Invocation<'a> {
    command: &'a str,
    file: Option<String>,
    text: Option<&'a str>,
    args: Vec<String>,
}

pub struct Backend {
    root: PathBuf,
    config: Arc<ToolConfig>,
    env: ToolEnvironment,
    version: VersionInfo,
    capabilities: Arc<CapabilityProfile>,
    /// Spawned on the first interactive command.
    session: Mutex<Option<Arc<Session>>>,
    events: EventBus,
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("root", &self.root)
            .field("tool", &self.env.tool)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl Backend {
    /// Probe the tool for `root` and build a backend for it.
    ///
    /// Version advisories are reported as warnings. The compiler cross-check
    /// runs in the background and never delays the backend.
    pub async fn start(
        root: PathBuf,
        config: Arc<ToolConfig>,
        events: EventBus,
    ) -> Result<Self, BackendError> {
        let env = ToolEnvironment::new(&config, &root);
        let probed =
            probe::probe_version(&env, &root, config.init_timeout(), config.experimental).await?;

        if let Some(advisory) = probed.advisory {
            events.warn(
                &root,
                WarningKind::VersionAdvisory,
                advisory.message(&probed.version.version),
            );
        }

        tokio::spawn({
            let env = env.clone();
            let events = events.clone();
            let root = root.clone();
            let compiler = probed.version.compiler.clone();
            async move {
                for message in probe::compiler_mismatches(&env, &compiler).await {
                    events.warn(&root, WarningKind::VersionMismatch, message);
                }
            }
        });

        Ok(Self {
            root,
            config,
            env,
            version: probed.version,
            capabilities: Arc::new(probed.capabilities),
            session: Mutex::new(None),
            events,
        })
    }

    #[must_use]
    pub fn capabilities(&self) -> &Arc<CapabilityProfile> {
        &self.capabilities
    }

    /// Run one command with `settings`' global options.
    ///
    /// Unsaved text reaches the tool through its file-mapping protocol when
    /// supported, otherwise through a temporary file whose path is rewritten
    /// back to the original in every returned line.
    pub async fn run(
        &self,
        request: &RunRequest,
        settings: &Settings,
    ) -> Result<Response, BackendError> {
        let global = settings.global_options();
        let interactive = request.interactive && self.config.enable_interactive;
        let invocation = Invocation {
            command: &request.command,
            file: request.file.as_ref().map(|f| f.to_string_lossy().into_owned()),
            text: request.text.as_deref(),
            args: command_args(&self.capabilities, request),
        };

        let response = match (&request.file, invocation.text) {
            (Some(original), Some(text)) if !self.capabilities.file_map => {
                self.run_with_temp_file(&global, invocation, interactive, original, text)
                    .await?
            }
            _ => self.dispatch(&global, &invocation, interactive).await?,
        };

        let response = Response::new(
            response.stdout.iter().map(|l| wire::decode_nul(l)).collect(),
            response.stderr,
        );
        if response.has_stderr() {
            self.events.warn(
                &self.root,
                WarningKind::StderrOutput,
                response.stderr.join("\n"),
            );
        }
        Ok(response)
    }

    /// Kill the interactive process, if one is running.
    pub async fn kill(&self) -> Option<i32> {
        let session = self.session.lock().await.take()?;
        tracing::debug!(root = %self.root.display(), "killing interactive process");
        session.kill().await
    }

    async fn dispatch(
        &self,
        global: &[String],
        invocation: &Invocation<'_>,
        interactive: bool,
    ) -> Result<Response, BackendError> {
        if interactive && let Some(session) = self.session(global).await {
            return self.run_interactive(&session, invocation).await;
        }
        self.run_batch(global, invocation).await
    }

    async fn run_with_temp_file(
        &self,
        global: &[String],
        invocation: Invocation<'_>,
        interactive: bool,
        original: &Path,
        text: &str,
    ) -> Result<Response, BackendError> {
        let suffix = original
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let mut temp = tempfile::Builder::new()
            .prefix("gmod-")
            .suffix(&suffix)
            .tempfile()
            .map_err(|e| BackendError::TempFile(Arc::new(e)))?;
        temp.write_all(text.as_bytes())
            .and_then(|()| temp.flush())
            .map_err(|e| BackendError::TempFile(Arc::new(e)))?;

        let temp_path = temp.path().to_string_lossy().into_owned();
        tracing::debug!(temp = %temp_path, original = %original.display(), "staged unsaved buffer");
        let staged = Invocation {
            file: Some(temp_path.clone()),
            text: None,
            ..invocation
        };
        let response = self.dispatch(global, &staged, interactive).await?;
        // `temp` is removed when dropped, on every path out of this function.
        Ok(response.replace_all(&temp_path, &original.to_string_lossy()))
    }

    async fn run_interactive(
        &self,
        session: &Session,
        invocation: &Invocation<'_>,
    ) -> Result<Response, BackendError> {
        let file = invocation.file.as_deref().map(|file| {
            if self.capabilities.quote_args {
                file.to_string()
            } else {
                relative_to(&self.root, file)
            }
        });

        let mapped = match (&file, invocation.text) {
            (Some(file), Some(text)) => {
                session
                    .interact("map-file", std::slice::from_ref(file), Some(text))
                    .await?;
                Some(file)
            }
            _ => None,
        };

        let mut args = Vec::with_capacity(invocation.args.len() + 1);
        args.extend(file.iter().cloned());
        args.extend(invocation.args.iter().cloned());
        let result = session.interact(invocation.command, &args, None).await;

        if let Some(file) = mapped
            && let Err(err) = session
                .interact("unmap-file", std::slice::from_ref(file), None)
                .await
        {
            tracing::warn!(file = %file, "failed to unmap file: {err}");
        }
        Ok(result?)
    }

    async fn run_batch(
        &self,
        global: &[String],
        invocation: &Invocation<'_>,
    ) -> Result<Response, BackendError> {
        let argv = batch_argv(global, invocation);
        let stdin = invocation.text.map(wire::encode_payload);
        let mut options = self.env.options.clone();
        let timeout = self.config.action_timeout();
        if !timeout.is_zero() {
            options = options.with_timeout(timeout);
        }
        Ok(execute(&self.env.tool, &argv, &options, stdin.as_deref()).await?)
    }

    /// The live session for `global` options, spawning or respawning as needed.
    ///
    /// `None` when the process cannot be spawned; the caller falls back to batch.
    async fn session(&self, global: &[String]) -> Option<Arc<Session>> {
        let mut slot = self.session.lock().await;
        if let Some(session) = slot.as_ref() {
            if session.is_alive() && session.tool_options() == global {
                return Some(Arc::clone(session));
            }
            if session.is_alive() {
                tracing::info!(root = %self.root.display(), "ghc-mod options changed, restarting interactive process");
                session.kill().await;
            }
            *slot = None;
        }

        let config = SessionConfig {
            tool: self.env.tool.clone(),
            tool_options: global.to_vec(),
            process: self.env.options.clone(),
            capabilities: Arc::clone(&self.capabilities),
            action_timeout: self.config.action_timeout(),
            inactivity_timeout: self.config.inactivity_timeout(),
            max_mem_bytes: self.config.max_mem_bytes(),
            max_queued: self.config.max_queued_requests,
        };
        match Session::spawn(config) {
            Ok(session) => {
                let session = Arc::new(session);
                *slot = Some(Arc::clone(&session));
                Some(session)
            }
            Err(err) => {
                tracing::warn!(root = %self.root.display(), "interactive process unavailable, using batch: {err}");
                None
            }
        }
    }
}

/// Command options and positional arguments, split by `--` when supported.
fn command_args(capabilities: &CapabilityProfile, request: &RunRequest) -> Vec<String> {
    let mut args = request.dash_args.clone();
    if capabilities.optparse {
        args.push("--".to_string());
    }
    args.extend(request.args.iter().cloned());
    args
}

/// Full argv for a batch run: global options, file mapping, command, file, arguments.
fn batch_argv(global: &[String], invocation: &Invocation<'_>) -> Vec<String> {
    let mut argv = global.to_vec();
    if let (Some(file), Some(_)) = (&invocation.file, invocation.text) {
        argv.push("--map-file".to_string());
        argv.push(file.clone());
    }
    argv.push(invocation.command.to_string());
    argv.extend(invocation.file.iter().cloned());
    argv.extend(invocation.args.iter().cloned());
    argv
}

fn relative_to(root: &Path, file: &str) -> String {
    Path::new(file)
        .strip_prefix(root)
        .map(|rel| rel.to_string_lossy().into_owned())
        .unwrap_or_else(|_| file.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmod_types::ToolVersion;

    fn profile(parts: &[u32]) -> CapabilityProfile {
        CapabilityProfile::derive(&ToolVersion::new(parts.to_vec()), false)
    }

    #[test]
    fn separator_only_with_optparse() {
        let request = RunRequest::new("type").dash_args(["-c"]).args(["3", "4"]);
        assert_eq!(
            command_args(&profile(&[5, 6]), &request),
            vec!["-c", "--", "3", "4"]
        );
        assert_eq!(
            command_args(&profile(&[5, 4]), &request),
            vec!["-c", "3", "4"]
        );
    }

    #[test]
    fn batch_argv_maps_file_when_text_present() {
        let invocation = Invocation {
            command: "check",
            file: Some("/proj/A.hs".into()),
            text: Some("module A where"),
            args: vec![],
        };
        let global = vec!["--ghc-option".to_string(), "-Wall".to_string()];
        assert_eq!(
            batch_argv(&global, &invocation),
            vec![
                "--ghc-option",
                "-Wall",
                "--map-file",
                "/proj/A.hs",
                "check",
                "/proj/A.hs"
            ]
        );
    }

    #[test]
    fn batch_payload_ends_with_eot_line() {
        let stdin = wire::encode_payload("module A where\nx = 1");
        let lines: Vec<&str> = stdin.lines().collect();
        assert_eq!(lines, vec!["module A where", "x = 1", "\u{4}"]);
    }

    #[test]
    fn batch_argv_without_text_has_no_mapping() {
        let invocation = Invocation {
            command: "list",
            file: None,
            text: None,
            args: vec!["-d".into()],
        };
        assert_eq!(batch_argv(&[], &invocation), vec!["list", "-d"]);
    }

    #[test]
    fn relative_paths_only_inside_root() {
        let root = Path::new("/proj");
        assert_eq!(relative_to(root, "/proj/src/A.hs"), "src/A.hs");
        assert_eq!(relative_to(root, "/tmp/gmod-1.hs"), "/tmp/gmod-1.hs");
    }
}
