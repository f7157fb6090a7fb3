//! Root-to-backend map, admission control and the query operations.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use gmod_config::{Settings, SettingsProvider, ToolConfig};
use gmod_types::{
    BrowseSymbol, CapabilityProfile, CaseSplitEdit, CheckLine, CheckMessage, Position, QueueName,
    Response, RunRequest, SigFill, SourceFile, TypeInfo,
};
use tokio::sync::broadcast;

use crate::backend::Backend;
use crate::diagnostics::{ErrorReport, RecentLog, SpawnFailureReport};
use crate::error::BackendError;
use crate::events::{BackendEvent, EventBus, WarningKind};
use crate::probe::ToolEnvironment;
use crate::queue::QueueSet;
use crate::root;

type BackendFuture = Shared<BoxFuture<'static, Result<Arc<Backend>, BackendError>>>;

/// A backend being probed or ready. `id` tells a stale entry from its replacement.
struct Slot {
    id: u64,
    future: BackendFuture,
}

/// Owns one backend per project root and routes every command through the queues.
pub struct BackendManager {
    config: Arc<ToolConfig>,
    settings: Arc<dyn SettingsProvider>,
    queues: QueueSet,
    events: EventBus,
    recent_log: RecentLog,
    backends: Mutex<HashMap<PathBuf, Slot>>,
    next_slot: AtomicU64,
}

impl BackendManager {
    #[must_use]
    pub fn new(config: ToolConfig, settings: Arc<dyn SettingsProvider>) -> Self {
        Self::with_recent_log(config, settings, RecentLog::default())
    }

    /// Like [`BackendManager::new`], attaching `recent_log` to every report.
    #[must_use]
    pub fn with_recent_log(
        config: ToolConfig,
        settings: Arc<dyn SettingsProvider>,
        recent_log: RecentLog,
    ) -> Self {
        let events = EventBus::new();
        let queues = QueueSet::new(config.max_browse_processes, config.low_memory, events.clone());
        Self {
            config: Arc::new(config),
            settings,
            queues,
            events,
            recent_log,
            backends: Mutex::new(HashMap::new()),
            next_slot: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BackendEvent> {
        self.events.subscribe()
    }

    #[must_use]
    pub fn recent_log(&self) -> &RecentLog {
        &self.recent_log
    }

    pub fn set_low_memory(&self, enabled: bool) {
        self.queues.set_low_memory(enabled);
    }

    pub fn set_queue_limit(&self, queue: QueueName, limit: usize) {
        self.queues.set_limit(queue, limit);
    }

    #[must_use]
    pub fn queue_limit(&self, queue: QueueName) -> usize {
        self.queues.limit(queue)
    }

    /// Commands running or waiting in `queue`.
    #[must_use]
    pub fn outstanding(&self, queue: QueueName) -> usize {
        self.queues.outstanding(queue)
    }

    /// Run `request` for `root` under `queue`'s admission control.
    ///
    /// Settings are read for the root at every call. A crash or timeout drops
    /// the root's backend so the next command reprobes.
    pub async fn queue_cmd(
        &self,
        queue: QueueName,
        root: &Path,
        mut request: RunRequest,
    ) -> Result<Response, BackendError> {
        let root = root::canonical(root);
        let settings = self.settings.settings(&root)?;
        if settings.disable {
            return Err(BackendError::Disabled { root });
        }
        if self.queues.low_memory() {
            request.interactive = self.config.enable_interactive;
        }

        let mut slot = None;
        let result = self
            .queues
            .submit(queue, async {
                let (id, backend) = self.acquire(&root).await?;
                slot = Some(id);
                backend.run(&request, &settings).await
            })
            .await;

        match result {
            Ok(response) => Ok(response),
            Err(err) => self.report_failure(&root, &request, &settings, slot, err),
        }
    }

    /// Capability profile of `root`'s backend, probing the tool if needed.
    pub async fn capabilities(&self, root: &Path) -> Result<Arc<CapabilityProfile>, BackendError> {
        let root = root::canonical(root);
        if self.settings.settings(&root)?.disable {
            return Err(BackendError::Disabled { root });
        }
        self.queues
            .submit(QueueName::Init, async {
                let (_, backend) = self.acquire(&root).await?;
                Ok(Arc::clone(backend.capabilities()))
            })
            .await
    }

    /// Kill every interactive process and forget every backend.
    pub async fn kill_process(&self) {
        let slots: Vec<(PathBuf, Slot)> = self
            .backends
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();
        for (root, slot) in slots {
            if let Some(Ok(backend)) = slot.future.peek() {
                let code = backend.kill().await;
                tracing::debug!(root = %root.display(), ?code, "backend killed");
            }
        }
    }

    pub async fn destroy(&self) {
        self.kill_process().await;
        self.events.emit(BackendEvent::Destroyed);
    }

    // Queries -----------------------------------------------------------------

    /// Modules visible from `root`.
    pub async fn list(&self, root: &Path) -> Result<Vec<String>, BackendError> {
        let response = self
            .queue_cmd(QueueName::List, root, RunRequest::new("list"))
            .await?;
        Ok(response.stdout)
    }

    /// Language extensions the compiler knows.
    pub async fn lang(&self, root: &Path) -> Result<Vec<String>, BackendError> {
        let response = self
            .queue_cmd(QueueName::Init, root, RunRequest::new("lang"))
            .await?;
        Ok(response.stdout)
    }

    /// Compiler flags.
    pub async fn flag(&self, root: &Path) -> Result<Vec<String>, BackendError> {
        let response = self
            .queue_cmd(QueueName::Init, root, RunRequest::new("flag"))
            .await?;
        Ok(response.stdout)
    }

    /// Exported symbols of `modules`. `Main` is skipped; nothing left means no call.
    pub async fn browse(
        &self,
        root: &Path,
        modules: &[String],
    ) -> Result<Vec<BrowseSymbol>, BackendError> {
        let modules: Vec<&String> = modules.iter().filter(|m| *m != "Main").collect();
        if modules.is_empty() {
            return Ok(Vec::new());
        }
        let caps = self.capabilities(root).await?;
        let mut dash_args = vec!["-d", "-o"];
        if caps.browse_parents {
            dash_args.push("-p");
        }
        let request = RunRequest::new("browse")
            .dash_args(dash_args)
            .args(modules);
        let response = self.queue_cmd(QueueName::Browse, root, request).await?;
        Ok(response
            .stdout
            .iter()
            .filter(|line| !line.trim().is_empty())
            .map(|line| BrowseSymbol::parse(line, caps.browse_parents))
            .collect())
    }

    /// Type of the innermost expression at `pos`.
    pub async fn type_at(&self, file: &SourceFile, pos: Position) -> Result<TypeInfo, BackendError> {
        let root = root_of(file);
        let caps = self.capabilities(&root).await?;
        let dash_args: &[&str] = if caps.type_constraints { &["-c"] } else { &[] };
        let request = file_request("type", file)
            .interactive(true)
            .dash_args(dash_args.iter().copied())
            .args(pos.to_args());
        let response = self.queue_cmd(QueueName::TypeInfo, &root, request).await?;
        TypeInfo::select(&response.stdout, pos).ok_or(BackendError::NoResult)
    }

    /// Information about `symbol` as seen from `file`.
    pub async fn info(&self, file: &SourceFile, symbol: &str) -> Result<String, BackendError> {
        let root = root_of(file);
        let request = file_request("info", file)
            .interactive(true)
            .args([symbol]);
        let response = self.queue_cmd(QueueName::TypeInfo, &root, request).await?;
        let text = response.stdout.join("\n");
        if text.trim().is_empty() || text.contains("Cannot show info") {
            return Err(BackendError::NoResult);
        }
        Ok(text)
    }

    /// Modules defining `symbol`.
    pub async fn find(&self, file: &SourceFile, symbol: &str) -> Result<Vec<String>, BackendError> {
        let root = root_of(file);
        let request = RunRequest::new("find").interactive(true).args([symbol]);
        let response = self.queue_cmd(QueueName::Find, &root, request).await?;
        Ok(response.stdout)
    }

    /// Case-split the variable at `pos`.
    pub async fn case_split(
        &self,
        file: &SourceFile,
        pos: Position,
    ) -> Result<Vec<CaseSplitEdit>, BackendError> {
        let root = root_of(file);
        let caps = self.capabilities(&root).await?;
        let request = file_request("split", file)
            .interactive(caps.interactive_case_split)
            .args(pos.to_args());
        let response = self.queue_cmd(QueueName::TypeInfo, &root, request).await?;
        Ok(response
            .stdout
            .iter()
            .filter_map(|line| CaseSplitEdit::parse_line(line))
            .collect())
    }

    /// Initial definition for the signature at `pos`.
    pub async fn sig_fill(&self, file: &SourceFile, pos: Position) -> Result<SigFill, BackendError> {
        let root = root_of(file);
        let request = file_request("sig", file)
            .interactive(true)
            .args(pos.to_args());
        let response = self.queue_cmd(QueueName::TypeInfo, &root, request).await?;
        if response.stdout.iter().all(|line| line.trim().is_empty()) {
            return Err(BackendError::NoResult);
        }
        SigFill::parse(&response.stdout).map_err(|err| BackendError::Unparsable(err.to_string()))
    }

    /// Compiler diagnostics for `file`. `fast` runs through the interactive process.
    pub async fn check(
        &self,
        file: &SourceFile,
        fast: bool,
    ) -> Result<Vec<CheckMessage>, BackendError> {
        let root = root_of(file);
        let request = file_request("check", file).interactive(fast);
        let response = self.queue_cmd(QueueName::CheckLint, &root, request).await?;
        Ok(self.check_messages(&root, &response, false))
    }

    /// hlint suggestions for `file`.
    pub async fn lint(&self, file: &SourceFile) -> Result<Vec<CheckMessage>, BackendError> {
        let root = root_of(file);
        let dash_args = self
            .config
            .hlint_options
            .iter()
            .flat_map(|opt| ["--hlintOpt".to_string(), opt.clone()]);
        let request = file_request("lint", file).dash_args(dash_args);
        let response = self.queue_cmd(QueueName::CheckLint, &root, request).await?;
        Ok(self.check_messages(&root, &response, true))
    }

    // Internals ---------------------------------------------------------------

    /// The backend for `root`, creating it on first use.
    ///
    /// Concurrent first callers await the same probe. A failed probe is
    /// reported once and its entry dropped, so the next call reprobes.
    async fn acquire(&self, root: &Path) -> Result<(u64, Arc<Backend>), BackendError> {
        let (id, future) = {
            let mut backends = self.backends.lock().unwrap_or_else(PoisonError::into_inner);
            match backends.get(root) {
                Some(slot) => (slot.id, slot.future.clone()),
                None => {
                    let id = self.next_slot.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(root = %root.display(), "creating backend");
                    let future = Backend::start(
                        root.to_path_buf(),
                        Arc::clone(&self.config),
                        self.events.clone(),
                    )
                    .map(|started| started.map(Arc::new))
                    .boxed()
                    .shared();
                    backends.insert(
                        root.to_path_buf(),
                        Slot {
                            id,
                            future: future.clone(),
                        },
                    );
                    (id, future)
                }
            }
        };

        match future.await {
            Ok(backend) => Ok((id, backend)),
            Err(err) => {
                if self.evict(root, id) {
                    self.report_spawn_failure(root, &err);
                }
                Err(err)
            }
        }
    }

    /// Drop `root`'s entry if it is still slot `id`. True when this call removed it.
    fn evict(&self, root: &Path, id: u64) -> bool {
        let mut backends = self.backends.lock().unwrap_or_else(PoisonError::into_inner);
        if backends.get(root).is_some_and(|slot| slot.id == id) {
            backends.remove(root);
            tracing::debug!(root = %root.display(), "backend evicted");
            true
        } else {
            false
        }
    }

    fn peek_capabilities(&self, root: &Path) -> Option<CapabilityProfile> {
        let backends = self.backends.lock().unwrap_or_else(PoisonError::into_inner);
        match backends.get(root)?.future.peek()? {
            Ok(backend) => Some(CapabilityProfile::clone(backend.capabilities())),
            Err(_) => None,
        }
    }

    fn report_spawn_failure(&self, root: &Path, err: &BackendError) {
        let env = ToolEnvironment::new(&self.config, root);
        let (stdout, stderr) = err.captured_output();
        let tool = match err {
            BackendError::Probe { tool, .. } => tool.clone(),
            _ => env.tool,
        };
        tracing::error!(root = %root.display(), "ghc-mod failed to start: {err}");
        self.events
            .emit(BackendEvent::SpawnFailed(SpawnFailureReport {
                root: root.to_path_buf(),
                tool,
                error: err.to_string(),
                path_entries: env.path_entries,
                stdout,
                stderr,
                recent_log: self.recent_log.snapshot(),
            }));
    }

    /// Decide what a failed command resolves to: an empty response when
    /// errors are suppressed, otherwise the error, reported as an event.
    fn report_failure(
        &self,
        root: &Path,
        request: &RunRequest,
        settings: &Settings,
        slot: Option<u64>,
        err: BackendError,
    ) -> Result<Response, BackendError> {
        let capabilities = self.peek_capabilities(root);
        if err.is_fatal_to_backend()
            && let Some(id) = slot
        {
            self.evict(root, id);
        }

        match err {
            // Already reported as a spawn failure, or never attempted.
            BackendError::Probe { .. } | BackendError::Disabled { .. } => return Err(err),
            _ if settings.suppress_errors => {
                tracing::warn!(
                    root = %root.display(),
                    command = %request.command,
                    "ghc-mod command failed (suppressed): {err}"
                );
                return Ok(Response::default());
            }
            _ => {}
        }

        let (stdout, stderr) = err.captured_output();
        let mut args = request.dash_args.clone();
        args.extend(request.file.iter().map(|f| f.to_string_lossy().into_owned()));
        args.extend(request.args.iter().cloned());
        tracing::error!(root = %root.display(), command = %request.command, "ghc-mod command failed: {err}");
        self.events.emit(BackendEvent::Error(ErrorReport {
            root: root.to_path_buf(),
            command: request.command.clone(),
            args,
            error: err.to_string(),
            stdout,
            stderr,
            capabilities,
            recent_log: self.recent_log.snapshot(),
        }));
        Err(err)
    }

    /// Classify check/lint output; tool messages become events.
    fn check_messages(&self, root: &Path, response: &Response, lint: bool) -> Vec<CheckMessage> {
        let mut messages = Vec::new();
        for line in &response.stdout {
            match CheckMessage::parse_line(line, lint) {
                Some(CheckLine::Message(mut message)) => {
                    if message.file.is_relative() {
                        message.file = root.join(&message.file);
                    }
                    messages.push(message);
                }
                Some(CheckLine::ToolWarning(message)) => {
                    self.events.warn(root, WarningKind::ToolMessage, message);
                }
                Some(CheckLine::ToolError(message)) => {
                    tracing::error!(root = %root.display(), "ghc-mod reported: {message}");
                    self.events.emit(BackendEvent::Error(ErrorReport {
                        root: root.to_path_buf(),
                        command: if lint { "lint" } else { "check" }.to_string(),
                        args: Vec::new(),
                        error: message,
                        stdout: response.stdout.clone(),
                        stderr: response.stderr.clone(),
                        capabilities: self.peek_capabilities(root),
                        recent_log: self.recent_log.snapshot(),
                    }));
                }
                None => tracing::trace!(line = %line, "unrecognised check output"),
            }
        }
        messages
    }
}

/// Request carrying `file` and its unsaved text.
fn file_request(command: &str, file: &SourceFile) -> RunRequest {
    RunRequest::new(command)
        .file(absolute(&file.path))
        .text(file.text.clone())
}

fn root_of(file: &SourceFile) -> PathBuf {
    root::project_root(&absolute(&file.path))
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
