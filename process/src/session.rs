//! Session handle: owns one `legacy-interactive` child and serializes commands to it.
//!
//! The child speaks a strict request/response protocol over shared stdio, so
//! only one caller may talk to it at a time. Callers queue on a fair mutex
//! guarding the stdio handles; stdout and stderr are read only while that
//! mutex is held, which keeps concurrent calls from interleaving reads.
//!
//! Two background tasks run per session:
//! - the supervisor owns the [`Child`], kills it on request and publishes the
//!   exit through a watch channel;
//! - the inactivity watchdog (when enabled) requests a kill after the session
//!   has been idle for the configured time.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use gmod_types::{CapabilityProfile, Response, SENTINEL_LINE};
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex, MutexGuard, watch};
use tokio::time::Instant;

use crate::error::SessionError;
use crate::options::ProcessOptions;
use crate::reader::LineReader;
use crate::{usage, wire};

/// Default bound on callers waiting for a busy session.
pub const DEFAULT_MAX_QUEUED: usize = 100;

/// How long to wait for exit details and trailing output once the child died.
const EXIT_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub tool: PathBuf,
    /// Global options placed before the interactive-mode flag.
    pub tool_options: Vec<String>,
    pub process: ProcessOptions,
    pub capabilities: Arc<CapabilityProfile>,
    /// Deadline for each command's sentinel. Zero disables.
    pub action_timeout: Duration,
    /// Idle time after which the child is killed. Zero disables.
    pub inactivity_timeout: Duration,
    /// Resident memory ceiling checked before each command. Zero disables.
    pub max_mem_bytes: u64,
    /// Callers allowed to wait while a command is in flight.
    pub max_queued: usize,
}

impl SessionConfig {
    #[must_use]
    pub fn new(tool: impl Into<PathBuf>, capabilities: Arc<CapabilityProfile>) -> Self {
        Self {
            tool: tool.into(),
            tool_options: Vec::new(),
            process: ProcessOptions::default(),
            capabilities,
            action_timeout: Duration::ZERO,
            inactivity_timeout: Duration::ZERO,
            max_mem_bytes: 0,
            max_queued: DEFAULT_MAX_QUEUED,
        }
    }
}

/// Why the session killed its child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillReason {
    Requested,
    ActionTimeout,
    Inactivity,
    MemoryCeiling,
    /// Every handle to the session was dropped.
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionExit {
    /// `None` when the child died from a signal.
    pub code: Option<i32>,
    /// Set when the session killed the child itself.
    pub killed: Option<KillReason>,
}

impl fmt::Display for SessionExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.killed, self.code) {
            (Some(reason), _) => write!(f, "killed: {reason:?}"),
            (None, Some(code)) => write!(f, "exit status {code}"),
            (None, None) => f.write_str("terminated by signal"),
        }
    }
}

struct SessionIo {
    stdin: Option<ChildStdin>,
    stdout: LineReader<ChildStdout>,
    stderr: LineReader<ChildStderr>,
}

enum Outcome {
    Sentinel,
    Eof,
    ReadFailed(io::Error),
    Exited,
    TimedOut,
}

/// Decrements the waiting count when a queued caller is admitted or gives up.
struct WaitingSlot<'a>(&'a AtomicUsize);

impl Drop for WaitingSlot<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct Session {
    cwd: PathBuf,
    tool_options: Vec<String>,
    capabilities: Arc<CapabilityProfile>,
    pid: Option<u32>,
    action_timeout: Duration,
    max_mem_bytes: u64,
    max_queued: usize,
    io: Mutex<SessionIo>,
    waiting: AtomicUsize,
    kill_tx: Arc<watch::Sender<Option<KillReason>>>,
    exit_rx: watch::Receiver<Option<SessionExit>>,
    activity_tx: watch::Sender<Instant>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("cwd", &self.cwd)
            .field("pid", &self.pid)
            .field("tool_options", &self.tool_options)
            .field("alive", &self.is_alive())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Spawn `tool <tool_options> legacy-interactive`. Must run inside a Tokio runtime.
    pub fn spawn(config: SessionConfig) -> Result<Self, SessionError> {
        let mut args = config.tool_options.clone();
        args.push(wire::INTERACTIVE_MODE.to_string());
        tracing::debug!(
            tool = %config.tool.display(),
            cwd = %config.process.cwd.display(),
            ?args,
            "spawning interactive process"
        );

        let mut cmd = Command::new(&config.tool);
        cmd.args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        config.process.apply(&mut cmd);

        let spawn_error = |source| SessionError::Spawn {
            tool: config.tool.clone(),
            source,
        };
        let mut child = cmd.spawn().map_err(spawn_error)?;
        let stdin = child.stdin.take();
        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(spawn_error(io::Error::other("child stdio was not piped")));
        };
        let pid = child.id();

        let (kill_tx, kill_rx) = watch::channel(None);
        let kill_tx = Arc::new(kill_tx);
        let (exit_tx, exit_rx) = watch::channel(None);
        let (activity_tx, activity_rx) = watch::channel(Instant::now());

        tokio::spawn(supervise(child, kill_rx, exit_tx));
        if !config.inactivity_timeout.is_zero() {
            tokio::spawn(watch_inactivity(
                config.inactivity_timeout,
                activity_rx,
                Arc::clone(&kill_tx),
                exit_rx.clone(),
            ));
        }

        Ok(Self {
            cwd: config.process.cwd,
            tool_options: config.tool_options,
            capabilities: config.capabilities,
            pid,
            action_timeout: config.action_timeout,
            max_mem_bytes: config.max_mem_bytes,
            max_queued: config.max_queued.max(1),
            io: Mutex::new(SessionIo {
                stdin,
                stdout: LineReader::new(stdout),
                stderr: LineReader::new(stderr),
            }),
            waiting: AtomicUsize::new(0),
            kill_tx,
            exit_rx,
            activity_tx,
        })
    }

    /// Send one command (and optional payload) and collect its response.
    ///
    /// Calls are applied strictly in the order they were admitted.
    pub async fn interact(
        &self,
        command: &str,
        args: &[String],
        payload: Option<&str>,
    ) -> Result<Response, SessionError> {
        let mut io = self.admit().await?;
        self.activity_tx.send_replace(Instant::now());
        tracing::debug!(cwd = %self.cwd.display(), command, "started interactive action block");

        let result = self.exchange(&mut io, command, args, payload).await;

        self.activity_tx.send_replace(Instant::now());
        tracing::debug!(
            cwd = %self.cwd.display(),
            command,
            ok = result.is_ok(),
            "ended interactive action block"
        );
        result
    }

    /// Close stdin, kill the child and wait for it. Returns the exit code.
    pub async fn kill(&self) -> Option<i32> {
        if let Ok(mut io) = self.io.try_lock() {
            io.stdin.take();
        }
        self.request_kill(KillReason::Requested);
        self.exited().await.code
    }

    /// Wait until the child has exited.
    pub async fn exited(&self) -> SessionExit {
        let mut exit_rx = self.exit_rx.clone();
        match exit_rx.wait_for(Option::is_some).await {
            Ok(exit) => (*exit).unwrap_or(SessionExit {
                code: None,
                killed: None,
            }),
            Err(_) => SessionExit {
                code: None,
                killed: None,
            },
        }
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.exit_rx.borrow().is_none()
    }

    #[must_use]
    pub fn exit_status(&self) -> Option<SessionExit> {
        *self.exit_rx.borrow()
    }

    #[must_use]
    pub fn tool_options(&self) -> &[String] {
        &self.tool_options
    }

    #[must_use]
    pub fn capabilities(&self) -> &Arc<CapabilityProfile> {
        &self.capabilities
    }

    #[must_use]
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    async fn admit(&self) -> Result<MutexGuard<'_, SessionIo>, SessionError> {
        let queued = self.waiting.fetch_add(1, Ordering::SeqCst);
        let _slot = WaitingSlot(&self.waiting);
        if queued >= self.max_queued {
            tracing::warn!(limit = self.max_queued, "interactive queue full, rejecting");
            return Err(SessionError::Overloaded {
                limit: self.max_queued,
            });
        }
        Ok(self.io.lock().await)
    }

    async fn exchange(
        &self,
        io: &mut SessionIo,
        command: &str,
        args: &[String],
        payload: Option<&str>,
    ) -> Result<Response, SessionError> {
        if let Some(exit) = self.exit_status() {
            return Err(SessionError::Crashed {
                reason: format!("process already exited ({exit})"),
                exit_code: exit.code,
                stdout: Vec::new(),
                stderr: Vec::new(),
            });
        }
        self.enforce_memory_ceiling().await?;

        let request = wire::encode_command(command, args, self.capabilities.quote_args);
        tracing::debug!(request = request.trim_end(), "sending interactive command");
        if let Err(err) = write_request(io, &request, payload).await {
            let exit = self.exit_within_grace().await;
            tracing::warn!("failed to write to interactive process: {err}");
            return Err(SessionError::Crashed {
                reason: format!("failed to write request: {err}"),
                exit_code: exit.and_then(|e| e.code),
                stdout: Vec::new(),
                stderr: Vec::new(),
            });
        }

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        match self.await_sentinel(io, &mut stdout, &mut stderr).await {
            Outcome::Sentinel => {
                while let Some(line) = io.stderr.buffered_line() {
                    stderr.push(line);
                }
                Ok(Response::new(stdout, stderr))
            }
            Outcome::TimedOut => {
                tracing::warn!(
                    timeout_secs = self.action_timeout.as_secs_f32(),
                    command,
                    "interactive action timed out, killing process"
                );
                self.request_kill(KillReason::ActionTimeout);
                self.exited().await;
                Err(SessionError::TimedOut {
                    timeout: self.action_timeout,
                    stdout,
                    stderr,
                })
            }
            outcome => {
                let reason = match outcome {
                    Outcome::ReadFailed(err) => format!("failed to read response: {err}"),
                    Outcome::Eof => "stdout closed before response completed".to_string(),
                    _ => "process exited before response completed".to_string(),
                };
                drain_after_exit(io, &mut stdout, &mut stderr).await;
                let exit = self.exit_within_grace().await;
                tracing::warn!(
                    ?exit,
                    ?stderr,
                    "interactive process crashed: {reason}"
                );
                Err(SessionError::Crashed {
                    reason,
                    exit_code: exit.and_then(|e| e.code),
                    stdout,
                    stderr,
                })
            }
        }
    }

    async fn await_sentinel(
        &self,
        io: &mut SessionIo,
        stdout: &mut Vec<String>,
        stderr: &mut Vec<String>,
    ) -> Outcome {
        let timed = !self.action_timeout.is_zero();
        let deadline = Instant::now() + self.action_timeout;
        let mut exit_rx = self.exit_rx.clone();
        let mut stderr_open = !io.stderr.is_eof();

        loop {
            tokio::select! {
                biased;
                line = io.stderr.next_line(), if stderr_open => match line {
                    Ok(Some(line)) => {
                        tracing::trace!(line = %line, "interactive stderr");
                        stderr.push(line);
                    }
                    Ok(None) | Err(_) => stderr_open = false,
                },
                line = io.stdout.next_line() => match line {
                    Ok(Some(line)) if line == SENTINEL_LINE => return Outcome::Sentinel,
                    Ok(Some(line)) => {
                        tracing::trace!(line = %line, "interactive stdout");
                        stdout.push(line);
                    }
                    Ok(None) => return Outcome::Eof,
                    Err(err) => return Outcome::ReadFailed(err),
                },
                _ = exit_rx.wait_for(Option::is_some) => return Outcome::Exited,
                () = tokio::time::sleep_until(deadline), if timed => return Outcome::TimedOut,
            }
        }
    }

    async fn enforce_memory_ceiling(&self) -> Result<(), SessionError> {
        if self.max_mem_bytes == 0 {
            return Ok(());
        }
        let Some(rss) = self.pid.and_then(usage::resident_memory_bytes) else {
            return Ok(());
        };
        tracing::debug!(rss, "interactive process resident memory");
        if rss <= self.max_mem_bytes {
            return Ok(());
        }

        tracing::warn!(
            rss,
            ceiling = self.max_mem_bytes,
            "interactive process over memory ceiling, killing"
        );
        self.request_kill(KillReason::MemoryCeiling);
        let exit = self.exited().await;
        Err(SessionError::Crashed {
            reason: format!(
                "resident memory {rss} bytes exceeds ceiling of {} bytes",
                self.max_mem_bytes
            ),
            exit_code: exit.code,
            stdout: Vec::new(),
            stderr: Vec::new(),
        })
    }

    fn request_kill(&self, reason: KillReason) {
        self.kill_tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });
    }

    async fn exit_within_grace(&self) -> Option<SessionExit> {
        tokio::time::timeout(EXIT_GRACE, self.exited()).await.ok()
    }
}

async fn write_request(io: &mut SessionIo, request: &str, payload: Option<&str>) -> io::Result<()> {
    let stdin = io
        .stdin
        .as_mut()
        .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "stdin already closed"))?;
    stdin.write_all(request.as_bytes()).await?;
    if let Some(text) = payload {
        stdin.write_all(wire::encode_payload(text).as_bytes()).await?;
    }
    stdin.flush().await
}

/// Collect whatever the dead child left in its pipes.
async fn drain_after_exit(io: &mut SessionIo, stdout: &mut Vec<String>, stderr: &mut Vec<String>) {
    let drain = async {
        while let Ok(Some(line)) = io.stdout.next_line().await {
            stdout.push(line);
        }
        while let Ok(Some(line)) = io.stderr.next_line().await {
            stderr.push(line);
        }
    };
    // Grandchildren may keep the pipes open.
    let _ = tokio::time::timeout(EXIT_GRACE, drain).await;
}

enum Supervised {
    Exited(io::Result<ExitStatus>),
    Kill(KillReason),
}

async fn supervise(
    mut child: Child,
    mut kill_rx: watch::Receiver<Option<KillReason>>,
    exit_tx: watch::Sender<Option<SessionExit>>,
) {
    let event = tokio::select! {
        status = child.wait() => Supervised::Exited(status),
        requested = kill_rx.wait_for(Option::is_some) => {
            Supervised::Kill(
                requested.map_or(KillReason::Dropped, |r| (*r).unwrap_or(KillReason::Requested)),
            )
        }
    };

    let (status, killed) = match event {
        Supervised::Exited(status) => (status, None),
        Supervised::Kill(reason) => {
            tracing::debug!(?reason, "killing interactive process");
            if let Err(e) = child.start_kill() {
                tracing::debug!("kill failed (process likely gone): {e}");
            }
            (child.wait().await, Some(reason))
        }
    };

    let code = match status {
        Ok(status) => status.code(),
        Err(e) => {
            tracing::warn!("failed to reap interactive process: {e}");
            None
        }
    };
    if killed.is_none() {
        tracing::info!(?code, "interactive process exited");
    }
    exit_tx.send_replace(Some(SessionExit { code, killed }));
}

async fn watch_inactivity(
    idle: Duration,
    mut activity_rx: watch::Receiver<Instant>,
    kill_tx: Arc<watch::Sender<Option<KillReason>>>,
    mut exit_rx: watch::Receiver<Option<SessionExit>>,
) {
    loop {
        let deadline = *activity_rx.borrow_and_update() + idle;
        tokio::select! {
            () = tokio::time::sleep_until(deadline) => {
                tracing::info!(idle_secs = idle.as_secs(), "interactive process idle, killing");
                kill_tx.send_if_modified(|current| {
                    if current.is_some() {
                        return false;
                    }
                    *current = Some(KillReason::Inactivity);
                    true
                });
                return;
            }
            changed = activity_rx.changed() => {
                if changed.is_err() {
                    return;
                }
            }
            _ = exit_rx.wait_for(Option::is_some) => return,
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use gmod_types::ToolVersion;

    fn sh_config(script: &str, quote_args: bool) -> SessionConfig {
        let version = if quote_args { vec![5, 6, 0] } else { vec![5, 4, 0] };
        let caps = Arc::new(CapabilityProfile::derive(&ToolVersion::new(version), false));
        let mut config = SessionConfig::new("/bin/sh", caps);
        config.tool_options = vec!["-c".to_string(), script.to_string()];
        config
    }

    const FOO_SCRIPT: &str = r#"while IFS= read -r line; do echo foo; echo OK; done"#;

    const ECHO_SCRIPT: &str = r#"
while IFS= read -r line; do
  case "$line" in
    hang*) sleep 30 ;;
    crash*) echo partial; exit 3 ;;
    warn*) echo oops >&2; sleep 0.2; echo done; echo OK ;;
    *) echo "$line"; echo OK ;;
  esac
done
"#;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    #[tokio::test]
    async fn returns_lines_before_sentinel() {
        let session = Session::spawn(sh_config(FOO_SCRIPT, false)).unwrap();
        let response = session.interact("type", &args(&["A.hs"]), None).await.unwrap();
        assert_eq!(response, Response::new(vec!["foo".into()], vec![]));
        assert!(session.is_alive());
        session.kill().await;
        assert!(!session.is_alive());
    }

    #[tokio::test]
    async fn plain_request_line_reaches_the_process() {
        let session = Session::spawn(sh_config(ECHO_SCRIPT, false)).unwrap();
        let response = session
            .interact("info", &args(&["Main.hs", "foo"]), None)
            .await
            .unwrap();
        assert_eq!(response.stdout, vec!["info Main.hs foo"]);
    }

    #[tokio::test]
    async fn escaped_request_line_reaches_the_process() {
        let session = Session::spawn(sh_config(ECHO_SCRIPT, true)).unwrap();
        let response = session
            .interact("info", &args(&["My File.hs"]), None)
            .await
            .unwrap();
        assert_eq!(response.stdout, vec!["ascii-escape info \x02My File.hs\x03"]);
        assert_eq!(wire::split_escaped(&response.stdout[0]), vec!["My File.hs"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_calls_complete_in_admission_order() {
        let session = Session::spawn(sh_config(ECHO_SCRIPT, false)).unwrap();
        let order = std::sync::Mutex::new(Vec::new());

        let first = async {
            let r = session.interact("first", &[], None).await.unwrap();
            order.lock().unwrap().push("first");
            r
        };
        let second = async {
            let r = session.interact("second", &[], None).await.unwrap();
            order.lock().unwrap().push("second");
            r
        };
        let (a, b) = tokio::join!(first, second);

        assert_eq!(a.stdout, vec!["first"]);
        assert_eq!(b.stdout, vec!["second"]);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn stderr_is_attached_to_the_response() {
        let session = Session::spawn(sh_config(ECHO_SCRIPT, false)).unwrap();
        let response = session.interact("warn", &[], None).await.unwrap();
        assert_eq!(response.stdout, vec!["done"]);
        assert_eq!(response.stderr, vec!["oops"]);
    }

    #[tokio::test]
    async fn payload_is_terminated_by_eot_line() {
        let script = r#"
while IFS= read -r line; do
  case "$line" in
    map-file*)
      n=0
      while IFS= read -r data; do
        [ "$data" = "$(printf '\004')" ] && break
        n=$((n+1))
      done
      echo "mapped $n"; echo OK ;;
    *) echo OK ;;
  esac
done
"#;
        let session = Session::spawn(sh_config(script, false)).unwrap();
        let response = session
            .interact("map-file", &args(&["A.hs"]), Some("module A where\nx = 1"))
            .await
            .unwrap();
        assert_eq!(response.stdout, vec!["mapped 2"]);
        let after = session.interact("check", &[], None).await.unwrap();
        assert!(after.stdout.is_empty());
    }

    #[tokio::test]
    async fn timeout_kills_the_process() {
        let mut config = sh_config(ECHO_SCRIPT, false);
        config.action_timeout = Duration::from_secs(1);
        let session = Session::spawn(config).unwrap();

        let err = session.interact("hang", &[], None).await.unwrap_err();
        assert!(matches!(err, SessionError::TimedOut { .. }), "{err:?}");
        assert!(!session.is_alive());
        assert_eq!(
            session.exit_status().and_then(|e| e.killed),
            Some(KillReason::ActionTimeout)
        );
    }

    #[tokio::test]
    async fn crash_carries_partial_output() {
        let session = Session::spawn(sh_config(ECHO_SCRIPT, false)).unwrap();
        let err = session.interact("crash", &[], None).await.unwrap_err();
        let SessionError::Crashed { stdout, .. } = err else {
            panic!("expected crash, got {err:?}");
        };
        assert_eq!(stdout, vec!["partial"]);
        assert_eq!(session.exited().await.code, Some(3));

        let again = session.interact("echo", &[], None).await.unwrap_err();
        assert!(matches!(again, SessionError::Crashed { .. }));
    }

    #[tokio::test]
    async fn inactivity_watchdog_kills_idle_process() {
        let mut config = sh_config(ECHO_SCRIPT, false);
        config.inactivity_timeout = Duration::from_millis(200);
        let session = Session::spawn(config).unwrap();
        session.interact("ping", &[], None).await.unwrap();

        let exit = tokio::time::timeout(Duration::from_secs(5), session.exited())
            .await
            .unwrap();
        assert_eq!(exit.killed, Some(KillReason::Inactivity));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn waiting_line_is_bounded() {
        let mut config = sh_config(ECHO_SCRIPT, false);
        config.max_queued = 1;
        let session = Arc::new(Session::spawn(config).unwrap());

        let busy = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.interact("hang", &[], None).await }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        let queued = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.interact("next", &[], None).await }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;

        let err = session.interact("third", &[], None).await.unwrap_err();
        assert!(matches!(err, SessionError::Overloaded { limit: 1 }));

        session.kill().await;
        assert!(busy.await.unwrap().is_err());
        assert!(queued.await.unwrap().is_err());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn memory_ceiling_kills_before_command() {
        let mut config = sh_config(ECHO_SCRIPT, false);
        config.max_mem_bytes = 1;
        let session = Session::spawn(config).unwrap();
        let err = session.interact("ping", &[], None).await.unwrap_err();
        assert!(matches!(err, SessionError::Crashed { .. }));
        assert_eq!(
            session.exit_status().and_then(|e| e.killed),
            Some(KillReason::MemoryCeiling)
        );
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let caps = Arc::new(CapabilityProfile::derive(&ToolVersion::new(vec![5, 6]), false));
        let config = SessionConfig::new("/nonexistent/ghc-mod", caps);
        let err = Session::spawn(config).unwrap_err();
        assert!(matches!(err, SessionError::Spawn { .. }));
    }
}
