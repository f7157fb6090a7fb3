//! One-shot invocations of the tool.

use std::io;
use std::path::Path;
use std::process::Stdio;

use gmod_types::Response;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::BatchError;
use crate::options::ProcessOptions;

/// Run `tool args`, optionally feeding `stdin`, and capture both streams as lines.
///
/// A trailing empty stdout line (from the final line ending) is dropped. A
/// non-zero exit is an error carrying the captured output.
pub async fn execute(
    tool: &Path,
    args: &[String],
    options: &ProcessOptions,
    stdin: Option<&str>,
) -> Result<Response, BatchError> {
    tracing::debug!(
        tool = %tool.display(),
        cwd = %options.cwd.display(),
        ?args,
        stdin = stdin.is_some(),
        "running batch command"
    );

    let mut cmd = Command::new(tool);
    cmd.args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    options.apply(&mut cmd);

    let mut child = cmd.spawn().map_err(|source| BatchError::Spawn {
        tool: tool.to_path_buf(),
        source,
    })?;

    let input = child.stdin.take();
    let feed = async move {
        if let (Some(mut pipe), Some(text)) = (input, stdin) {
            pipe.write_all(text.as_bytes()).await?;
            pipe.shutdown().await?;
        }
        Ok::<(), io::Error>(())
    };
    let run = async move { tokio::join!(feed, child.wait_with_output()) };

    let (fed, output) = match options.timeout {
        Some(timeout) => tokio::time::timeout(timeout, run).await.map_err(|_| {
            tracing::warn!(tool = %tool.display(), ?args, "batch command timed out");
            BatchError::TimedOut {
                tool: tool.to_path_buf(),
                timeout,
            }
        })?,
        None => run.await,
    };

    // The tool may exit without reading its input.
    if let Err(e) = fed
        && e.kind() != io::ErrorKind::BrokenPipe
    {
        return Err(BatchError::Io {
            tool: tool.to_path_buf(),
            source: e,
        });
    }
    let output = output.map_err(|source| BatchError::Io {
        tool: tool.to_path_buf(),
        source,
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        tracing::warn!(
            tool = %tool.display(),
            status = ?output.status.code(),
            stderr = stderr.trim(),
            "batch command failed"
        );
        return Err(BatchError::Failed {
            tool: tool.to_path_buf(),
            exit_code: output.status.code(),
            stdout,
            stderr,
        });
    }
    if !stderr.trim().is_empty() {
        tracing::warn!(tool = %tool.display(), stderr = stderr.trim(), "batch command wrote to stderr");
    }

    Ok(Response::new(split_output(&stdout), split_output(&stderr)))
}

fn split_output(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect();
    if lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    lines
}
