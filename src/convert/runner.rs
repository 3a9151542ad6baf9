//! External command execution with a hard deadline.
//!
//! The child is placed in its own process group at spawn so a timeout can
//! terminate the whole group, including anything the converter itself
//! spawned. Stdout and stderr are drained by independent tasks so a chatty
//! child can never deadlock a pipe.

use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("start {program} failure: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("execute timeout after {0:?}")]
    Timeout(Duration),

    /// Process exited with a failure status; the message is the captured
    /// stderr text.
    #[error("{0}")]
    Failed(String),
}

/// Run `program` with `args`, capturing stdout as the result.
///
/// Fails with a distinct variant for spawn failure, timeout (after killing
/// the whole process group), and non-zero exit (carrying stderr).
pub async fn run(
    timeout: Duration,
    program: &str,
    args: &[String],
) -> Result<Vec<u8>, RunError> {
    let spawn_err = |source: std::io::Error| RunError::Spawn {
        program: program.to_string(),
        source,
    };

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    #[cfg(unix)]
    command.process_group(0);

    let mut child = command.spawn().map_err(spawn_err)?;
    let pid = child.id();

    debug!(program, ?pid, "Spawned converter process");

    let mut stdout = child.stdout.take().expect("stdout piped");
    let mut stderr = child.stderr.take().expect("stderr piped");

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = stdout.read_to_end(&mut buf).await;
        buf
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = stderr.read_to_end(&mut buf).await;
        buf
    });

    // Race process completion against the deadline
    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => {
            let stdout_buf = stdout_task.await.unwrap_or_default();

            if status.success() {
                // stderr content is ignored on success
                stderr_task.abort();
                return Ok(stdout_buf);
            }

            let stderr_buf = stderr_task.await.unwrap_or_default();
            let text = String::from_utf8_lossy(&stderr_buf).trim().to_string();

            if text.is_empty() {
                Err(RunError::Failed(format!("process exited with {status}")))
            } else {
                Err(RunError::Failed(text))
            }
        }
        Ok(Err(source)) => {
            stdout_task.abort();
            stderr_task.abort();
            Err(spawn_err(source))
        }
        Err(_elapsed) => {
            warn!(program, ?pid, ?timeout, "Converter timed out, killing process group");

            #[cfg(unix)]
            if let Some(pid) = pid {
                kill_process_group(pid);
            }
            #[cfg(not(unix))]
            let _ = child.start_kill();

            // Reap the killed child so it does not linger as a zombie; the
            // drain tasks finish once the pipes close.
            let _ = child.wait().await;
            stdout_task.abort();
            stderr_task.abort();

            Err(RunError::Timeout(timeout))
        }
    }
}

/// One SIGKILL for the whole group, descendants included.
#[cfg(unix)]
fn kill_process_group(pid: u32) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    if let Err(err) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        warn!(pid, %err, "Failed to kill process group");
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn test_run_captures_stdout() {
        let out = run(Duration::from_secs(5), "/bin/sh", &sh("printf hello"))
            .await
            .unwrap();

        assert_eq!(out, b"hello");
    }

    #[tokio::test]
    async fn test_failed_exit_carries_stderr() {
        let err = run(
            Duration::from_secs(5),
            "/bin/sh",
            &sh("echo boom 1>&2; exit 3"),
        )
        .await
        .unwrap_err();

        match err {
            RunError::Failed(message) => assert!(message.contains("boom")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_spawn_failure_is_distinct() {
        let err = run(
            Duration::from_secs(5),
            "/no/such/binary",
            &["--version".to_string()],
        )
        .await
        .unwrap_err();

        assert!(matches!(err, RunError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let temp = tempfile::TempDir::new().unwrap();
        let marker = temp.path().join("marker");
        let script = format!("sleep 1; touch {}", marker.display());

        let started = Instant::now();
        let err = run(Duration::from_millis(100), "/bin/sh", &sh(&script))
            .await
            .unwrap_err();

        assert!(matches!(err, RunError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(1));

        // Had the process survived the kill, the marker would appear
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_timeout_kills_whole_process_group() {
        let temp = tempfile::TempDir::new().unwrap();
        let marker = temp.path().join("marker");
        // The backgrounded subshell is a child of the converter process;
        // the group kill must take it down too.
        let script = format!("(sleep 1; touch {}) & sleep 5", marker.display());

        let err = run(Duration::from_millis(100), "/bin/sh", &sh(&script))
            .await
            .unwrap_err();

        assert!(matches!(err, RunError::Timeout(_)));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists());
    }
}
