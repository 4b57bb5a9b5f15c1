//! Subprocess executor backend
//!
//! Runs submitted source in a short-lived interpreter process, one per
//! call: `<interpreter> -c <source>`. The source travels as an argument,
//! never through a file. Both output pipes are drained concurrently with
//! the running child so a full pipe buffer can never wedge it, and the
//! whole execution is bounded by a wall-clock timeout.

use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use super::exceptions::{ExecError, ExecResult};
use super::{ExecutionResult, SandboxConfig};
use crate::utils::{with_timeout, TimeoutError};

/// Executes code in a plain subprocess with timeout and output caps.
#[derive(Debug, Clone)]
pub struct ProcessSandbox {
    config: SandboxConfig,
}

impl ProcessSandbox {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Run `source` to completion and collect both output streams.
    pub async fn execute(&self, source: &str) -> ExecResult<ExecutionResult> {
        if source.trim().is_empty() {
            return Err(ExecError::EmptySource);
        }

        let mut child = Command::new(&self.config.interpreter)
            .arg("-c")
            .arg(source)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecError::SpawnFailed(e.to_string()))?;

        let stdout_pipe = child
            .stdout
            .take()
            .ok_or_else(|| ExecError::Internal("child stdout was not piped".to_string()))?;
        let stderr_pipe = child
            .stderr
            .take()
            .ok_or_else(|| ExecError::Internal("child stderr was not piped".to_string()))?;

        // Drain both pipes while the child runs; waiting first would
        // deadlock once either pipe buffer fills.
        let cap = self.config.max_output_bytes;
        let stdout_task = tokio::spawn(drain_capped(stdout_pipe, cap));
        let stderr_task = tokio::spawn(drain_capped(stderr_pipe, cap));

        let timeout = Duration::from_secs(self.config.timeout_seconds);
        let wait_result = with_timeout(timeout, child.wait()).await;

        let (status, timed_out) = match wait_result {
            Ok(status) => (Some(status), false),
            Err(TimeoutError::Inner(e)) => {
                return Err(ExecError::Internal(e.to_string()));
            }
            Err(TimeoutError::Timeout(_)) => {
                tracing::warn!(
                    timeout_seconds = self.config.timeout_seconds,
                    "Execution hit wall-clock timeout, killing interpreter"
                );
                child.start_kill().ok();
                // Reap so the drain tasks see EOF and finish.
                let _ = child.wait().await;
                (None, true)
            }
        };

        let (stdout, stdout_truncated) = stdout_task
            .await
            .map_err(|e| ExecError::Internal(e.to_string()))?
            .map_err(|e| ExecError::OutputCapture(e.to_string()))?;
        let (mut stderr, stderr_truncated) = stderr_task
            .await
            .map_err(|e| ExecError::Internal(e.to_string()))?
            .map_err(|e| ExecError::OutputCapture(e.to_string()))?;

        let exit_code = match &status {
            Some(status) => status.code().map(i64::from).unwrap_or(-1),
            None => -1,
        };

        if timed_out {
            if !stderr.is_empty() && !stderr.ends_with('\n') {
                stderr.push('\n');
            }
            stderr.push_str(&format!(
                "execution timed out after {} seconds",
                self.config.timeout_seconds
            ));
        }

        Ok(ExecutionResult {
            stdout,
            stderr,
            exit_code,
            timed_out,
            stdout_truncated,
            stderr_truncated,
        })
    }
}

/// Read a pipe to EOF, keeping at most `cap` bytes.
///
/// Bytes past the cap are still consumed (the pipe must drain) but
/// discarded; the second element reports whether anything was dropped.
async fn drain_capped(
    mut pipe: impl AsyncReadExt + Unpin,
    cap: usize,
) -> std::io::Result<(String, bool)> {
    let mut collected: Vec<u8> = Vec::new();
    let mut truncated = false;
    let mut buf = [0u8; 8192];

    loop {
        let n = pipe.read(&mut buf).await?;
        if n == 0 {
            break;
        }

        if collected.len() < cap {
            let keep = (cap - collected.len()).min(n);
            collected.extend_from_slice(&buf[..keep]);
            if keep < n {
                truncated = true;
            }
        } else {
            truncated = true;
        }
    }

    Ok((String::from_utf8_lossy(&collected).into_owned(), truncated))
}

#[cfg(test)]
mod tests {
    use super::*;

    // The interpreter contract is just `<binary> -c <source>`, which sh
    // also satisfies; using it keeps these tests hermetic on hosts
    // without python3.
    fn sh_sandbox() -> ProcessSandbox {
        ProcessSandbox::new(SandboxConfig {
            interpreter: "sh".to_string(),
            timeout_seconds: 5,
            max_output_bytes: 1024 * 1024,
        })
    }

    #[tokio::test]
    async fn clean_run_captures_stdout() {
        let result = sh_sandbox().execute("echo 'fib(10) = 55'").await.unwrap();

        assert_eq!(result.stdout, "fib(10) = 55\n");
        assert_eq!(result.stderr, "");
        assert_eq!(result.exit_code, 0);
        assert!(!result.timed_out);
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn stderr_is_captured_separately() {
        let result = sh_sandbox()
            .execute("echo partial; echo 'NameError: boom' >&2")
            .await
            .unwrap();

        assert_eq!(result.stdout, "partial\n");
        assert!(result.stderr.contains("NameError: boom"));
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn nonzero_exit_code_is_reported() {
        let result = sh_sandbox().execute("exit 3").await.unwrap();
        assert_eq!(result.exit_code, 3);
    }

    #[tokio::test]
    async fn empty_source_fails_before_spawn() {
        let err = sh_sandbox().execute("").await.unwrap_err();
        assert!(matches!(err, ExecError::EmptySource));

        let err = sh_sandbox().execute("   \n\t").await.unwrap_err();
        assert!(matches!(err, ExecError::EmptySource));
    }

    #[tokio::test]
    async fn unknown_interpreter_is_spawn_failure() {
        let sandbox = ProcessSandbox::new(SandboxConfig {
            interpreter: "definitely-not-an-interpreter".to_string(),
            timeout_seconds: 5,
            max_output_bytes: 1024,
        });

        let err = sandbox.execute("print('hi')").await.unwrap_err();
        assert!(matches!(err, ExecError::SpawnFailed(_)));
    }

    #[tokio::test]
    async fn runaway_process_is_killed_at_timeout() {
        let sandbox = ProcessSandbox::new(SandboxConfig {
            interpreter: "sh".to_string(),
            timeout_seconds: 1,
            max_output_bytes: 1024,
        });

        let start = std::time::Instant::now();
        let result = sandbox.execute("sleep 30").await.unwrap();

        assert!(result.timed_out);
        assert!(result.stderr.contains("timed out after 1 seconds"));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn output_past_cap_is_dropped_and_flagged() {
        let sandbox = ProcessSandbox::new(SandboxConfig {
            interpreter: "sh".to_string(),
            timeout_seconds: 5,
            max_output_bytes: 64,
        });

        let result = sandbox
            .execute("i=0; while [ $i -lt 100 ]; do echo 'a long line of output'; i=$((i+1)); done")
            .await
            .unwrap();

        assert!(result.stdout.len() <= 64);
        assert!(result.stdout_truncated);
        assert!(!result.timed_out);
    }

    #[tokio::test]
    async fn output_before_failure_is_retained_in_result() {
        let result = sh_sandbox()
            .execute("echo 'got here'; nonexistent-command-xyz")
            .await
            .unwrap();

        assert_eq!(result.stdout, "got here\n");
        assert!(!result.stderr.is_empty());
        assert_ne!(result.exit_code, 0);
    }
}
