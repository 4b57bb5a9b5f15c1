//! Sandboxed code execution
//!
//! One short-lived execution per request: the submitted source runs
//! under an interpreter in either a plain subprocess (default) or a
//! one-shot hardened container, with a mandatory wall-clock timeout and
//! per-stream output caps in both backends.

pub mod container;
pub mod exceptions;
pub mod process;

pub use container::{ContainerConfig, ContainerSandbox};
pub use exceptions::{ExecError, ExecResult};
pub use process::ProcessSandbox;

use crate::config::{ExecutorSettings, IsolationMode};

/// Limits shared by both executor backends.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Interpreter binary invoked as `<interpreter> -c <source>`
    pub interpreter: String,
    /// Wall-clock limit per execution
    pub timeout_seconds: u64,
    /// Cap on captured bytes per stream
    pub max_output_bytes: usize,
}

impl From<&ExecutorSettings> for SandboxConfig {
    fn from(settings: &ExecutorSettings) -> Self {
        Self {
            interpreter: settings.interpreter.clone(),
            timeout_seconds: settings.timeout_seconds,
            max_output_bytes: settings.max_output_bytes,
        }
    }
}

/// Result of one code execution.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Standard output, capped
    pub stdout: String,
    /// Standard error, capped
    pub stderr: String,
    /// Process exit code (-1 when killed or unknown)
    pub exit_code: i64,
    /// Whether the wall-clock timeout fired
    pub timed_out: bool,
    /// Whether stdout hit the output cap
    pub stdout_truncated: bool,
    /// Whether stderr hit the output cap
    pub stderr_truncated: bool,
}

/// Either/or classification of a finished execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    /// Clean run: stderr stayed empty, stdout is the result
    Output(String),
    /// Anything on stderr makes the whole run a failure carrying only
    /// the stderr text; stdout is discarded
    Failure(String),
}

impl ExecutionResult {
    /// Clean run: nothing on stderr and no timeout.
    pub fn is_success(&self) -> bool {
        self.stderr.is_empty() && !self.timed_out
    }

    /// Apply the strict stderr-implies-error policy.
    ///
    /// Inherited from the system this service replaces: a run that
    /// writes warnings to stderr next to valid stdout is reported purely
    /// as a failure. Both streams stay on `ExecutionResult` so callers
    /// that want the split can still see it.
    pub fn outcome(&self) -> ExecOutcome {
        if !self.stderr.is_empty() {
            ExecOutcome::Failure(self.stderr.clone())
        } else {
            ExecOutcome::Output(self.stdout.clone())
        }
    }
}

/// Facade over the configured executor backend.
pub enum CodeExecutor {
    Process(ProcessSandbox),
    Container(ContainerSandbox),
}

impl CodeExecutor {
    /// Build the executor the settings ask for.
    ///
    /// A container backend whose Docker daemon is unreachable degrades
    /// to the process backend with a warning, so a host without Docker
    /// still serves requests.
    pub async fn from_settings(settings: &ExecutorSettings) -> Self {
        let config = SandboxConfig::from(settings);

        match settings.isolation {
            IsolationMode::Process => CodeExecutor::Process(ProcessSandbox::new(config)),
            IsolationMode::Container => {
                let container = ContainerConfig {
                    image: settings.container_image.clone(),
                    memory_bytes: settings.container_memory_bytes,
                    network_disabled: settings.network_disabled,
                };

                match ContainerSandbox::new(config.clone(), container).await {
                    Ok(sandbox) => CodeExecutor::Container(sandbox),
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            "Container isolation requested but unavailable, falling back to process backend"
                        );
                        CodeExecutor::Process(ProcessSandbox::new(config))
                    }
                }
            }
        }
    }

    /// Run `source` to completion in the configured backend.
    pub async fn execute(&self, source: &str) -> ExecResult<ExecutionResult> {
        match self {
            CodeExecutor::Process(sandbox) => sandbox.execute(source).await,
            CodeExecutor::Container(sandbox) => sandbox.execute(source).await,
        }
    }

    /// The active isolation mode, for health reporting.
    pub fn isolation(&self) -> IsolationMode {
        match self {
            CodeExecutor::Process(_) => IsolationMode::Process,
            CodeExecutor::Container(_) => IsolationMode::Container,
        }
    }

    /// Human-readable backend description, for readiness reporting.
    pub async fn backend_info(&self) -> String {
        match self {
            CodeExecutor::Process(sandbox) => {
                format!("process ({})", sandbox.config().interpreter)
            }
            CodeExecutor::Container(sandbox) => sandbox
                .version()
                .await
                .unwrap_or_else(|e| format!("container (unavailable: {})", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(stdout: &str, stderr: &str) -> ExecutionResult {
        ExecutionResult {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            exit_code: 0,
            timed_out: false,
            stdout_truncated: false,
            stderr_truncated: false,
        }
    }

    #[test]
    fn clean_run_is_output_outcome() {
        let outcome = result("fib(10) = 55\n", "").outcome();
        assert_eq!(outcome, ExecOutcome::Output("fib(10) = 55\n".to_string()));
    }

    #[test]
    fn any_stderr_discards_stdout() {
        let outcome = result("partial output\n", "DeprecationWarning: old API\n").outcome();
        assert_eq!(
            outcome,
            ExecOutcome::Failure("DeprecationWarning: old API\n".to_string())
        );
    }

    #[test]
    fn timeout_is_not_a_success() {
        let mut timed = result("", "");
        timed.timed_out = true;
        assert!(!timed.is_success());
    }

    #[tokio::test]
    async fn process_mode_builds_process_backend() {
        let settings = ExecutorSettings::default();
        let executor = CodeExecutor::from_settings(&settings).await;
        assert_eq!(executor.isolation(), IsolationMode::Process);
    }
}
