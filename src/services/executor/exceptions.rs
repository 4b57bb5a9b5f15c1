//! Executor error types

use thiserror::Error;

/// Errors that can occur while executing submitted code.
///
/// A process that merely writes to stderr or exits non-zero is NOT an
/// error here: that is a normal [`super::ExecutionResult`]. These are
/// failures of the execution machinery itself.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Source was empty or all whitespace; nothing was spawned
    #[error("No code provided")]
    EmptySource,

    /// The interpreter process could not be started
    #[error("Failed to spawn interpreter: {0}")]
    SpawnFailed(String),

    /// Reading the child's output streams failed
    #[error("Failed to capture process output: {0}")]
    OutputCapture(String),

    /// The sandbox backend (e.g. the Docker daemon) is not reachable
    #[error("Sandbox unavailable: {0}")]
    SandboxUnavailable(String),

    /// Container lifecycle operation failed
    #[error("Container operation failed: {0}")]
    ContainerFailed(String),

    /// Internal executor error
    #[error("Internal executor error: {0}")]
    Internal(String),
}

/// Result type for executor operations
pub type ExecResult<T> = Result<T, ExecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(ExecError::EmptySource.to_string(), "No code provided");

        let err = ExecError::SpawnFailed("No such file or directory".to_string());
        assert!(err.to_string().contains("No such file or directory"));
    }
}
