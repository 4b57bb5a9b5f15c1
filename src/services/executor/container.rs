//! Container executor backend
//!
//! The hardened isolation option: every execution gets a fresh one-shot
//! Docker container with no network, a memory cap, all capabilities
//! dropped, and no privilege escalation. The source still travels as a
//! direct code argument, as the container command.

use bollard::container::{
    Config, CreateContainerOptions, LogOutput, LogsOptions, RemoveContainerOptions,
    StartContainerOptions, StopContainerOptions, WaitContainerOptions,
};
use bollard::Docker;
use futures::StreamExt;
use std::time::Duration;

use super::exceptions::{ExecError, ExecResult};
use super::{ExecutionResult, SandboxConfig};

/// Hardening knobs for the container backend.
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    /// Docker image to run
    pub image: String,
    /// Memory limit in bytes
    pub memory_bytes: i64,
    /// Whether the container gets no network at all
    pub network_disabled: bool,
}

/// Executes code in a one-shot Docker container per call.
pub struct ContainerSandbox {
    docker: Docker,
    config: SandboxConfig,
    container: ContainerConfig,
}

impl ContainerSandbox {
    /// Connect to the local Docker daemon and verify it responds.
    pub async fn new(config: SandboxConfig, container: ContainerConfig) -> ExecResult<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| ExecError::SandboxUnavailable(e.to_string()))?;

        docker
            .ping()
            .await
            .map_err(|e| ExecError::SandboxUnavailable(format!("Failed to ping Docker: {}", e)))?;

        Ok(Self {
            docker,
            config,
            container,
        })
    }

    /// Docker daemon version string, for readiness reporting.
    pub async fn version(&self) -> ExecResult<String> {
        let version = self
            .docker
            .version()
            .await
            .map_err(|e| ExecError::SandboxUnavailable(e.to_string()))?;

        Ok(format!(
            "Docker {} (API {})",
            version.version.unwrap_or_default(),
            version.api_version.unwrap_or_default()
        ))
    }

    /// Run `source` in a fresh container and collect both output streams.
    pub async fn execute(&self, source: &str) -> ExecResult<ExecutionResult> {
        if source.trim().is_empty() {
            return Err(ExecError::EmptySource);
        }

        let name = format!("pytutor_run_{}", uuid::Uuid::new_v4());

        let host_config = bollard::service::HostConfig {
            memory: Some(self.container.memory_bytes),
            network_mode: if self.container.network_disabled {
                Some("none".to_string())
            } else {
                None
            },
            security_opt: Some(vec!["no-new-privileges".to_string()]),
            cap_drop: Some(vec!["ALL".to_string()]),
            ..Default::default()
        };

        let config = Config {
            image: Some(self.container.image.clone()),
            cmd: Some(vec![
                self.config.interpreter.clone(),
                "-c".to_string(),
                source.to_string(),
            ]),
            network_disabled: Some(self.container.network_disabled),
            host_config: Some(host_config),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: name.as_str(),
            platform: None,
        };

        let id = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(|e| ExecError::ContainerFailed(format!("create failed: {}", e)))?
            .id;

        if let Err(e) = self
            .docker
            .start_container(&id, None::<StartContainerOptions<String>>)
            .await
        {
            self.remove(&id).await;
            return Err(ExecError::ContainerFailed(format!("start failed: {}", e)));
        }

        let timeout = Duration::from_secs(self.config.timeout_seconds);
        let (exit_code, timed_out) = match tokio::time::timeout(timeout, self.wait_exit(&id)).await
        {
            Ok(Ok(code)) => (code, false),
            Ok(Err(e)) => {
                self.remove(&id).await;
                return Err(e);
            }
            Err(_) => {
                tracing::warn!(
                    container = %name,
                    timeout_seconds = self.config.timeout_seconds,
                    "Execution hit wall-clock timeout, stopping container"
                );
                let _ = self
                    .docker
                    .stop_container(&id, Some(StopContainerOptions { t: 0 }))
                    .await;
                (-1, true)
            }
        };

        let (stdout, mut stderr, stdout_truncated, stderr_truncated) = self.collect_logs(&id).await;
        self.remove(&id).await;

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

    /// Wait for the container to exit, returning its exit code.
    async fn wait_exit(&self, id: &str) -> ExecResult<i64> {
        let mut wait = self
            .docker
            .wait_container(id, None::<WaitContainerOptions<String>>);

        match wait.next().await {
            Some(Ok(response)) => Ok(response.status_code),
            // bollard reports a non-zero exit as this error variant
            Some(Err(bollard::errors::Error::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(e)) => Err(ExecError::ContainerFailed(format!("wait failed: {}", e))),
            None => Err(ExecError::ContainerFailed(
                "wait stream ended without a status".to_string(),
            )),
        }
    }

    /// Demux container logs into capped stdout/stderr accumulators.
    async fn collect_logs(&self, id: &str) -> (String, String, bool, bool) {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            tail: "all".to_string(),
            ..Default::default()
        };

        let cap = self.config.max_output_bytes;
        let mut stdout: Vec<u8> = Vec::new();
        let mut stderr: Vec<u8> = Vec::new();
        let mut stdout_truncated = false;
        let mut stderr_truncated = false;

        let mut stream = self.docker.logs(id, Some(options));

        while let Some(entry) = stream.next().await {
            match entry {
                Ok(LogOutput::StdOut { message }) => {
                    append_capped(&mut stdout, &message, cap, &mut stdout_truncated);
                }
                Ok(LogOutput::StdErr { message }) => {
                    append_capped(&mut stderr, &message, cap, &mut stderr_truncated);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Error reading container logs");
                }
            }
        }

        (
            String::from_utf8_lossy(&stdout).into_owned(),
            String::from_utf8_lossy(&stderr).into_owned(),
            stdout_truncated,
            stderr_truncated,
        )
    }

    async fn remove(&self, id: &str) {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };

        if let Err(e) = self.docker.remove_container(id, Some(options)).await {
            tracing::warn!(error = %e, container = %id, "Failed to remove container");
        }
    }
}

fn append_capped(sink: &mut Vec<u8>, bytes: &[u8], cap: usize, truncated: &mut bool) {
    if sink.len() >= cap {
        *truncated = true;
        return;
    }
    let keep = (cap - sink.len()).min(bytes.len());
    sink.extend_from_slice(&bytes[..keep]);
    if keep < bytes.len() {
        *truncated = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_capped_respects_cap() {
        let mut sink = Vec::new();
        let mut truncated = false;

        append_capped(&mut sink, b"hello ", 8, &mut truncated);
        assert!(!truncated);

        append_capped(&mut sink, b"world", 8, &mut truncated);
        assert_eq!(sink, b"hello wo");
        assert!(truncated);

        // Further appends are no-ops once the cap is hit.
        append_capped(&mut sink, b"more", 8, &mut truncated);
        assert_eq!(sink.len(), 8);
    }

    #[test]
    fn container_config_carries_hardening_flags() {
        let config = ContainerConfig {
            image: "python:3.11-slim".to_string(),
            memory_bytes: 256 * 1024 * 1024,
            network_disabled: true,
        };

        assert!(config.network_disabled);
        assert_eq!(config.memory_bytes, 256 * 1024 * 1024);
    }
}
