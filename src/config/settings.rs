//! Application settings and configuration
//!
//! Loads settings from environment variables with sensible defaults.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;

/// Application environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[value(alias = "dev")]
    Development,
    #[value(alias = "stage")]
    Staging,
    #[value(alias = "prod")]
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Development
    }
}

impl std::str::FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" | "stage" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            _ => anyhow::bail!(
                "Invalid environment: {}. Expected: development, staging, or production",
                s
            ),
        }
    }
}

/// Upstream completion provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamSettings {
    /// API key for the provider; requests fail with 502 when absent
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible chat-completions API
    pub base_url: String,

    /// Default model identifier
    pub model: String,

    /// Whole-request timeout for non-streaming calls
    pub timeout_seconds: u64,

    /// TCP connect timeout
    pub connect_timeout_seconds: u64,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_seconds: 120,
            connect_timeout_seconds: 10,
        }
    }
}

/// Executor isolation backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IsolationMode {
    /// Plain subprocess with timeout and output caps
    Process,
    /// One-shot Docker container per execution
    Container,
}

impl fmt::Display for IsolationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IsolationMode::Process => write!(f, "process"),
            IsolationMode::Container => write!(f, "container"),
        }
    }
}

impl std::str::FromStr for IsolationMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "process" => Ok(IsolationMode::Process),
            "container" | "docker" => Ok(IsolationMode::Container),
            _ => anyhow::bail!("Invalid isolation mode: {}. Expected: process or container", s),
        }
    }
}

/// Code executor configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutorSettings {
    /// Interpreter binary invoked as `<interpreter> -c <source>`
    pub interpreter: String,

    /// Wall-clock limit per execution; the child is killed on expiry
    pub timeout_seconds: u64,

    /// Cap on captured bytes per stream; excess is drained and discarded
    pub max_output_bytes: usize,

    /// Isolation backend
    pub isolation: IsolationMode,

    /// Docker image for the container backend
    pub container_image: String,

    /// Container memory limit in bytes
    pub container_memory_bytes: i64,

    /// Whether the container runs without network access
    pub network_disabled: bool,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            timeout_seconds: 30,
            max_output_bytes: 1024 * 1024,
            isolation: IsolationMode::Process,
            container_image: "python:3.11-slim".to_string(),
            container_memory_bytes: 256 * 1024 * 1024,
            network_disabled: true,
        }
    }
}

/// System-prompt store configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PromptSettings {
    /// Directory of versioned prompt files (*.md / *.txt); builtin prompt when unset
    pub dir: Option<PathBuf>,

    /// Pin a specific version as active instead of the latest
    pub active_version: Option<String>,
}

/// Main application settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    // App settings
    pub app_name: String,
    pub app_version: String,
    pub environment: Environment,
    pub log_level: String,

    // Server settings
    pub host: String,
    pub port: u16,

    // Subsystems
    pub upstream: UpstreamSettings,
    pub executor: ExecutorSettings,
    pub prompts: PromptSettings,
}

impl Settings {
    /// Load settings from environment variables with defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let settings = Self {
            app_name: env_or_default("APP_NAME", "pytutor-server"),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: env_or_default("ENVIRONMENT", "development")
                .parse()
                .unwrap_or_default(),
            log_level: env_or_default("LOG_LEVEL", "info"),

            host: env_or_default("HOST", "0.0.0.0"),
            port: env_or_default("PORT", "8000")
                .parse()
                .context("Invalid PORT value")?,

            upstream: UpstreamSettings {
                api_key: env::var("UPSTREAM_API_KEY").ok(),
                base_url: env_or_default("UPSTREAM_BASE_URL", "https://api.openai.com/v1"),
                model: env_or_default("UPSTREAM_MODEL", "gpt-4o-mini"),
                timeout_seconds: env_or_default("UPSTREAM_TIMEOUT_SECONDS", "120")
                    .parse()
                    .unwrap_or(120),
                connect_timeout_seconds: env_or_default("UPSTREAM_CONNECT_TIMEOUT_SECONDS", "10")
                    .parse()
                    .unwrap_or(10),
            },

            executor: ExecutorSettings {
                interpreter: env_or_default("EXECUTOR_INTERPRETER", "python3"),
                timeout_seconds: env_or_default("EXECUTOR_TIMEOUT_SECONDS", "30")
                    .parse()
                    .unwrap_or(30),
                max_output_bytes: env_or_default("EXECUTOR_MAX_OUTPUT_BYTES", "1048576")
                    .parse()
                    .unwrap_or(1024 * 1024),
                isolation: env_or_default("EXECUTOR_ISOLATION", "process")
                    .parse()
                    .unwrap_or(IsolationMode::Process),
                container_image: env_or_default("EXECUTOR_CONTAINER_IMAGE", "python:3.11-slim"),
                container_memory_bytes: env_or_default(
                    "EXECUTOR_MEMORY_LIMIT_BYTES",
                    "268435456",
                )
                .parse()
                .unwrap_or(256 * 1024 * 1024),
                network_disabled: env_or_default("EXECUTOR_NETWORK_DISABLED", "true")
                    .parse()
                    .unwrap_or(true),
            },

            prompts: PromptSettings {
                dir: env::var("PROMPT_DIR").ok().map(PathBuf::from),
                active_version: env::var("PROMPT_ACTIVE_VERSION").ok(),
            },
        };

        settings.validate()?;

        Ok(settings)
    }

    /// Validate settings
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("Port cannot be 0");
        }

        if self.executor.timeout_seconds == 0 {
            anyhow::bail!("Executor timeout_seconds must be > 0");
        }
        if self.executor.max_output_bytes == 0 {
            anyhow::bail!("Executor max_output_bytes must be > 0");
        }
        if self.executor.interpreter.trim().is_empty() {
            anyhow::bail!("Executor interpreter cannot be empty");
        }

        if self.upstream.timeout_seconds == 0 {
            anyhow::bail!("Upstream timeout_seconds must be > 0");
        }

        if self.upstream.api_key.is_none() {
            tracing::warn!(
                "UPSTREAM_API_KEY is not set; chat, analysis, and error-example requests will fail"
            );
        }

        Ok(())
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    /// Check if running in production mode
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Get the server address string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "pytutor-server".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: Environment::Development,
            log_level: "info".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            upstream: UpstreamSettings::default(),
            executor: ExecutorSettings::default(),
            prompts: PromptSettings::default(),
        }
    }
}

/// Helper function to get environment variable with default
fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.app_name, "pytutor-server");
        assert_eq!(settings.port, 8000);
        assert_eq!(settings.executor.interpreter, "python3");
        assert_eq!(settings.executor.isolation, IsolationMode::Process);
    }

    #[test]
    fn environment_parsing() {
        assert_eq!("development".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!("production".parse::<Environment>().unwrap(), Environment::Production);
        assert!("nope".parse::<Environment>().is_err());
    }

    #[test]
    fn isolation_mode_parsing() {
        assert_eq!("process".parse::<IsolationMode>().unwrap(), IsolationMode::Process);
        assert_eq!("container".parse::<IsolationMode>().unwrap(), IsolationMode::Container);
        assert_eq!("docker".parse::<IsolationMode>().unwrap(), IsolationMode::Container);
        assert!("chroot".parse::<IsolationMode>().is_err());
    }

    #[test]
    fn validation_rejects_zero_timeout() {
        let mut settings = Settings::default();
        settings.executor.timeout_seconds = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validation_rejects_zero_output_cap() {
        let mut settings = Settings::default();
        settings.executor.max_output_bytes = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn server_addr() {
        let settings = Settings::default();
        assert_eq!(settings.server_addr(), "0.0.0.0:8000");
    }

    #[test]
    fn api_key_never_serialized() {
        let mut settings = Settings::default();
        settings.upstream.api_key = Some("sk-secret".to_string());
        let json = serde_json::to_string(&settings).unwrap();
        assert!(!json.contains("sk-secret"));
    }
}
