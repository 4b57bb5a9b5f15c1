//! Application state container
//!
//! Shared state passed to all request handlers via Axum's state
//! extraction. Cheaply cloneable, no mutable state beyond the prompt
//! store's explicit slot.

use crate::config::Settings;
use crate::prompt::PromptStore;
use crate::services::{AnalysisService, CodeExecutor, ErrorExampleService, UpstreamService};
use std::sync::Arc;
use std::time::Instant;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Upstream completion provider client
    pub upstream: Arc<UpstreamService>,

    /// Sandboxed code executor
    pub executor: Arc<CodeExecutor>,

    /// Execute-then-explain composition
    pub analysis: Arc<AnalysisService>,

    /// Practice-example generator
    pub error_examples: Arc<ErrorExampleService>,

    /// Versioned system-prompt store
    pub prompts: Arc<PromptStore>,

    /// Application start time (for uptime calculation)
    pub start_time: Instant,
}

impl AppState {
    /// Create a new application state, initializing all services.
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        let settings = Arc::new(settings);
        let start_time = Instant::now();

        tracing::debug!(
            base_url = %settings.upstream.base_url,
            model = %settings.upstream.model,
            "Initializing upstream client"
        );
        let upstream = Arc::new(UpstreamService::new(&settings.upstream)?);

        tracing::debug!(
            isolation = %settings.executor.isolation,
            interpreter = %settings.executor.interpreter,
            "Initializing code executor"
        );
        let executor = Arc::new(CodeExecutor::from_settings(&settings.executor).await);

        let analysis = Arc::new(AnalysisService::new(upstream.clone(), executor.clone()));
        let error_examples = Arc::new(ErrorExampleService::new(upstream.clone()));

        tracing::debug!("Loading system prompts");
        let prompts = Arc::new(PromptStore::from_settings(&settings.prompts)?);

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            settings,
            upstream,
            executor,
            analysis,
            error_examples,
            prompts,
            start_time,
        })
    }

    /// Get the application uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
