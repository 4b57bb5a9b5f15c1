//! Services module
//!
//! Contains business logic and external service integrations.

pub mod analysis;
pub mod error_examples;
pub mod executor;
pub mod upstream;

pub use analysis::{AnalysisError, AnalysisReport, AnalysisService};
pub use error_examples::{ErrorExample, ErrorExampleError, ErrorExampleService};
pub use executor::{
    CodeExecutor, ContainerSandbox, ExecError, ExecOutcome, ExecResult, ExecutionResult,
    ProcessSandbox, SandboxConfig,
};
pub use upstream::{
    CompletionOptions, CompletionStream, SseBuffer, StreamEvent, UpstreamError, UpstreamService,
};
