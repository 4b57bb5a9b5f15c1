//! Code analysis composition
//!
//! Chains the executor and the upstream provider: run the student's
//! code to completion first, then ask the model to explain what
//! happened. The provider call never starts before the process has
//! exited; the explanation must describe the run that actually took
//! place.

use std::sync::Arc;
use thiserror::Error;

use super::executor::{CodeExecutor, ExecError, ExecOutcome};
use super::upstream::{CompletionOptions, UpstreamError, UpstreamService};
use crate::schemas::chat::ChatMessage;

/// Token bound for analysis completions.
const ANALYSIS_MAX_TOKENS: u32 = 1000;

const ANALYSIS_SYSTEM_PROMPT: &str = "\
You are a Python tutor reviewing the result of a student's program run. \
Explain in plain language what the program did and why. If it failed, walk \
through the error message and point at the line that caused it, without \
rewriting the whole program for the student. Keep it under a few short \
paragraphs.";

/// Errors from the analysis pipeline
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Outcome of an execute-then-explain request.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    /// The run's stderr, when the strict policy classified it a failure
    pub runtime_error: Option<String>,
    /// The run's stdout, when the run was clean
    pub output: Option<String>,
    /// The model's explanation of the run
    pub analysis: String,
}

/// Runs code, then asks the provider to explain the result.
pub struct AnalysisService {
    upstream: Arc<UpstreamService>,
    executor: Arc<CodeExecutor>,
}

impl AnalysisService {
    pub fn new(upstream: Arc<UpstreamService>, executor: Arc<CodeExecutor>) -> Self {
        Self { upstream, executor }
    }

    /// Execute `source` to completion, then request the explanation.
    pub async fn analyze(&self, source: &str) -> Result<AnalysisReport, AnalysisError> {
        let result = self.executor.execute(source).await?;

        let (runtime_error, output) = match result.outcome() {
            ExecOutcome::Output(stdout) => (None, Some(stdout)),
            ExecOutcome::Failure(stderr) => (Some(stderr), None),
        };

        let prompt = build_analysis_prompt(source, output.as_deref(), runtime_error.as_deref());

        tracing::debug!(
            failed = runtime_error.is_some(),
            "Execution finished, requesting analysis"
        );

        let analysis = self
            .upstream
            .complete(
                vec![
                    ChatMessage::system(ANALYSIS_SYSTEM_PROMPT),
                    ChatMessage::user(prompt),
                ],
                &CompletionOptions {
                    max_tokens: Some(ANALYSIS_MAX_TOKENS),
                    temperature: Some(0.3),
                    ..Default::default()
                },
            )
            .await?;

        Ok(AnalysisReport {
            runtime_error,
            output,
            analysis,
        })
    }
}

fn build_analysis_prompt(source: &str, output: Option<&str>, error: Option<&str>) -> String {
    let mut prompt = format!("The student ran this Python program:\n\n```python\n{}\n```\n\n", source);

    match (error, output) {
        (Some(stderr), _) => {
            prompt.push_str(&format!("It failed with this error output:\n\n```\n{}\n```\n", stderr));
            prompt.push_str("\nExplain what went wrong and how to read the error.");
        }
        (None, Some(stdout)) if !stdout.is_empty() => {
            prompt.push_str(&format!("It printed:\n\n```\n{}\n```\n", stdout));
            prompt.push_str("\nExplain what the program did to produce this output.");
        }
        _ => {
            prompt.push_str("It exited cleanly without printing anything.\n");
            prompt.push_str("\nExplain what the program did and why nothing was printed.");
        }
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_prompt_carries_the_diagnostic() {
        let prompt = build_analysis_prompt(
            "print(1/0)",
            None,
            Some("ZeroDivisionError: division by zero"),
        );

        assert!(prompt.contains("print(1/0)"));
        assert!(prompt.contains("ZeroDivisionError"));
        assert!(prompt.contains("what went wrong"));
    }

    #[test]
    fn clean_prompt_carries_the_output() {
        let prompt = build_analysis_prompt("print('hi')", Some("hi\n"), None);

        assert!(prompt.contains("It printed"));
        assert!(prompt.contains("hi\n"));
    }

    #[test]
    fn silent_clean_run_gets_its_own_wording() {
        let prompt = build_analysis_prompt("x = 1", Some(""), None);
        assert!(prompt.contains("exited cleanly without printing"));
    }
}
