//! Error-example generator
//!
//! Asks the provider for a small buggy Python snippet of a requested
//! severity and category, expecting a strict `{code, tip}` JSON payload.
//! A response that cannot be parsed is recovered locally with a
//! placeholder payload; malformed model output is never the caller's
//! problem.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use super::upstream::{CompletionOptions, UpstreamError, UpstreamService};
use crate::schemas::chat::ChatMessage;
use crate::utils::truncate_with_suffix;

/// Token bound for example generation.
const EXAMPLE_MAX_TOKENS: u32 = 500;

/// Character cap on raw payload embedded in a fallback example.
const FALLBACK_CODE_CHARS: usize = 400;

const GENERATOR_SYSTEM_PROMPT: &str = "\
You generate short buggy Python snippets for practice. Respond with ONLY a \
JSON object of the form {\"code\": \"...\", \"tip\": \"...\"}: `code` is a \
runnable snippet of at most ten lines containing exactly one bug of the \
requested kind, `tip` is a one-sentence hint that points toward the bug \
without naming the fix.";

/// Errors from example generation.
///
/// Parsing problems are absent on purpose: they are recovered into a
/// fallback payload, not surfaced.
#[derive(Debug, Error)]
pub enum ErrorExampleError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// One practice example: a buggy snippet and a hint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorExample {
    pub code: String,
    pub tip: String,
}

/// Generates practice examples via the upstream provider.
pub struct ErrorExampleService {
    upstream: Arc<UpstreamService>,
}

impl ErrorExampleService {
    pub fn new(upstream: Arc<UpstreamService>) -> Self {
        Self { upstream }
    }

    /// Request one example for the given severity level and category.
    pub async fn generate(
        &self,
        level: &str,
        category: &str,
    ) -> Result<ErrorExample, ErrorExampleError> {
        let prompt = format!(
            "Generate one buggy Python example. Difficulty level: {}. Error category: {}.",
            level, category
        );

        let raw = self
            .upstream
            .complete(
                vec![
                    ChatMessage::system(GENERATOR_SYSTEM_PROMPT),
                    ChatMessage::user(prompt),
                ],
                &CompletionOptions {
                    max_tokens: Some(EXAMPLE_MAX_TOKENS),
                    temperature: Some(0.8),
                    ..Default::default()
                },
            )
            .await?;

        Ok(parse_example(&raw, level, category))
    }
}

/// Parse the provider's payload, recovering malformed output locally.
///
/// Models routinely wrap JSON in markdown fences, so those are stripped
/// first. Anything still unparseable becomes a placeholder embedding the
/// truncated raw text and a tip naming what was asked for.
fn parse_example(raw: &str, level: &str, category: &str) -> ErrorExample {
    let stripped = strip_code_fences(raw);

    match serde_json::from_str::<ErrorExample>(stripped) {
        Ok(example) => example,
        Err(e) => {
            tracing::warn!(
                error = %e,
                level = %level,
                category = %category,
                "Example payload failed structured parse, using fallback"
            );

            ErrorExample {
                code: truncate_with_suffix(raw.trim(), FALLBACK_CODE_CHARS, "..."),
                tip: format!(
                    "The model did not return a structured example for level '{}' and category '{}'. The raw response is shown as the snippet; try generating again.",
                    level, category
                ),
            }
        }
    }
}

/// Strip a single markdown code fence, with or without a language tag.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();

    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };

    // Drop a language tag like `json` on the opening fence line.
    match body.split_once('\n') {
        Some((first_line, remainder)) if !first_line.trim().is_empty() => remainder.trim(),
        _ => body.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_payload_parses() {
        let example = parse_example(
            r#"{"code": "print(1/0)", "tip": "What happens when the divisor is zero?"}"#,
            "beginner",
            "runtime",
        );

        assert_eq!(example.code, "print(1/0)");
        assert_eq!(example.tip, "What happens when the divisor is zero?");
    }

    #[test]
    fn fenced_payload_parses() {
        let raw = "```json\n{\"code\": \"x = [1,2][5]\", \"tip\": \"Count the indexes.\"}\n```";
        let example = parse_example(raw, "beginner", "runtime");

        assert_eq!(example.code, "x = [1,2][5]");
        assert_eq!(example.tip, "Count the indexes.");
    }

    #[test]
    fn malformed_payload_falls_back_with_level_and_category() {
        let example = parse_example("Sure! Here's a fun bug for you:", "intermediate", "logic");

        assert!(example.tip.contains("'intermediate'"));
        assert!(example.tip.contains("'logic'"));
        assert!(example.code.contains("Here's a fun bug"));
    }

    #[test]
    fn fallback_truncates_long_raw_payloads() {
        let raw = "x".repeat(2000);
        let example = parse_example(&raw, "advanced", "syntax");

        assert!(example.code.chars().count() <= FALLBACK_CODE_CHARS + 3);
        assert!(example.code.ends_with("..."));
    }

    #[test]
    fn wrong_shape_json_falls_back() {
        let example = parse_example(r#"{"snippet": "print(1)"}"#, "beginner", "syntax");
        assert!(example.tip.contains("'beginner'"));
        assert!(example.tip.contains("'syntax'"));
    }

    #[test]
    fn fence_stripping_handles_untagged_fences() {
        assert_eq!(
            strip_code_fences("```\n{\"a\": 1}\n```"),
            "{\"a\": 1}"
        );
        assert_eq!(strip_code_fences("plain text"), "plain text");
    }
}
