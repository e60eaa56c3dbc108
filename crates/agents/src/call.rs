use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tracing::{debug, info, warn};

use extract::{CandidateSource, ExpectedShape, ParseStrategy, Parser, RawResponse, RecoveryError};

use crate::llm::{GenerateOptions, Generator};
use crate::metrics::TimedOperation;

/// What the caller expects the generator to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Json(ExpectedShape),
    /// Free text such as source code, returned as a JSON string.
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Upstream,
    EmptyResponse,
    Parse,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallMetadata {
    pub agent: String,
    pub duration_ms: u64,
    pub duration_us: u64,
    pub response_chars: usize,
    pub received_at: Option<DateTime<Utc>>,
    pub candidate: Option<CandidateSource>,
    pub strategy: Option<ParseStrategy>,
    pub failure: Option<FailureKind>,
}

/// Result of one agent call. Failures are data, never an `Err`.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    pub success: bool,
    pub response: Option<Value>,
    pub raw_text: Option<String>,
    pub error: Option<String>,
    pub raw_preview: Option<String>,
    pub metadata: CallMetadata,
}

impl AgentResponse {
    fn failure(
        metadata: CallMetadata,
        kind: FailureKind,
        error: String,
        raw_text: Option<String>,
        raw_preview: Option<String>,
    ) -> Self {
        Self {
            success: false,
            response: None,
            raw_text,
            error: Some(error),
            raw_preview,
            metadata: CallMetadata {
                failure: Some(kind),
                ..metadata
            },
        }
    }

    pub fn into_result(self) -> Result<Value, RecoveryError> {
        match (self.response, self.metadata.failure) {
            (Some(value), None) => Ok(value),
            (_, Some(FailureKind::EmptyResponse)) => Err(RecoveryError::EmptyResponse),
            (_, Some(FailureKind::Upstream)) => {
                Err(RecoveryError::Upstream(self.error.unwrap_or_default()))
            }
            _ => Err(RecoveryError::Parse(self.error.unwrap_or_default())),
        }
    }

    /// The response as text, for `ResponseFormat::Text` calls.
    pub fn text(&self) -> Option<&str> {
        self.response.as_ref().and_then(Value::as_str)
    }
}

impl fmt::Display for AgentResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            Some(error) => write!(f, "{} failed: {}", self.metadata.agent, error),
            None => write!(
                f,
                "{} succeeded in {} ms",
                self.metadata.agent, self.metadata.duration_ms
            ),
        }
    }
}

/// One generator call, timed and parsed.
///
/// The generator is invoked exactly once; retrying is up to the caller.
#[derive(Debug, Clone)]
pub struct AgentCall {
    options: GenerateOptions,
}

impl AgentCall {
    pub fn new(options: GenerateOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    pub async fn call<G: Generator>(
        &self,
        agent: &str,
        prompt: &str,
        format: ResponseFormat,
        generator: &G,
    ) -> AgentResponse {
        let options = GenerateOptions {
            json_mode: matches!(format, ResponseFormat::Json(_)),
            ..self.options.clone()
        };

        debug!(agent, prompt_chars = prompt.len(), "Calling generator");
        let timer = TimedOperation::start();
        let outcome = generator.generate(prompt, &options).await;

        let elapsed = timer.elapsed();
        let mut metadata = CallMetadata {
            agent: agent.to_string(),
            duration_ms: elapsed.as_millis() as u64,
            duration_us: elapsed.as_micros() as u64,
            response_chars: 0,
            received_at: None,
            candidate: None,
            strategy: None,
            failure: None,
        };

        let raw = match outcome {
            Ok(text) => RawResponse::new(text),
            Err(e) => {
                warn!(
                    agent,
                    duration_ms = metadata.duration_ms,
                    error = %e,
                    "Generator call failed"
                );
                let error = format!("{:#}", e);
                return AgentResponse::failure(metadata, FailureKind::Upstream, error, None, None);
            }
        };
        metadata.response_chars = raw.text.chars().count();
        metadata.received_at = Some(raw.received_at);

        if raw.text.trim().is_empty() {
            warn!(
                agent,
                duration_ms = metadata.duration_ms,
                "Generator returned an empty response"
            );
            let error = RecoveryError::EmptyResponse.to_string();
            return AgentResponse::failure(metadata, FailureKind::EmptyResponse, error, None, None);
        }

        match format {
            ResponseFormat::Text => {
                let text = code_text(&raw.text);
                info!(
                    agent,
                    duration_ms = metadata.duration_ms,
                    chars = metadata.response_chars,
                    "Agent call succeeded"
                );
                AgentResponse {
                    success: true,
                    response: Some(Value::String(text)),
                    raw_text: Some(raw.text),
                    error: None,
                    raw_preview: None,
                    metadata,
                }
            }
            ResponseFormat::Json(shape) => {
                let parsed = Parser::with_shape(shape).parse(&raw);
                metadata.candidate = parsed.candidate;
                metadata.strategy = parsed.strategy_used;

                if parsed.success() {
                    info!(
                        agent,
                        duration_ms = metadata.duration_ms,
                        strategy = parsed
                            .strategy_used
                            .map(|s| s.as_str())
                            .unwrap_or("passthrough"),
                        "Agent call succeeded"
                    );
                    AgentResponse {
                        success: true,
                        response: parsed.data().cloned(),
                        raw_text: Some(raw.text),
                        error: None,
                        raw_preview: None,
                        metadata,
                    }
                } else {
                    let error = parsed.error().unwrap_or("unknown parse failure").to_string();
                    warn!(
                        agent,
                        duration_ms = metadata.duration_ms,
                        error = %error,
                        "Could not parse agent response"
                    );
                    let preview = parsed.raw_preview.clone();
                    let raw_text = Some(raw.text);
                    AgentResponse::failure(metadata, FailureKind::Parse, error, raw_text, preview)
                }
            }
        }
    }
}

/// Strip surrounding fences; if prose still wraps a fenced block, keep only its body.
fn code_text(raw: &str) -> String {
    let normalized = extract::normalize(raw);
    match extract::fenced_body(&normalized) {
        Some(body) => body.to_string(),
        None => normalized,
    }
}
