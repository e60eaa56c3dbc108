use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RecoveryError;

/// Unstructured text as it came back from the generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawResponse {
    pub text: String,
    pub received_at: DateTime<Utc>,
}

impl RawResponse {
    pub fn new(text: String) -> Self {
        Self {
            text,
            received_at: Utc::now(),
        }
    }
}

/// Input accepted by the parser: either text or something already structured.
#[derive(Debug, Clone, PartialEq)]
pub enum RawInput {
    Text(String),
    Structured(Value),
}

impl From<&str> for RawInput {
    fn from(text: &str) -> Self {
        RawInput::Text(text.to_string())
    }
}

impl From<String> for RawInput {
    fn from(text: String) -> Self {
        RawInput::Text(text)
    }
}

impl From<Value> for RawInput {
    fn from(value: Value) -> Self {
        RawInput::Structured(value)
    }
}

impl From<&RawResponse> for RawInput {
    fn from(raw: &RawResponse) -> Self {
        RawInput::Text(raw.text.clone())
    }
}

/// Where a candidate span came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    BraceBalance,
    FencedBlock,
    PrefixPattern,
    GreedyObject,
    GreedyArray,
    WholeText,
}

/// A substring of the response believed to hold a JSON value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionCandidate {
    /// Byte range `[start, end)` within the text it was extracted from.
    pub span: (usize, usize),
    pub text: String,
    pub source: CandidateSource,
}

impl ExtractionCandidate {
    /// Returns `None` for empty text; a candidate always carries content.
    pub fn new(span: (usize, usize), text: &str, source: CandidateSource) -> Option<Self> {
        if text.is_empty() {
            return None;
        }
        Some(Self {
            span,
            text: text.to_string(),
            source,
        })
    }
}

/// Which parse attempt produced the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStrategy {
    StrictJson,
    RepairedJson,
    LenientLiteral,
}

impl ParseStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseStrategy::StrictJson => "strict_json",
            ParseStrategy::RepairedJson => "repaired_json",
            ParseStrategy::LenientLiteral => "lenient_literal",
        }
    }
}

/// Outcome of a parse. `data` is set exactly when `error` is not.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    data: Option<Value>,
    error: Option<String>,
    /// `None` on pass-through of structured input and on failure.
    pub strategy_used: Option<ParseStrategy>,
    pub candidate: Option<CandidateSource>,
    /// Leading slice of the raw text, only populated on failure.
    pub raw_preview: Option<String>,
}

impl ParseResult {
    pub fn parsed(data: Value, strategy: ParseStrategy, candidate: CandidateSource) -> Self {
        Self {
            data: Some(data),
            error: None,
            strategy_used: Some(strategy),
            candidate: Some(candidate),
            raw_preview: None,
        }
    }

    pub fn passthrough(data: Value) -> Self {
        Self {
            data: Some(data),
            error: None,
            strategy_used: None,
            candidate: None,
            raw_preview: None,
        }
    }

    pub fn failed(
        error: &RecoveryError,
        candidate: Option<CandidateSource>,
        raw_preview: Option<String>,
    ) -> Self {
        Self {
            data: None,
            error: Some(error.to_string()),
            strategy_used: None,
            candidate,
            raw_preview,
        }
    }

    pub fn success(&self) -> bool {
        self.data.is_some()
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Convert into a `Result` for callers that prefer `?`.
    pub fn into_result(self) -> Result<Value, RecoveryError> {
        match (self.data, self.error) {
            (Some(data), _) => Ok(data),
            (None, error) => Err(RecoveryError::Parse(
                error.unwrap_or_else(|| "unknown parse failure".to_string()),
            )),
        }
    }
}
