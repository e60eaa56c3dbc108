use serde_json::Value;

use crate::balanced::{OpenChar, extract_balanced};
use crate::error::RecoveryError;
use crate::lenient::parse_lenient;
use crate::normalizer::normalize;
use crate::patterns::extract_by_pattern;
use crate::repair::repair;
use crate::schema::{CandidateSource, ExtractionCandidate, ParseResult, ParseStrategy, RawInput};

/// Top-level shape the caller expects back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpectedShape {
    /// Try `{` before `[` when balancing.
    #[default]
    Object,
    /// Try `[` before `{` when balancing.
    List,
}

#[derive(Debug, Clone)]
pub struct ParserOptions {
    pub expected_shape: ExpectedShape,
    /// Characters of raw text kept in `raw_preview` on failure.
    pub preview_chars: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            expected_shape: ExpectedShape::Object,
            preview_chars: 200,
        }
    }
}

/// Multi-strategy parser for generator output.
///
/// Candidate selection and parse attempts run in a fixed order and the first
/// success wins; the order decides which malformed inputs are recovered, so it
/// must not change. Parsing is pure: no logging and no shared state.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    options: ParserOptions,
}

impl Parser {
    pub fn new(options: ParserOptions) -> Self {
        Self { options }
    }

    pub fn with_shape(expected_shape: ExpectedShape) -> Self {
        Self::new(ParserOptions {
            expected_shape,
            ..ParserOptions::default()
        })
    }

    pub fn parse(&self, input: impl Into<RawInput>) -> ParseResult {
        match input.into() {
            RawInput::Text(text) => self.parse_text(&text),
            RawInput::Structured(value) => match value {
                Value::Object(_) | Value::Array(_) => ParseResult::passthrough(value),
                Value::String(text) => self.parse_text(&text),
                Value::Null => ParseResult::failed(&RecoveryError::EmptyResponse, None, None),
                Value::Bool(_) => {
                    ParseResult::failed(&RecoveryError::UnsupportedInput("boolean"), None, None)
                }
                Value::Number(_) => {
                    ParseResult::failed(&RecoveryError::UnsupportedInput("number"), None, None)
                }
            },
        }
    }

    pub fn parse_text(&self, raw: &str) -> ParseResult {
        let normalized = normalize(raw);

        let Some(candidate) = self.select_candidate(&normalized) else {
            return ParseResult::failed(&RecoveryError::Extraction, None, Some(self.preview(raw)));
        };

        match attempt_parse(&candidate.text) {
            Ok((data, strategy)) => ParseResult::parsed(data, strategy, candidate.source),
            Err(message) => ParseResult::failed(
                &RecoveryError::Parse(message),
                Some(candidate.source),
                Some(self.preview(raw)),
            ),
        }
    }

    /// Pick exactly one candidate: balanced spans, then patterns, then the whole text.
    pub fn select_candidate(&self, normalized: &str) -> Option<ExtractionCandidate> {
        let order = match self.options.expected_shape {
            ExpectedShape::Object => [OpenChar::Brace, OpenChar::Bracket],
            ExpectedShape::List => [OpenChar::Bracket, OpenChar::Brace],
        };

        order
            .into_iter()
            .find_map(|open| extract_balanced(normalized, open))
            .or_else(|| extract_by_pattern(normalized))
            .or_else(|| whole_text_candidate(normalized))
    }

    fn preview(&self, raw: &str) -> String {
        raw.chars().take(self.options.preview_chars).collect()
    }
}

/// Last resort: the normalized text, with any preamble before the first
/// brace or bracket cut off.
fn whole_text_candidate(normalized: &str) -> Option<ExtractionCandidate> {
    let start = normalized.find(['{', '[']).unwrap_or(0);
    let span = (start, normalized.len());
    ExtractionCandidate::new(span, &normalized[start..], CandidateSource::WholeText)
}

/// Strict, then repaired, then the permissive literal parser.
fn attempt_parse(candidate: &str) -> Result<(Value, ParseStrategy), String> {
    if let Ok(value) = serde_json::from_str::<Value>(candidate) {
        return Ok((value, ParseStrategy::StrictJson));
    }

    let repaired = repair(candidate);
    if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
        return Ok((value, ParseStrategy::RepairedJson));
    }

    parse_lenient(&repaired)
        .map(|value| (value, ParseStrategy::LenientLiteral))
        .map_err(|e| e.to_string())
}

/// Parse with default options.
pub fn parse_structured(input: impl Into<RawInput>) -> ParseResult {
    Parser::default().parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fenced_with_trailing_comma() {
        let result = parse_structured("Here is the JSON:\n```json\n{\"a\":1, \"b\":[1,2,]}\n```");
        assert!(result.success());
        assert_eq!(result.data(), Some(&json!({"a": 1, "b": [1, 2]})));
        assert_eq!(result.strategy_used, Some(ParseStrategy::RepairedJson));
    }

    #[test]
    fn test_bare_keys_and_single_quotes() {
        let result = parse_structured("{name: 'Bob', age: 30}");
        assert!(result.success());
        assert_eq!(result.data(), Some(&json!({"name": "Bob", "age": 30})));
        assert_eq!(result.strategy_used, Some(ParseStrategy::RepairedJson));
    }

    #[test]
    fn test_no_json_fails() {
        let result = parse_structured("Sorry, I can't help with that.");
        assert!(!result.success());
        assert!(result.data().is_none());
        assert!(result.error().is_some());
        assert_eq!(result.candidate, Some(CandidateSource::WholeText));
        assert_eq!(result.raw_preview.as_deref(), Some("Sorry, I can't help with that."));
    }

    #[test]
    fn test_structured_passthrough() {
        let input = json!({"hero": {"headline": "Buy Now"}});
        let result = parse_structured(input.clone());
        assert!(result.success());
        assert_eq!(result.data(), Some(&input));
        assert_eq!(result.strategy_used, None);
        assert_eq!(result.candidate, None);
    }

    #[test]
    fn test_structured_string_and_scalars() {
        let result = parse_structured(json!("{\"a\": 1}"));
        assert_eq!(result.data(), Some(&json!({"a": 1})));

        let result = parse_structured(Value::Null);
        assert_eq!(result.error(), Some("Empty response"));

        assert!(!parse_structured(json!(42)).success());
    }

    #[test]
    fn test_truncated_input_fails() {
        let text = "{\"a\": {\"b\": 1";
        assert!(extract_balanced(text, OpenChar::Brace).is_none());
        assert!(extract_by_pattern(text).is_none());
        let result = parse_structured(text);
        assert!(!result.success());
    }

    #[test]
    fn test_empty_text_is_extraction_failure() {
        let result = parse_structured("  ```json\n```  ");
        assert!(!result.success());
        assert_eq!(result.error(), Some("No JSON content found in response"));
        assert_eq!(result.candidate, None);
    }

    #[test]
    fn test_pattern_fallback_when_unbalanced() {
        let result = parse_structured("{ incomplete thought\n```json\n{\"ok\": true}\n```\nthanks");
        assert!(result.success());
        assert_eq!(result.candidate, Some(CandidateSource::FencedBlock));
        assert_eq!(result.data(), Some(&json!({"ok": true})));
    }

    #[test]
    fn test_lenient_fallback() {
        let result = parse_structured("{title: 'Launch', count: .5, note: undefined}");
        assert!(result.success());
        assert_eq!(result.strategy_used, Some(ParseStrategy::LenientLiteral));
        assert_eq!(result.data(), Some(&json!({"title": "Launch", "count": 0.5, "note": null})));
    }

    #[test]
    fn test_closing_brace_inside_single_quoted_value() {
        let result = parse_structured("Here you go: {title: 'Close } here', n: 1} Enjoy!");
        assert!(result.success(), "{:?}", result.error());
        assert_eq!(result.candidate, Some(CandidateSource::BraceBalance));
        assert_eq!(result.strategy_used, Some(ParseStrategy::RepairedJson));
        assert_eq!(result.data(), Some(&json!({"title": "Close } here", "n": 1})));
    }

    #[test]
    fn test_expected_list_shape() {
        let text = "Items:\n[{\"id\": 1}, {\"id\": 2}]";
        let object_first = parse_structured(text);
        assert_eq!(object_first.data(), Some(&json!({"id": 1})));

        let list_first = Parser::with_shape(ExpectedShape::List).parse(text);
        assert_eq!(list_first.data(), Some(&json!([{"id": 1}, {"id": 2}])));
    }

    #[test]
    fn test_deterministic() {
        let inputs = [
            "{name: 'Bob', age: 30}",
            "garbage { \"x\": [1,2,] } more",
            "Sorry, I can't help with that.",
            "{a: .5}",
        ];
        for input in inputs {
            let first = parse_structured(input);
            for _ in 0..5 {
                assert_eq!(parse_structured(input), first);
            }
        }
    }

    #[test]
    fn test_preview_is_bounded() {
        let parser = Parser::new(ParserOptions {
            preview_chars: 10,
            ..ParserOptions::default()
        });
        let result = parser.parse("not json at all, just a long apology from the model");
        assert_eq!(result.raw_preview.as_deref(), Some("not json a"));
    }
}
