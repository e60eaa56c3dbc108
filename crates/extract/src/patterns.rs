use regex::Regex;
use std::sync::LazyLock;

use crate::schema::{CandidateSource, ExtractionCandidate};

static FENCED_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json|JSON|javascript|js)?[ \t]*\r?\n?(.*?)```").expect("FENCED_BLOCK_RE")
});

static NARRATIVE_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)(?:here'?s|here\s+is|the)\s+(?:json|result|output)[:.]?\s*(\{.*\})")
        .expect("NARRATIVE_PREFIX_RE")
});

static BULLET_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)[-•:]\s*(\{.*\})").expect("BULLET_PREFIX_RE"));

static GREEDY_OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("GREEDY_OBJECT_RE"));

static GREEDY_ARRAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[.*\]").expect("GREEDY_ARRAY_RE"));

static CODE_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n(.*?)```").expect("CODE_FENCE_RE")
});

/// Ordered fallback strategies, tried when brace balancing found nothing.
/// The greedy object pattern can over- or under-match on nested input.
static PATTERNS: LazyLock<[(&'static Regex, CandidateSource); 5]> = LazyLock::new(|| {
    [
        (&*FENCED_BLOCK_RE, CandidateSource::FencedBlock),
        (&*NARRATIVE_PREFIX_RE, CandidateSource::PrefixPattern),
        (&*BULLET_PREFIX_RE, CandidateSource::PrefixPattern),
        (&*GREEDY_OBJECT_RE, CandidateSource::GreedyObject),
        (&*GREEDY_ARRAY_RE, CandidateSource::GreedyArray),
    ]
});

/// Return the first plausible match of the ordered pattern list.
pub fn extract_by_pattern(text: &str) -> Option<ExtractionCandidate> {
    for (re, source) in PATTERNS.iter() {
        let Some(caps) = re.captures(text) else {
            continue;
        };
        // Patterns with a group capture the payload; the greedy ones use the whole match.
        let Some(m) = caps.get(1).or_else(|| caps.get(0)) else {
            continue;
        };

        let raw = m.as_str();
        let trimmed = raw.trim();
        if !is_plausible(trimmed) {
            continue;
        }

        let start = m.start() + (raw.len() - raw.trim_start().len());
        let end = start + trimmed.len();
        if let Some(candidate) = ExtractionCandidate::new((start, end), trimmed, *source) {
            return Some(candidate);
        }
    }
    None
}

/// Body of the longest fenced block with any language tag, e.g. ```` ```jsx ````.
///
/// For free-text responses where the model wraps code in prose.
pub fn fenced_body(text: &str) -> Option<&str> {
    CODE_FENCE_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|body| !body.is_empty())
        .max_by_key(|body| body.len())
}

/// Starts with an opener and contains the matching closer somewhere after it.
fn is_plausible(s: &str) -> bool {
    match s.chars().next() {
        Some('{') => s[1..].contains('}'),
        Some('[') => s[1..].contains(']'),
        _ => false,
    }
}
