use crate::content::{ContentElement, ElementValue};

/// Tunables for the literal matching heuristic.
///
/// Long strings are matched on a prefix only, which tolerates a paraphrased
/// tail but can also report a false hit. This is an approximation, not
/// exact-match semantics.
#[derive(Debug, Clone)]
pub struct MatchOptions {
    /// Strings longer than this many characters are matched on a prefix.
    pub long_string_threshold: usize,
    /// Length of that prefix, in characters.
    pub prefix_len: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            long_string_threshold: 50,
            prefix_len: 30,
        }
    }
}

/// Generated artifact prepared for case-insensitive searching.
pub struct Artifact {
    raw: String,
    normalized: String,
}

impl Artifact {
    pub fn new(text: &str) -> Self {
        let raw = text.to_lowercase();
        let normalized = normalize_for_match(&raw);
        Self { raw, normalized }
    }

    /// Whether the element appears in the artifact, raw or after decoding escapes.
    pub fn contains(&self, element: &ContentElement, options: &MatchOptions) -> bool {
        let needle = search_text(&element.value, options).to_lowercase();
        if needle.is_empty() {
            return true;
        }
        if self.raw.contains(&needle) {
            return true;
        }
        let needle = normalize_for_match(&needle);
        !needle.is_empty() && self.normalized.contains(&needle)
    }
}

/// The text searched for: numbers by their string form, long strings by prefix.
pub fn search_text(value: &ElementValue, options: &MatchOptions) -> String {
    match value {
        ElementValue::Number(n) => n.to_string(),
        ElementValue::Text(s) => {
            let s = s.trim();
            if s.chars().count() > options.long_string_threshold {
                s.chars().take(options.prefix_len).collect::<String>().trim_end().to_string()
            } else {
                s.to_string()
            }
        }
    }
}

/// Decode the quote and ampersand escapes generated code tends to contain,
/// unify typographic quotes, and collapse whitespace runs.
fn normalize_for_match(text: &str) -> String {
    const REPLACEMENTS: [(&str, &str); 10] = [
        ("\\'", "'"),
        ("\\\"", "\""),
        ("&apos;", "'"),
        ("&#39;", "'"),
        ("&#x27;", "'"),
        ("&quot;", "\""),
        ("&#34;", "\""),
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&amp;", "&"),
    ];

    let mut decoded = text
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201c}', '\u{201d}'], "\"");
    for (from, to) in REPLACEMENTS {
        decoded = decoded.replace(from, to);
    }
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}
