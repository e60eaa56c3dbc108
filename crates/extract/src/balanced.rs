use crate::schema::{CandidateSource, ExtractionCandidate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenChar {
    Brace,
    Bracket,
}

impl OpenChar {
    fn open(self) -> char {
        match self {
            OpenChar::Brace => '{',
            OpenChar::Bracket => '[',
        }
    }

    fn close(self) -> char {
        match self {
            OpenChar::Brace => '}',
            OpenChar::Bracket => ']',
        }
    }
}

/// Extract the span from the first `open` character to its balancing close.
///
/// Only the requested bracket kind is counted. Anything inside a single- or
/// double-quoted string literal is skipped, so braces in string values do not
/// shift the depth. Returns `None` when there is no opener or the input ends before the
/// depth gets back to zero.
pub fn extract_balanced(text: &str, open: OpenChar) -> Option<ExtractionCandidate> {
    let start = text.find(open.open())?;
    let (open_ch, close_ch) = (open.open(), open.close());

    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut esc = false;

    for (offset, ch) in text[start..].char_indices() {
        if let Some(q) = quote {
            if esc {
                esc = false;
            } else if ch == '\\' {
                esc = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }

        if ch == '"' || ch == '\'' {
            quote = Some(ch);
        } else if ch == open_ch {
            depth += 1;
        } else if ch == close_ch {
            depth -= 1;
            if depth == 0 {
                let end = start + offset + ch.len_utf8();
                let span = &text[start..end];
                return ExtractionCandidate::new((start, end), span, CandidateSource::BraceBalance);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_in_prose() {
        let text = "Sure! Here you go: {\"a\": {\"b\": [1, 2]}} Hope that helps.";
        let candidate = extract_balanced(text, OpenChar::Brace).unwrap();
        assert_eq!(candidate.text, "{\"a\": {\"b\": [1, 2]}}");
        assert_eq!(&text[candidate.span.0..candidate.span.1], candidate.text);
        assert_eq!(candidate.source, CandidateSource::BraceBalance);
    }

    #[test]
    fn test_braces_inside_strings_ignored() {
        let text = r#"{"template": "function() { return \"}\"; }", "n": 1} trailing"#;
        let candidate = extract_balanced(text, OpenChar::Brace).unwrap();
        assert_eq!(candidate.text, r#"{"template": "function() { return \"}\"; }", "n": 1}"#);
    }

    #[test]
    fn test_single_quoted_strings_skipped() {
        let text = "Result: {title: 'Close } here', quote: 'say \"hi\"', n: 1} done";
        let candidate = extract_balanced(text, OpenChar::Brace).unwrap();
        assert_eq!(candidate.text, "{title: 'Close } here', quote: 'say \"hi\"', n: 1}");

        let escaped = r"{a: 'it\'s }'}";
        assert_eq!(extract_balanced(escaped, OpenChar::Brace).unwrap().text, escaped);
    }

    #[test]
    fn test_array() {
        let text = "Result:\n[{\"x\": 1}, {\"x\": 2}]\n";
        let candidate = extract_balanced(text, OpenChar::Bracket).unwrap();
        assert_eq!(candidate.text, "[{\"x\": 1}, {\"x\": 2}]");
    }

    #[test]
    fn test_truncated_returns_none() {
        assert!(extract_balanced("{\"a\": {\"b\": 1", OpenChar::Brace).is_none());
        assert!(extract_balanced("no braces here", OpenChar::Brace).is_none());
        assert!(extract_balanced("[1, 2", OpenChar::Bracket).is_none());
    }

    #[test]
    fn test_multibyte_text() {
        let text = "Voilà → {\"titre\": \"Café\"} ✓";
        let candidate = extract_balanced(text, OpenChar::Brace).unwrap();
        assert_eq!(candidate.text, "{\"titre\": \"Café\"}");
    }

    #[test]
    fn test_extracted_span_is_valid_json() {
        let wrapped = [
            "```json\n{\"hero\": {\"headline\": \"Buy {now}\"}}\n```",
            "Here is the JSON: {\"a\": [1, {\"b\": null}]}. Let me know!",
            "- {\"k\": \"v\"}",
        ];
        for text in wrapped {
            let candidate = extract_balanced(text, OpenChar::Brace).unwrap();
            assert!(serde_json::from_str::<serde_json::Value>(&candidate.text).is_ok(), "{}", text);
        }
    }
}
