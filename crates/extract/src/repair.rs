//! Textual rewrites that turn near-JSON into strict JSON.
//!
//! Every pass skips over string literals (double- or single-quoted), so text
//! that is already valid JSON comes out with the same meaning. The result may
//! still be invalid when the input is too broken; parsing decides.

use regex::Regex;
use std::sync::LazyLock;

static TRAILING_COMMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(\s*[}\]])").expect("TRAILING_COMMA_RE"));

static BARE_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([{,]\s*)([A-Za-z_$][A-Za-z0-9_$]*)(\s*:)").expect("BARE_KEY_RE")
});

/// Apply all repairs in order: comments, trailing commas, bare keys, single quotes.
pub fn repair(candidate: &str) -> String {
    let text = strip_comments(candidate);
    let text = remove_trailing_commas(&text);
    let text = quote_bare_keys(&text);
    convert_single_quotes(&text)
}

#[derive(Debug, PartialEq)]
enum Segment<'a> {
    Code(&'a str),
    /// A string literal including its delimiters.
    Quoted { quote: char, raw: &'a str, terminated: bool },
}

/// Split text into code and string-literal segments.
fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut code_start = 0;
    let mut chars = text.char_indices();

    while let Some((i, ch)) = chars.next() {
        if ch != '"' && ch != '\'' {
            continue;
        }
        if code_start < i {
            out.push(Segment::Code(&text[code_start..i]));
        }

        let mut esc = false;
        let mut end = None;
        for (j, c) in chars.by_ref() {
            if esc {
                esc = false;
            } else if c == '\\' {
                esc = true;
            } else if c == ch {
                end = Some(j + c.len_utf8());
                break;
            }
        }

        match end {
            Some(end) => {
                out.push(Segment::Quoted { quote: ch, raw: &text[i..end], terminated: true });
                code_start = end;
            }
            None => {
                out.push(Segment::Quoted { quote: ch, raw: &text[i..], terminated: false });
                code_start = text.len();
            }
        }
    }

    if code_start < text.len() {
        out.push(Segment::Code(&text[code_start..]));
    }
    out
}

/// Rewrite the code segments, copying string literals through untouched.
fn map_code(text: &str, f: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    for segment in segments(text) {
        match segment {
            Segment::Code(code) => out.push_str(&f(code)),
            Segment::Quoted { raw, .. } => out.push_str(raw),
        }
    }
    out
}

/// Remove `/* ... */` and `// ...` comments outside string literals.
pub fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut quote: Option<char> = None;
    let mut esc = false;

    while let Some(ch) = chars.next() {
        if let Some(q) = quote {
            out.push(ch);
            if esc {
                esc = false;
            } else if ch == '\\' {
                esc = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }

        match (ch, chars.peek().copied()) {
            ('"' | '\'', _) => {
                quote = Some(ch);
                out.push(ch);
            }
            ('/', Some('/')) => {
                // Keep the newline so line structure survives.
                while let Some(&c) = chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Drop commas that directly precede a closing `}` or `]`.
pub fn remove_trailing_commas(text: &str) -> String {
    map_code(text, |code| TRAILING_COMMA_RE.replace_all(code, "$1").into_owned())
}

/// Wrap bare identifier keys in double quotes.
pub fn quote_bare_keys(text: &str) -> String {
    map_code(text, |code| BARE_KEY_RE.replace_all(code, "$1\"$2\"$3").into_owned())
}

/// Turn single-quoted string literals into double-quoted ones.
pub fn convert_single_quotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for segment in segments(text) {
        match segment {
            Segment::Code(code) => out.push_str(code),
            Segment::Quoted { quote: '\'', raw, terminated: true } => {
                out.push('"');
                out.push_str(&requote(&raw[1..raw.len() - 1]));
                out.push('"');
            }
            Segment::Quoted { raw, .. } => out.push_str(raw),
        }
    }
    out
}

/// Re-escape the body of a single-quoted literal for double quotes.
fn requote(body: &str) -> String {
    let mut out = String::with_capacity(body.len() + 2);
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some('\'') => out.push('\''),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push_str("\\\\"),
            },
            '"' => out.push_str("\\\""),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_strip_comments() {
        let text = "{\n  // name of the thing\n  \"a\": 1, /* inline */ \"b\": \"http://x.y\"\n}";
        let stripped = strip_comments(text);
        assert!(!stripped.contains("name of the thing"));
        assert!(!stripped.contains("inline"));
        assert!(stripped.contains("http://x.y"));
    }

    #[test]
    fn test_trailing_commas() {
        assert_eq!(remove_trailing_commas("{\"b\":[1,2,]}"), "{\"b\":[1,2]}");
        assert_eq!(remove_trailing_commas("{\"a\": 1 ,\n}"), "{\"a\": 1 \n}");
        assert_eq!(remove_trailing_commas("{\"s\": \",]\"}"), "{\"s\": \",]\"}");
    }

    #[test]
    fn test_bare_keys() {
        assert_eq!(quote_bare_keys("{name: 1, _id: 2}"), "{\"name\": 1, \"_id\": 2}");
        // Inside a string the pattern must not fire.
        assert_eq!(quote_bare_keys("{\"t\": \"{a: b}\"}"), "{\"t\": \"{a: b}\"}");
    }

    #[test]
    fn test_single_quotes() {
        assert_eq!(convert_single_quotes("{\"n\": 'Bob'}"), "{\"n\": \"Bob\"}");
        assert_eq!(
            convert_single_quotes("['it\\'s', 'say \"hi\"']"),
            "[\"it's\", \"say \\\"hi\\\"\"]"
        );
        assert_eq!(convert_single_quotes("{\"q\": \"don't\"}"), "{\"q\": \"don't\"}");
    }

    #[test]
    fn test_full_repair() {
        let repaired = repair("{name: 'Bob', age: 30, /* x */ tags: ['a', 'b',],}");
        let value: Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(value, serde_json::json!({"name": "Bob", "age": 30, "tags": ["a", "b"]}));
    }

    #[test]
    fn test_repair_preserves_valid_json() {
        let samples = [
            r#"{"a": 1, "b": [1, 2, 3], "c": {"d": null}}"#,
            r#"{"url": "https://example.com/a//b", "note": "it's /* not */ a comment"}"#,
            r#"{"text": "{key: value}, [x,]", "n": -1.5e3}"#,
            r#"[{"k": "a,]"}, true, false, null]"#,
            r#"{"quote": "he said \"hi\"", "apostrophe": "Bob's"}"#,
            r#""just a string""#,
        ];
        for s in samples {
            let original: Value = serde_json::from_str(s).unwrap();
            let repaired: Value = serde_json::from_str(&repair(s)).unwrap();
            assert_eq!(original, repaired, "repair changed {}", s);
        }
    }

    #[test]
    fn test_segments() {
        let segs = segments("{'a': \"b\"");
        assert_eq!(segs.len(), 4);
        assert_eq!(segs[1], Segment::Quoted { quote: '\'', raw: "'a'", terminated: true });
        let segs = segments("{\"open");
        assert_eq!(segs[1], Segment::Quoted { quote: '"', raw: "\"open", terminated: false });
    }
}
