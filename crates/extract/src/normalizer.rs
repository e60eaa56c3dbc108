/// Trim whitespace and strip a leading/trailing markdown fence.
///
/// Prose around the JSON is left alone; locating the value is the job of the
/// extractors. Runs to a fixpoint, so normalizing twice changes nothing.
pub fn normalize(raw: &str) -> String {
    let mut current = raw.trim();

    loop {
        let next = strip_trailing_fence(strip_leading_fence(current)).trim();
        if next.len() == current.len() {
            return next.to_string();
        }
        current = next;
    }
}

/// Remove an opening fence plus its language tag, e.g. "```json".
fn strip_leading_fence(s: &str) -> &str {
    match s.strip_prefix("```") {
        Some(rest) => {
            rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        }
        None => s,
    }
}

fn strip_trailing_fence(s: &str) -> &str {
    s.strip_suffix("```").unwrap_or(s)
}
