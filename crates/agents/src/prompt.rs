use serde_json::Value;
use validate::{ContentElement, UtilizationReport};

pub fn build_spec_prompt(user_prompt: &str) -> String {
    format!(
        r#"Turn the following request into a component specification.

Output ONLY a JSON object with the keys "componentType", "purpose", "audience" and "sections" (an array of section names).

REQUEST:
{}

JSON OUTPUT:"#,
        user_prompt
    )
}

pub fn build_design_prompt(spec: &Value) -> String {
    format!(
        r#"Create a visual design system for this component specification.

Output ONLY a JSON object with the keys "colorScheme", "typography", "spacing" and "style".

SPECIFICATION:
{}

JSON OUTPUT:"#,
        spec
    )
}

pub fn build_content_prompt(user_prompt: &str, spec: &Value) -> String {
    format!(
        r#"Write the final copy for every section of this component.

Output ONLY a JSON object keyed by section name ("hero", "features", "testimonials", "stats", "cta", ...). Use real, specific text, no placeholders.

REQUEST:
{}

SPECIFICATION:
{}

JSON OUTPUT:"#,
        user_prompt, spec
    )
}

pub fn build_layout_prompt(spec: &Value, design: &Value, content: &Value) -> String {
    format!(
        r#"Plan the layout for this component.

Output ONLY a JSON object with "structure" and "sections" (an array of objects with "name", "layout" and "elements").

SPECIFICATION:
{}

DESIGN:
{}

CONTENT:
{}

JSON OUTPUT:"#,
        spec, design, content
    )
}

/// Code generation prompt; `missing` lists content a previous attempt left out.
pub fn build_code_prompt(layout: &Value, design: &Value, content: &Value, missing: &[ContentElement]) -> String {
    let mut prompt = format!(
        r#"Write a single React function component implementing this layout.

RULES:
- Use EVERY piece of text and every number from CONTENT verbatim
- Export the component as the default export
- Output ONLY the code, no explanations

LAYOUT:
{}

DESIGN:
{}

CONTENT:
{}
"#,
        layout, design, content
    );

    if !missing.is_empty() {
        prompt.push_str("\nThe previous attempt left out this content. Include all of it:\n");
        for element in missing {
            prompt.push_str(&format!("- {}: {}\n", element.path, element.value));
        }
    }

    prompt.push_str("\nCODE:");
    prompt
}

pub fn build_style_prompt(code: &str, design: &Value) -> String {
    format!(
        r#"Apply the design system to this React component using Tailwind CSS classes.

Keep all text and structure unchanged. Output ONLY the complete updated code.

DESIGN:
{}

CODE:
{}

STYLED CODE:"#,
        design, code
    )
}

pub fn build_review_prompt(code: &str, utilization: &UtilizationReport) -> String {
    format!(
        r#"Review this React component for correctness and accessibility.

Content check: {}

Output ONLY a JSON object with "valid" (boolean), "issues" (array of strings) and "suggestions" (array of strings).

CODE:
{}

JSON OUTPUT:"#,
        utilization.summary(),
        code
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use validate::{ContentCategory, ElementValue};

    #[test]
    fn test_code_prompt_lists_missing_content() {
        let missing = vec![ContentElement {
            path: "features[1].title".to_string(),
            value: ElementValue::Text("Secure".to_string()),
            category: ContentCategory::Feature,
        }];
        let prompt = build_code_prompt(&json!({}), &json!({}), &json!({}), &missing);
        assert!(prompt.contains("- features[1].title: Secure"));

        let prompt = build_code_prompt(&json!({}), &json!({}), &json!({}), &[]);
        assert!(!prompt.contains("previous attempt"));
    }
}
