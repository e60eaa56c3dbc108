//! Content-utilization checks: does a generated artifact actually use the
//! content it was given?

pub mod content;
pub mod matcher;
pub mod report;

pub use content::{ContentCategory, ContentElement, ElementValue, flatten_content};
pub use matcher::{Artifact, MatchOptions};
pub use report::{CategoryUtilization, UtilizationReport};

use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct ContentValidator {
    options: MatchOptions,
}

impl ContentValidator {
    pub fn new(options: MatchOptions) -> Self {
        Self { options }
    }

    /// Compare every atomic content element against the artifact text.
    ///
    /// Content that is missing or not an object/array has no elements and
    /// reports a rate of 1.0: no requirements counts as a pass.
    pub fn validate(&self, content: &Value, artifact_text: &str) -> UtilizationReport {
        let elements = flatten_content(content);
        let artifact = Artifact::new(artifact_text);
        UtilizationReport::from_matches(elements.into_iter().map(|element| {
            let hit = artifact.contains(&element, &self.options);
            (element, hit)
        }))
    }

    /// Like [`validate`](Self::validate), for content that is still raw generator text.
    pub fn validate_text(&self, content_text: &str, artifact_text: &str) -> UtilizationReport {
        let content = extract::parse_structured(content_text)
            .into_result()
            .unwrap_or(Value::Null);
        self.validate(&content, artifact_text)
    }
}

pub fn validate_content_utilization(content: &Value, artifact_text: &str) -> UtilizationReport {
    ContentValidator::default().validate(content, artifact_text)
}

pub fn validate_text_content(content_text: &str, artifact_text: &str) -> UtilizationReport {
    ContentValidator::default().validate_text(content_text, artifact_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_partial_utilization() {
        let content = json!({"features": [{"title": "Fast"}, {"title": "Secure"}]});
        let report = validate_content_utilization(&content, "<h3>Fast</h3>");

        assert_eq!(report.used_elements, 1);
        assert_eq!(report.total_elements, 2);
        assert_eq!(report.utilization_rate, 0.5);
        assert_eq!(report.missing_elements.len(), 1);
        assert_eq!(report.missing_elements[0].path, "features[1].title");
        assert_eq!(report.missing_elements[0].value, ElementValue::Text("Secure".to_string()));
    }

    #[test]
    fn test_vacuous_pass() {
        for artifact in ["", "anything at all", "<div/>"] {
            assert_eq!(validate_content_utilization(&json!({}), artifact).utilization_rate, 1.0);
        }
        assert_eq!(validate_content_utilization(&Value::Null, "x").utilization_rate, 1.0);
        assert_eq!(validate_content_utilization(&json!(42), "x").utilization_rate, 1.0);
    }

    #[test]
    fn test_monotonic_as_content_is_added() {
        let content = json!({
            "hero": {"headline": "Ship faster", "subheadline": "Tools for modern teams"},
            "features": [{"title": "Fast"}, {"title": "Secure"}],
            "stats": [{"label": "Customers", "value": 1200}],
        });
        let pieces = [
            "Ship faster",
            "Secure",
            "1200",
            "Tools for modern teams",
            "Customers",
            "Fast",
        ];

        let mut artifact = String::from("export default function Page() { return <main>");
        let mut last = validate_content_utilization(&content, &artifact).utilization_rate;
        for piece in pieces {
            artifact.push_str(&format!("<p>{}</p>", piece));
            let rate = validate_content_utilization(&content, &artifact).utilization_rate;
            assert!(rate >= last, "rate dropped after adding {}", piece);
            last = rate;
        }
        assert_eq!(last, 1.0);
    }

    #[test]
    fn test_text_content() {
        let content = "```json\n{hero: {headline: 'Buy Now'}}\n```";
        let report = validate_text_content(content, "<h1>Buy now</h1>");
        assert_eq!(report.total_elements, 1);
        assert_eq!(report.utilization_rate, 1.0);

        let report = validate_text_content("no content here", "<h1/>");
        assert_eq!(report.total_elements, 0);
        assert_eq!(report.utilization_rate, 1.0);
    }
}
