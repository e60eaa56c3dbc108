use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentCategory {
    Hero,
    Feature,
    Testimonial,
    Stat,
    Other,
}

impl ContentCategory {
    /// Categorize by the top-level key the element lives under.
    pub fn from_key(key: &str) -> Self {
        let key = key.to_lowercase();
        if key.starts_with("hero") {
            ContentCategory::Hero
        } else if key.starts_with("feature") {
            ContentCategory::Feature
        } else if key.starts_with("testimonial") {
            ContentCategory::Testimonial
        } else if key.starts_with("stat") {
            ContentCategory::Stat
        } else {
            ContentCategory::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElementValue {
    Text(String),
    Number(Number),
}

impl fmt::Display for ElementValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementValue::Text(s) => write!(f, "{}", s),
            ElementValue::Number(n) => write!(f, "{}", n),
        }
    }
}

/// One atomic piece of required content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentElement {
    /// Location in the source object, e.g. `features[1].title`.
    pub path: String,
    pub value: ElementValue,
    pub category: ContentCategory,
}

/// Flatten a content object into its atomic elements.
///
/// Only objects and arrays are walked; any other root yields nothing. Blank
/// strings, booleans and nulls are not content.
pub fn flatten_content(content: &Value) -> Vec<ContentElement> {
    let mut elements = Vec::new();
    match content {
        Value::Object(map) => {
            for (key, value) in map {
                walk(value, key.clone(), ContentCategory::from_key(key), &mut elements);
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                walk(item, format!("[{}]", i), ContentCategory::Other, &mut elements);
            }
        }
        _ => {}
    }
    elements
}

fn walk(value: &Value, path: String, category: ContentCategory, out: &mut Vec<ContentElement>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                walk(child, format!("{}.{}", path, key), category, out);
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                walk(item, format!("{}[{}]", path, i), category, out);
            }
        }
        Value::String(s) if !s.trim().is_empty() => out.push(ContentElement {
            path,
            value: ElementValue::Text(s.clone()),
            category,
        }),
        Value::Number(n) => out.push(ContentElement {
            path,
            value: ElementValue::Number(n.clone()),
            category,
        }),
        _ => {}
    }
}
