use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::content::{ContentCategory, ContentElement};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryUtilization {
    pub category: ContentCategory,
    pub total: usize,
    pub used: usize,
    pub rate: f64,
}

/// How much of the required content made it into an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilizationReport {
    pub total_elements: usize,
    pub used_elements: usize,
    pub missing_elements: Vec<ContentElement>,
    /// `used / total`, or 1.0 when there was nothing to use.
    pub utilization_rate: f64,
    pub by_category: Vec<CategoryUtilization>,
}

impl UtilizationReport {
    /// Build a report from each element paired with whether the artifact contains it.
    pub fn from_matches(matches: impl IntoIterator<Item = (ContentElement, bool)>) -> Self {
        let mut categories: BTreeMap<ContentCategory, (usize, usize)> = BTreeMap::new();
        let mut missing_elements = Vec::new();
        let mut total_elements = 0;
        let mut used_elements = 0;

        for (element, hit) in matches {
            total_elements += 1;
            let entry = categories.entry(element.category).or_insert((0, 0));
            entry.0 += 1;
            if hit {
                entry.1 += 1;
                used_elements += 1;
            } else {
                missing_elements.push(element);
            }
        }

        let by_category = categories
            .into_iter()
            .map(|(category, (total, used))| CategoryUtilization {
                category,
                total,
                used,
                rate: rate(used, total),
            })
            .collect();

        Self {
            total_elements,
            used_elements,
            missing_elements,
            utilization_rate: rate(used_elements, total_elements),
            by_category,
        }
    }

    /// Below the caller's threshold; the caller decides what to do about it.
    pub fn is_shortfall(&self, min_rate: f64) -> bool {
        self.utilization_rate < min_rate
    }

    pub fn summary(&self) -> String {
        format!(
            "{}/{} content elements used ({:.1}%)",
            self.used_elements,
            self.total_elements,
            self.utilization_rate * 100.0
        )
    }
}

fn rate(used: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        used as f64 / total as f64
    }
}
