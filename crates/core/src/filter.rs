//! Dashboard filtering.

use serde::Deserialize;

use crate::model::{Category, Violation, ViolationStatus};

/// Result ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViolationOrder {
    /// By `created_at`, newest first. Ties keep their source order.
    #[default]
    NewestFirst,
    /// Source order.
    Source,
}

/// Predicates shared by every dashboard. Empty predicates match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationFilter {
    #[serde(default)]
    pub status: Option<ViolationStatus>,
    #[serde(default)]
    pub category: Option<Category>,
    /// Case-insensitive substring of student ID, student name or department.
    #[serde(default, alias = "search")]
    pub search_text: Option<String>,
    #[serde(skip)]
    pub order: ViolationOrder,
}

impl ViolationFilter {
    /// Filter on status only.
    #[must_use]
    pub fn status(status: ViolationStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Whether `record` satisfies every non-empty predicate.
    #[must_use]
    pub fn matches(&self, record: &Violation) -> bool {
        if self.status.is_some_and(|status| record.status != status) {
            return false;
        }
        if self.category.is_some_and(|category| record.category != category) {
            return false;
        }
        match self.needle() {
            Some(needle) => [&record.student_id, &record.student_name, &record.department]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle)),
            None => true,
        }
    }

    /// Matching records in the requested order. `source` is left untouched.
    #[must_use]
    pub fn apply(&self, source: &[Violation]) -> Vec<Violation> {
        let mut matched: Vec<Violation> = source
            .iter()
            .filter(|record| self.matches(record))
            .cloned()
            .collect();

        if self.order == ViolationOrder::NewestFirst {
            matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }
        matched
    }

    fn needle(&self) -> Option<String> {
        self.search_text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_lowercase)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::fixtures::{at, violation};

    fn sample() -> Vec<Violation> {
        let mut a = violation("a", ViolationStatus::Pending);
        a.created_at = at(1, 8);
        let mut b = violation("b", ViolationStatus::Verified);
        b.created_at = at(2, 8);
        let mut c = violation("c", ViolationStatus::Pending);
        c.created_at = at(3, 8);
        c.student_name = "Ravi Kumar".to_string();
        c.department = "Civil Engineering".to_string();
        c.category = Category::Curfew;
        let mut d = violation("d", ViolationStatus::Corrected);
        d.created_at = at(4, 8);
        vec![a, b, c, d]
    }

    fn ids(records: &[Violation]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_status_filter_preserves_relative_order() {
        let source = sample();
        let filter = ViolationFilter {
            order: ViolationOrder::Source,
            ..ViolationFilter::status(ViolationStatus::Pending)
        };

        assert_eq!(ids(&filter.apply(&source)), vec!["a", "c"]);
        assert_eq!(source.len(), 4);
    }

    #[test]
    fn test_default_order_is_newest_first() {
        let result = ViolationFilter::status(ViolationStatus::Pending).apply(&sample());
        assert_eq!(ids(&result), vec!["c", "a"]);
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let filter = ViolationFilter {
            search_text: Some("  civil ".to_string()),
            ..ViolationFilter::default()
        };
        assert_eq!(ids(&filter.apply(&sample())), vec!["c"]);

        let filter = ViolationFilter {
            search_text: Some("stu0".to_string()),
            ..ViolationFilter::default()
        };
        assert_eq!(filter.apply(&sample()).len(), 4);
    }

    #[test]
    fn test_predicates_combine() {
        let filter = ViolationFilter {
            status: Some(ViolationStatus::Pending),
            category: Some(Category::MissingIdBadge),
            search_text: Some(String::new()),
            order: ViolationOrder::NewestFirst,
        };
        assert_eq!(ids(&filter.apply(&sample())), vec!["a"]);
    }

    #[test]
    fn test_deserializes_query_names() {
        let filter: ViolationFilter = serde_json::from_str(
            r#"{"status":"corrected","category":"Late Night Out","search":"ravi"}"#,
        )
        .unwrap();

        assert_eq!(filter.status, Some(ViolationStatus::Corrected));
        assert_eq!(filter.category, Some(Category::Curfew));
        assert_eq!(filter.search_text.as_deref(), Some("ravi"));
    }
}
