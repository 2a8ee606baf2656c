//! Span-tree assembly.
//!
//! Pure transform from the flat record list a sink accumulates back into
//! the parent/child tree, used by tests, the offline CLI and downstream
//! viewers. The input list is never mutated and the transform can be
//! invoked repeatedly.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::data::record::{SpanMetrics, SpanRecord, SpanType};

/// One node of the reassembled trace tree.
#[derive(Debug, Clone, Serialize)]
pub struct SpanNode {
    pub span_id: String,
    /// Empty when the record never carried attributes (unmatched merge).
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub span_type: Option<SpanType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "SpanMetrics::is_empty")]
    pub metrics: SpanMetrics,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, JsonValue>,
    pub children: Vec<SpanNode>,
}

impl SpanNode {
    /// Indented one-line-per-span rendering for terminal inspection.
    pub fn render_ascii(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        use std::fmt::Write;

        let label = if self.name.is_empty() {
            &self.span_id
        } else {
            &self.name
        };
        let kind = self.span_type.map(|t| t.as_str()).unwrap_or("span");
        let duration = match (self.metrics.start, self.metrics.end) {
            (Some(start), Some(end)) if end >= start => format!(" ({}ms)", end - start),
            _ => String::new(),
        };
        let error = if self.error.is_some() { " [error]" } else { "" };
        let _ = writeln!(
            out,
            "{}{} [{}]{}{}",
            "  ".repeat(depth),
            label,
            kind,
            duration,
            error
        );
        for child in &self.children {
            child.render_into(out, depth + 1);
        }
    }
}

/// A record is a tree root when it has no parent, or lists itself as one.
fn is_root(record: &SpanRecord) -> bool {
    record
        .span_parents
        .first()
        .is_none_or(|parent| parent == &record.span_id)
}

/// Reassemble the first trace found in `spans`.
pub fn build_span_tree(spans: &[SpanRecord]) -> Option<SpanNode> {
    let root = spans.iter().position(is_root)?;
    let index = child_index(spans);
    Some(build_node(spans, root, &index))
}

/// Reassemble every trace in `spans`, in insertion order of their roots.
pub fn build_span_forest(spans: &[SpanRecord]) -> Vec<SpanNode> {
    let index = child_index(spans);
    spans
        .iter()
        .enumerate()
        .filter(|(_, record)| is_root(record))
        .map(|(position, _)| build_node(spans, position, &index))
        .collect()
}

/// Parent span id -> child positions, siblings ordered by `metrics.start`
/// ascending with ties broken by original array position.
fn child_index(spans: &[SpanRecord]) -> HashMap<&str, Vec<usize>> {
    let mut index: HashMap<&str, Vec<usize>> = HashMap::new();
    for (position, record) in spans.iter().enumerate() {
        if is_root(record) {
            continue;
        }
        if let Some(parent) = record.span_parents.first() {
            index.entry(parent.as_str()).or_default().push(position);
        }
    }
    for children in index.values_mut() {
        children.sort_by_key(|&position| (spans[position].metrics.start.unwrap_or(i64::MAX), position));
    }
    index
}

fn build_node(
    spans: &[SpanRecord],
    position: usize,
    index: &HashMap<&str, Vec<usize>>,
) -> SpanNode {
    let record = &spans[position];
    let children = index
        .get(record.span_id.as_str())
        .map(|positions| {
            positions
                .iter()
                .map(|&child| build_node(spans, child, index))
                .collect()
        })
        .unwrap_or_default();
    SpanNode {
        span_id: record.span_id.clone(),
        name: record.name().unwrap_or_default().to_string(),
        span_type: record.span_type(),
        input: record.input.clone(),
        output: record.output.clone(),
        error: record.error.clone(),
        metrics: record.metrics,
        metadata: record.metadata.clone(),
        children,
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;
    use crate::data::record::SpanAttributes;

    fn record(span_id: &str, parent: Option<&str>, start: Option<i64>) -> SpanRecord {
        let mut record = SpanRecord::new(
            span_id,
            "root",
            SpanAttributes {
                name: span_id.to_string(),
                span_type: SpanType::Task,
            },
            DateTime::default(),
        );
        record.span_parents = parent.map(|p| vec![p.to_string()]).unwrap_or_default();
        record.metrics.start = start;
        record
    }

    #[test]
    fn test_siblings_sorted_by_start() {
        let spans = vec![
            record("root", None, Some(0)),
            record("late", Some("root"), Some(300)),
            record("early", Some("root"), Some(100)),
        ];
        let tree = build_span_tree(&spans).unwrap();
        let order: Vec<&str> = tree.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(order, vec!["early", "late"]);
    }

    #[test]
    fn test_equal_start_keeps_insertion_order() {
        let spans = vec![
            record("root", None, Some(0)),
            record("first-inserted", Some("root"), Some(100)),
            record("second-inserted", Some("root"), Some(100)),
        ];
        let tree = build_span_tree(&spans).unwrap();
        let order: Vec<&str> = tree.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(order, vec!["first-inserted", "second-inserted"]);
    }

    #[test]
    fn test_missing_start_sorts_last() {
        let spans = vec![
            record("root", None, Some(0)),
            record("unstamped", Some("root"), None),
            record("stamped", Some("root"), Some(50)),
        ];
        let tree = build_span_tree(&spans).unwrap();
        let order: Vec<&str> = tree.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(order, vec!["stamped", "unstamped"]);
    }

    #[test]
    fn test_self_parent_counts_as_root() {
        let spans = vec![record("self", Some("self"), Some(0))];
        let tree = build_span_tree(&spans).unwrap();
        assert_eq!(tree.span_id, "self");
        assert!(tree.children.is_empty());
    }

    #[test]
    fn test_no_root_yields_none() {
        let spans = vec![record("orphan", Some("missing"), Some(0))];
        assert!(build_span_tree(&spans).is_none());
    }

    #[test]
    fn test_transform_is_idempotent_and_nonmutating() {
        let spans = vec![
            record("root", None, Some(0)),
            record("child", Some("root"), Some(10)),
        ];
        let before = serde_json::to_value(&spans).unwrap();
        let first = serde_json::to_value(build_span_tree(&spans).unwrap()).unwrap();
        let second = serde_json::to_value(build_span_tree(&spans).unwrap()).unwrap();
        assert_eq!(first, second);
        assert_eq!(serde_json::to_value(&spans).unwrap(), before);
    }

    #[test]
    fn test_forest_returns_roots_in_insertion_order() {
        let spans = vec![
            record("trace-b", None, Some(500)),
            record("trace-a", None, Some(100)),
        ];
        let forest = build_span_forest(&spans);
        let roots: Vec<&str> = forest.iter().map(|n| n.span_id.as_str()).collect();
        assert_eq!(roots, vec!["trace-b", "trace-a"]);
    }

    #[test]
    fn test_render_ascii_indents_children() {
        let spans = vec![
            record("root", None, Some(0)),
            record("child", Some("root"), Some(10)),
        ];
        let rendered = build_span_tree(&spans).unwrap().render_ascii();
        assert!(rendered.starts_with("root [task]"));
        assert!(rendered.contains("\n  child [task]"));
    }
}
