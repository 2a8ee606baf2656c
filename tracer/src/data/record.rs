//! Span record types.
//!
//! [`SpanRecord`] is the sole contract between the event processor and the
//! collector backend: one record per unit of work (session, turn, LLM call,
//! tool call), or a partial update to one when `is_merge` is set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

// ============================================================================
// SPAN CLASSIFICATION
// ============================================================================

/// Span classification understood by the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanType {
    Task,
    Llm,
    Tool,
    Function,
    Eval,
    Score,
}

impl SpanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Llm => "llm",
            Self::Tool => "tool",
            Self::Function => "function",
            Self::Eval => "eval",
            Self::Score => "score",
        }
    }
}

impl std::fmt::Display for SpanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Display name and classification of a span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanAttributes {
    pub name: String,
    #[serde(rename = "type")]
    pub span_type: SpanType,
}

// ============================================================================
// METRICS
// ============================================================================

/// Timing and token counters.
///
/// `start`/`end` are machine epoch-millis used for duration and sibling
/// ordering; they are independent of the record's `created` timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u64>,
}

impl SpanMetrics {
    pub fn is_empty(&self) -> bool {
        self.start.is_none()
            && self.end.is_none()
            && self.prompt_tokens.is_none()
            && self.completion_tokens.is_none()
            && self.tokens.is_none()
    }

    /// Key-wise merge: fields set in `update` win, unset fields keep the
    /// existing value.
    pub fn merge_from(&mut self, update: &SpanMetrics) {
        if update.start.is_some() {
            self.start = update.start;
        }
        if update.end.is_some() {
            self.end = update.end;
        }
        if update.prompt_tokens.is_some() {
            self.prompt_tokens = update.prompt_tokens;
        }
        if update.completion_tokens.is_some() {
            self.completion_tokens = update.completion_tokens;
        }
        if update.tokens.is_some() {
            self.tokens = update.tokens;
        }
    }
}

// ============================================================================
// SPAN RECORD
// ============================================================================

/// The unit persisted to a [`SpanSink`](crate::data::sink::SpanSink).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpanRecord {
    pub id: String,
    pub span_id: String,
    /// Id of the span at the root of this record's trace. For sub-sessions
    /// this is the ancestor session's root, not the sub-session's own root.
    pub root_span_id: String,
    /// Ordered parent ids; only the first element is used for tree
    /// reconstruction.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub span_parents: Vec<String>,
    /// ISO timestamp used for record ordering.
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, JsonValue>,
    #[serde(default, skip_serializing_if = "SpanMetrics::is_empty")]
    pub metrics: SpanMetrics,
    /// Absent on merge records that neither rename nor retype the span.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_attributes: Option<SpanAttributes>,
    /// When set, the record updates an existing span instead of opening a
    /// new one.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_merge: bool,
}

impl SpanRecord {
    /// A fresh span record. `id` starts equal to `span_id` so later merges
    /// can match it.
    pub fn new(
        span_id: &str,
        root_span_id: &str,
        attributes: SpanAttributes,
        created: DateTime<Utc>,
    ) -> Self {
        Self {
            id: span_id.to_string(),
            span_id: span_id.to_string(),
            root_span_id: root_span_id.to_string(),
            span_parents: Vec::new(),
            created,
            input: None,
            output: None,
            error: None,
            metadata: Map::new(),
            metrics: SpanMetrics::default(),
            span_attributes: Some(attributes),
            is_merge: false,
        }
    }

    /// A partial update targeting an already-emitted span.
    pub fn merge(span_id: &str, root_span_id: &str, created: DateTime<Utc>) -> Self {
        Self {
            id: span_id.to_string(),
            span_id: span_id.to_string(),
            root_span_id: root_span_id.to_string(),
            span_parents: Vec::new(),
            created,
            input: None,
            output: None,
            error: None,
            metadata: Map::new(),
            metrics: SpanMetrics::default(),
            span_attributes: None,
            is_merge: true,
        }
    }

    /// Span name, when the record carries attributes.
    pub fn name(&self) -> Option<&str> {
        self.span_attributes.as_ref().map(|a| a.name.as_str())
    }

    /// Span type, when the record carries attributes.
    pub fn span_type(&self) -> Option<SpanType> {
        self.span_attributes.as_ref().map(|a| a.span_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_merge_from_keeps_unset_fields() {
        let mut metrics = SpanMetrics {
            start: Some(100),
            tokens: Some(5),
            ..Default::default()
        };
        metrics.merge_from(&SpanMetrics {
            end: Some(200),
            ..Default::default()
        });
        assert_eq!(metrics.start, Some(100));
        assert_eq!(metrics.end, Some(200));
        assert_eq!(metrics.tokens, Some(5));
    }

    #[test]
    fn test_metrics_merge_from_overwrites_set_fields() {
        let mut metrics = SpanMetrics {
            tokens: Some(5),
            ..Default::default()
        };
        metrics.merge_from(&SpanMetrics {
            tokens: Some(9),
            ..Default::default()
        });
        assert_eq!(metrics.tokens, Some(9));
    }

    #[test]
    fn test_merge_record_serializes_without_empty_fields() {
        let record = SpanRecord::merge("s1", "r1", DateTime::default());
        let json = serde_json::to_value(&record).unwrap();
        let object = json.as_object().unwrap();
        assert!(object.contains_key("is_merge"));
        assert!(!object.contains_key("span_attributes"));
        assert!(!object.contains_key("metrics"));
        assert!(!object.contains_key("span_parents"));
    }

    #[test]
    fn test_span_type_wire_names() {
        assert_eq!(serde_json::to_value(SpanType::Llm).unwrap(), "llm");
        assert_eq!(serde_json::to_value(SpanType::Task).unwrap(), "task");
    }
}
