//! Span storage contract and the in-memory reference sink.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::data::error::SinkError;
use crate::data::record::SpanRecord;

/// Narrow storage contract for emitted span records.
///
/// Implementations are best-effort: a failed insert is reported to the
/// caller, never retried, and must not corrupt previously stored records.
#[async_trait]
pub trait SpanSink: Send + Sync {
    /// Store or merge one record, returning the span id it landed under.
    async fn insert_span(&self, record: SpanRecord) -> Result<Option<String>, SinkError>;

    /// All records seen so far, in insertion order.
    async fn spans(&self) -> Vec<SpanRecord>;
}

/// In-memory sink with merge-or-insert semantics.
///
/// A merge record targeting an existing `span_id` overwrites the top-level
/// fields it carries and merges `metadata`/`metrics` key-wise. A merge with
/// no target is inserted as a fresh record; that usually means a close
/// arrived before its open, so it is counted for diagnostics.
#[derive(Debug, Default)]
pub struct MemorySpanSink {
    spans: Mutex<Vec<SpanRecord>>,
    unmatched_merges: AtomicU64,
}

impl MemorySpanSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of merge records that found no existing span to update.
    pub fn unmatched_merges(&self) -> u64 {
        self.unmatched_merges.load(Ordering::Relaxed)
    }
}

fn apply_merge(existing: &mut SpanRecord, update: SpanRecord) {
    if update.input.is_some() {
        existing.input = update.input;
    }
    if update.output.is_some() {
        existing.output = update.output;
    }
    if update.error.is_some() {
        existing.error = update.error;
    }
    if update.span_attributes.is_some() {
        existing.span_attributes = update.span_attributes;
    }
    if !update.span_parents.is_empty() {
        existing.span_parents = update.span_parents;
    }
    for (key, value) in update.metadata {
        existing.metadata.insert(key, value);
    }
    existing.metrics.merge_from(&update.metrics);
}

#[async_trait]
impl SpanSink for MemorySpanSink {
    async fn insert_span(&self, record: SpanRecord) -> Result<Option<String>, SinkError> {
        let mut spans = self.spans.lock();
        if record.is_merge {
            if let Some(existing) = spans.iter_mut().find(|s| s.span_id == record.span_id) {
                apply_merge(existing, record);
                return Ok(Some(existing.span_id.clone()));
            }
            self.unmatched_merges.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(span_id = %record.span_id, "merge target not found, inserting as new span");
        }
        let span_id = record.span_id.clone();
        spans.push(record);
        Ok(Some(span_id))
    }

    async fn spans(&self) -> Vec<SpanRecord> {
        self.spans.lock().clone()
    }
}
