//! Span id generation.

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Unique span id source, injectable for deterministic tests.
pub trait IdSource: Send + Sync {
    fn span_id(&self) -> String;
}

/// Random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdSource for UuidIds {
    fn span_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Deterministic ids for tests: `<prefix>-1`, `<prefix>-2`, ...
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl IdSource for SequentialIds {
    fn span_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}", self.prefix, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_ids() {
        let ids = SequentialIds::new("span");
        assert_eq!(ids.span_id(), "span-1");
        assert_eq!(ids.span_id(), "span-2");
    }

    #[test]
    fn test_uuid_ids_unique() {
        let ids = UuidIds;
        assert_ne!(ids.span_id(), ids.span_id());
    }
}
