//! Data layer: span records, storage sinks, backend client.

pub mod backend;
pub mod error;
pub mod record;
pub mod sink;

pub use backend::{ApiClient, BackendSpanSink};
pub use error::{BackendError, SinkError};
pub use record::{SpanAttributes, SpanMetrics, SpanRecord, SpanType};
pub use sink::{MemorySpanSink, SpanSink};
