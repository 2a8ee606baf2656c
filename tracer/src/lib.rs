//! traceline: turns an AI agent session's event stream into a hierarchical
//! trace of spans for an observability backend.
//!
//! The core is [`domain::processor::EventProcessor`], a per-session state
//! machine that accumulates streamed message fragments into discrete span
//! records on a [`data::sink::SpanSink`]; [`domain::tree`] reassembles the
//! flat record list into a trace tree.

mod app;
pub mod core;
pub mod data;
pub mod domain;
pub mod utils;
