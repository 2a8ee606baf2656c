//! Session tracing domain.
//!
//! - `events` - typed host event feed and hook payloads
//! - `session` - per-session accumulation state
//! - `processor` - the event/turn/span state machine
//! - `subagent` - sub-agent title grammar
//! - `tree` - flat span list to tree reassembly

pub mod events;
pub mod processor;
pub mod session;
pub mod subagent;
pub mod tree;


pub use events::HostMessage;
pub use processor::EventProcessor;
pub use tree::{SpanNode, build_span_forest, build_span_tree};
