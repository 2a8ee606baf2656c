//! Per-session accumulation state.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde_json::Value as JsonValue;

/// One streamed tool call, accumulated from message parts and serialized
/// into the assistant payload of the owning LLM span.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LlmToolCall {
    pub id: String,
    pub name: String,
    pub arguments: JsonValue,
}

/// Mutable state for one live session.
///
/// Created on `session.created`, mutated only by the
/// [`EventProcessor`](crate::domain::processor::EventProcessor), and removed
/// explicitly on delete or error (and on idle for child sessions). A session
/// has at most one open turn at a time.
#[derive(Debug)]
pub struct SessionState {
    /// Id of this session's own root span.
    pub root_span_id: String,
    /// Root of the trace this session's spans attach to. Equals
    /// `root_span_id` for top-level sessions; for a child session, the
    /// nearest ancestor's effective root.
    pub effective_root_span_id: String,
    /// Open turn span, absent when idle.
    pub current_turn_span_id: Option<String>,
    pub turn_number: u32,
    pub tool_call_count: u64,
    /// Session start, epoch millis.
    pub start_time: i64,
    /// The pending turn's user input.
    pub current_input: Option<String>,
    /// Latest captured assistant text for the pending turn.
    pub current_output: Option<String>,
    /// Model identifier last seen on a chat hook.
    pub model: Option<String>,
    /// message id -> accumulated assistant text
    pub llm_output_parts: HashMap<String, String>,
    /// message id -> streamed tool calls, in arrival order
    pub llm_tool_calls: HashMap<String, Vec<LlmToolCall>>,
    /// message id -> accumulated reasoning text
    pub llm_reasoning_parts: HashMap<String, String>,
    /// message ids that already produced an LLM span
    pub processed_llm_messages: HashSet<String>,
    /// tool call id -> start time, epoch millis
    pub tool_start_times: HashMap<String, i64>,
    /// tool call id -> message id that streamed the call
    pub tool_call_message_ids: HashMap<String, String>,
    /// Set only for child (sub-agent) sessions.
    pub parent_session_id: Option<String>,
    /// Parent's open turn at the moment this child was created.
    pub parent_turn_span_id: Option<String>,
    /// Parsed sub-agent display title.
    pub subagent_title: Option<String>,
}

impl SessionState {
    pub fn new(root_span_id: String, effective_root_span_id: String, start_time: i64) -> Self {
        Self {
            root_span_id,
            effective_root_span_id,
            current_turn_span_id: None,
            turn_number: 0,
            tool_call_count: 0,
            start_time,
            current_input: None,
            current_output: None,
            model: None,
            llm_output_parts: HashMap::new(),
            llm_tool_calls: HashMap::new(),
            llm_reasoning_parts: HashMap::new(),
            processed_llm_messages: HashSet::new(),
            tool_start_times: HashMap::new(),
            tool_call_message_ids: HashMap::new(),
            parent_session_id: None,
            parent_turn_span_id: None,
            subagent_title: None,
        }
    }

    pub fn is_child(&self) -> bool {
        self.parent_session_id.is_some()
    }

    /// Insert or replace a streamed tool call, keyed by call id.
    pub fn upsert_tool_call(&mut self, message_id: &str, call: LlmToolCall) {
        let calls = self.llm_tool_calls.entry(message_id.to_string()).or_default();
        match calls.iter_mut().find(|existing| existing.id == call.id) {
            Some(existing) => *existing = call,
            None => calls.push(call),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_upsert_tool_call_replaces_by_id() {
        let mut state = SessionState::new("r".into(), "r".into(), 0);
        state.upsert_tool_call(
            "m1",
            LlmToolCall {
                id: "c1".into(),
                name: "read".into(),
                arguments: json!({"path": "/a"}),
            },
        );
        state.upsert_tool_call(
            "m1",
            LlmToolCall {
                id: "c1".into(),
                name: "read".into(),
                arguments: json!({"path": "/a/b"}),
            },
        );
        state.upsert_tool_call(
            "m1",
            LlmToolCall {
                id: "c2".into(),
                name: "bash".into(),
                arguments: json!({"command": "ls"}),
            },
        );

        let calls = &state.llm_tool_calls["m1"];
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].arguments, json!({"path": "/a/b"}));
        assert_eq!(calls[1].name, "bash");
    }
}
