//! Session event state machine.
//!
//! Owns one [`SessionState`] per live session and translates host lifecycle
//! events and hook calls into span records on a [`SpanSink`]. Message
//! content streams in partial fragments, so the processor accumulates text,
//! tool calls and reasoning per message id and only emits the LLM span once
//! the message is finalized.
//!
//! The processor never raises on malformed or out-of-order input: an
//! unknown session id, a tool call outside a turn, a duplicate completion
//! all degrade to a logged no-op. A failed sink write loses that span, not
//! the session.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value as JsonValue, json};

use crate::core::constants::{
    DEFAULT_ERROR_NAME, FILE_TOOLS, TITLE_MAX_CHARS, TOOL_OUTPUT_MAX_CHARS,
};
use crate::data::record::{SpanAttributes, SpanRecord, SpanType};
use crate::data::sink::SpanSink;
use crate::domain::events::{
    ChatMessage, HostMessage, MessageInfo, MessagePart, SessionErrorInfo, SessionInfo, ToolEnd,
    ToolStart,
};
use crate::domain::session::{LlmToolCall, SessionState};
use crate::domain::subagent;
use crate::utils::id::IdSource;
use crate::utils::string::{path_tail, truncate_chars};
use crate::utils::time::{Clock, millis};

// ============================================================================
// PROCESSOR
// ============================================================================

/// Per-session state machine turning host events into span records.
///
/// Sessions are owned by the processor instance, so independent processors
/// (one per test, say) cannot leak state into each other. Events are
/// delivered one at a time by the host; the only suspension point is the
/// sink insert.
pub struct EventProcessor {
    sessions: HashMap<String, SessionState>,
    sink: Arc<dyn SpanSink>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdSource>,
    project_name: String,
}

impl EventProcessor {
    pub fn new(
        sink: Arc<dyn SpanSink>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdSource>,
        project_name: impl Into<String>,
    ) -> Self {
        Self {
            sessions: HashMap::new(),
            sink,
            clock,
            ids,
            project_name: project_name.into(),
        }
    }

    /// Number of sessions currently tracked.
    pub fn live_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Dispatch one host message.
    pub async fn handle(&mut self, message: HostMessage) {
        match message {
            HostMessage::SessionCreated { session } => self.session_created(session).await,
            HostMessage::MessagePartUpdated { part } => self.message_part_updated(part),
            HostMessage::MessageUpdated { message } => self.message_updated(message).await,
            HostMessage::SessionIdle { session_id } => self.session_idle(&session_id).await,
            HostMessage::SessionDeleted { session_id } => self.session_deleted(&session_id).await,
            HostMessage::SessionError { session_id, error } => {
                self.session_error(session_id.as_deref(), error).await
            }
            HostMessage::ChatMessage(message) => self.chat_message(message).await,
            HostMessage::ToolExecuteBefore(start) => self.tool_execute_before(start),
            HostMessage::ToolExecuteAfter(end) => self.tool_execute_after(end).await,
            HostMessage::Ignored => {}
        }
    }

    // ========================================================================
    // SESSION LIFECYCLE
    // ========================================================================

    async fn session_created(&mut self, session: SessionInfo) {
        if self.sessions.contains_key(&session.id) {
            tracing::debug!(session_id = %session.id, "duplicate session.created, ignoring");
            return;
        }
        let now = self.clock.now();
        let root_span_id = self.ids.span_id();

        let record = if let Some(parent_id) = &session.parent_id {
            // Child (sub-agent) session: a parent must already exist.
            let (parent_effective_root, parent_turn) = match self.sessions.get(parent_id) {
                Some(parent) => (
                    parent.effective_root_span_id.clone(),
                    parent.current_turn_span_id.clone(),
                ),
                None => {
                    tracing::debug!(
                        session_id = %session.id,
                        parent_id = %parent_id,
                        "parent session unknown, dropping child session"
                    );
                    return;
                }
            };
            let title = match session.title.as_deref() {
                Some(title) if !title.is_empty() => subagent::display_title(title),
                _ => "subagent".to_string(),
            };

            let mut state =
                SessionState::new(root_span_id.clone(), parent_effective_root, millis(&now));
            state.parent_session_id = Some(parent_id.clone());
            state.parent_turn_span_id = parent_turn;
            state.subagent_title = Some(title.clone());

            let mut record = SpanRecord::new(
                &root_span_id,
                &state.effective_root_span_id,
                SpanAttributes {
                    name: title,
                    span_type: SpanType::Task,
                },
                now,
            );
            // Nest the sub-agent under the turn that spawned it.
            record.span_parents = state.parent_turn_span_id.iter().cloned().collect();
            record.metrics.start = Some(millis(&now));
            record
                .metadata
                .insert("session_id".to_string(), json!(session.id));
            record
                .metadata
                .insert("parent_session_id".to_string(), json!(parent_id));
            if let Some(directory) = &session.directory {
                record
                    .metadata
                    .insert("directory".to_string(), json!(directory));
            }
            self.sessions.insert(session.id.clone(), state);
            record
        } else {
            // Top-level session: its own trace root.
            let state =
                SessionState::new(root_span_id.clone(), root_span_id.clone(), millis(&now));
            let mut record = SpanRecord::new(
                &root_span_id,
                &root_span_id,
                SpanAttributes {
                    name: format!("{} session", self.project_name),
                    span_type: SpanType::Task,
                },
                now,
            );
            record.metrics.start = Some(millis(&now));
            record
                .metadata
                .insert("session_id".to_string(), json!(session.id));
            if let Some(title) = &session.title {
                record.metadata.insert("title".to_string(), json!(title));
            }
            if let Some(directory) = &session.directory {
                record
                    .metadata
                    .insert("directory".to_string(), json!(directory));
            }
            if let Some(version) = &session.version {
                record.metadata.insert("version".to_string(), json!(version));
            }
            self.sessions.insert(session.id.clone(), state);
            record
        };
        self.submit(record).await;
    }

    async fn session_idle(&mut self, session_id: &str) {
        let now = self.clock.now();
        let Some(state) = self.sessions.get_mut(session_id) else {
            tracing::debug!(session_id = %session_id, "session.idle for unknown session");
            return;
        };
        let mut records = Vec::with_capacity(2);
        if let Some(turn_span_id) = state.current_turn_span_id.take() {
            records.push(turn_close_record(state, &turn_span_id, &now, None));
        }
        state.current_input = None;
        if state.is_child() {
            // Child sessions never receive session.deleted; idle is their
            // only closure signal.
            records.push(root_close_record(state, &now, None, true));
            self.sessions.remove(session_id);
        }
        for record in records {
            self.submit(record).await;
        }
    }

    async fn session_deleted(&mut self, session_id: &str) {
        let now = self.clock.now();
        let Some(mut state) = self.sessions.remove(session_id) else {
            tracing::debug!(session_id = %session_id, "session.deleted for unknown session");
            return;
        };
        let mut records = Vec::with_capacity(2);
        if let Some(turn_span_id) = state.current_turn_span_id.take() {
            records.push(turn_close_record(&mut state, &turn_span_id, &now, None));
        }
        records.push(root_close_record(&state, &now, None, true));
        for record in records {
            self.submit(record).await;
        }
    }

    async fn session_error(&mut self, session_id: Option<&str>, error: Option<SessionErrorInfo>) {
        let Some(session_id) = session_id else {
            tracing::debug!("session.error without a session id");
            return;
        };
        let now = self.clock.now();
        let Some(mut state) = self.sessions.remove(session_id) else {
            tracing::debug!(session_id = %session_id, "session.error for unknown session");
            return;
        };
        let info = error.unwrap_or_default();
        let name = info
            .name
            .unwrap_or_else(|| DEFAULT_ERROR_NAME.to_string());
        let message = info.message.unwrap_or_else(|| name.clone());
        let formatted = format!("{}\n\ntype: {}", message, name);

        let mut records = Vec::with_capacity(2);
        if let Some(turn_span_id) = state.current_turn_span_id.take() {
            records.push(turn_close_record(
                &mut state,
                &turn_span_id,
                &now,
                Some(&formatted),
            ));
        }
        let mut root = root_close_record(&state, &now, Some(&formatted), false);
        root.metadata.insert("error_type".to_string(), json!(name));
        records.push(root);
        for record in records {
            self.submit(record).await;
        }
    }

    // ========================================================================
    // TURNS
    // ========================================================================

    async fn chat_message(&mut self, message: ChatMessage) {
        let now = self.clock.now();
        let Some(state) = self.sessions.get_mut(&message.session_id) else {
            tracing::debug!(session_id = %message.session_id, "chat message for unknown session");
            return;
        };
        let mut records = Vec::with_capacity(2);
        // No concurrent-turn model: a new user message always force-closes
        // the previous turn.
        if let Some(open_turn) = state.current_turn_span_id.take() {
            records.push(turn_close_record(state, &open_turn, &now, None));
        }

        let turn_span_id = self.ids.span_id();
        state.turn_number += 1;
        state.current_turn_span_id = Some(turn_span_id.clone());
        state.current_input = Some(message.text.clone());
        state.current_output = None;
        if message.model.is_some() {
            state.model = message.model;
        }

        let mut record = SpanRecord::new(
            &turn_span_id,
            &state.effective_root_span_id,
            SpanAttributes {
                name: format!("Turn {}", state.turn_number),
                span_type: SpanType::Task,
            },
            now,
        );
        record.span_parents = vec![state.root_span_id.clone()];
        record.input = Some(JsonValue::String(message.text));
        record.metrics.start = Some(millis(&now));
        if let Some(model) = &state.model {
            record.metadata.insert("model".to_string(), json!(model));
        }
        records.push(record);

        for record in records {
            self.submit(record).await;
        }
    }

    // ========================================================================
    // STREAMED MESSAGE CONTENT
    // ========================================================================

    fn message_part_updated(&mut self, part: MessagePart) {
        let Some(session_id) = part.session_id().map(str::to_string) else {
            return;
        };
        let Some(state) = self.sessions.get_mut(&session_id) else {
            tracing::debug!(session_id = %session_id, "message part for unknown session");
            return;
        };
        match part {
            MessagePart::Text(text) => {
                state
                    .llm_output_parts
                    .insert(text.message_id.clone(), text.text.clone());
                if text.done && state.current_turn_span_id.is_some() {
                    // Speculative turn output; later fragments overwrite it.
                    state.current_output = Some(text.text);
                }
            }
            MessagePart::ToolCall(call) => {
                state
                    .tool_call_message_ids
                    .insert(call.call_id.clone(), call.message_id.clone());
                state.upsert_tool_call(
                    &call.message_id,
                    LlmToolCall {
                        id: call.call_id,
                        name: call.tool,
                        arguments: call.arguments,
                    },
                );
            }
            MessagePart::Reasoning(reasoning) => {
                state
                    .llm_reasoning_parts
                    .insert(reasoning.message_id, reasoning.text);
            }
            MessagePart::Unknown => {}
        }
    }

    async fn message_updated(&mut self, message: MessageInfo) {
        let Some(state) = self.sessions.get_mut(&message.session_id) else {
            tracing::debug!(session_id = %message.session_id, "message.updated for unknown session");
            return;
        };
        if message.role != "assistant" {
            return;
        }
        let Some(completed) = message.time.completed else {
            return;
        };
        if state.processed_llm_messages.contains(&message.id) {
            tracing::debug!(message_id = %message.id, "duplicate completion, LLM span already emitted");
            return;
        }
        // An LLM span can only be a turn's child.
        let Some(turn_span_id) = state.current_turn_span_id.clone() else {
            tracing::debug!(message_id = %message.id, "assistant message completed outside a turn");
            return;
        };
        state.processed_llm_messages.insert(message.id.clone());

        let tokens = message.tokens.unwrap_or_default();
        let total_tokens = tokens.input + tokens.output + tokens.reasoning;
        let content = state
            .llm_output_parts
            .get(&message.id)
            .cloned()
            .unwrap_or_default();
        let tool_calls = state.llm_tool_calls.get(&message.id).cloned();
        let reasoning = state.llm_reasoning_parts.get(&message.id).cloned();

        let mut assistant = Map::new();
        assistant.insert("role".to_string(), json!("assistant"));
        assistant.insert("content".to_string(), json!(content));
        if let Some(calls) = tool_calls.filter(|calls| !calls.is_empty()) {
            assistant.insert(
                "tool_calls".to_string(),
                serde_json::to_value(calls).unwrap_or(JsonValue::Null),
            );
        }
        if let Some(reasoning) = reasoning.filter(|text| !text.is_empty()) {
            assistant.insert(
                "reasoning".to_string(),
                json!([{ "id": message.id, "content": reasoning }]),
            );
        }

        let input = state
            .current_input
            .as_ref()
            .map(|text| json!([{ "role": "user", "content": text }]));
        let name = message
            .model
            .clone()
            .or_else(|| state.model.clone())
            .unwrap_or_else(|| "llm".to_string());

        let span_id = self.ids.span_id();
        let mut record = SpanRecord::new(
            &span_id,
            &state.effective_root_span_id,
            SpanAttributes {
                name,
                span_type: SpanType::Llm,
            },
            self.clock.now(),
        );
        record.span_parents = vec![turn_span_id];
        record.input = input;
        record.output = Some(JsonValue::Array(vec![JsonValue::Object(assistant)]));
        // The message's own timestamps, not wall clock.
        record.metrics.start = Some(message.time.created.unwrap_or(completed));
        record.metrics.end = Some(completed);
        record.metrics.prompt_tokens = Some(tokens.input);
        record.metrics.completion_tokens = Some(tokens.output);
        record.metrics.tokens = Some(total_tokens);
        if let Some(model) = &message.model {
            record.metadata.insert("model".to_string(), json!(model));
        }
        if let Some(provider) = &message.provider {
            record
                .metadata
                .insert("provider".to_string(), json!(provider));
        }
        if tokens.reasoning > 0 {
            record
                .metadata
                .insert("reasoning_tokens".to_string(), json!(tokens.reasoning));
        }
        record
            .metadata
            .insert("message_id".to_string(), json!(message.id));
        self.submit(record).await;
    }

    // ========================================================================
    // TOOL EXECUTION
    // ========================================================================

    fn tool_execute_before(&mut self, start: ToolStart) {
        let now = millis(&self.clock.now());
        let Some(state) = self.sessions.get_mut(&start.session_id) else {
            tracing::debug!(session_id = %start.session_id, "tool start for unknown session");
            return;
        };
        state.tool_start_times.insert(start.call_id, now);
    }

    async fn tool_execute_after(&mut self, end: ToolEnd) {
        let now = self.clock.now();
        let Some(state) = self.sessions.get_mut(&end.session_id) else {
            tracing::debug!(session_id = %end.session_id, "tool end for unknown session");
            return;
        };
        // Every tool span belongs to an open turn; without one the call is
        // dropped, not queued.
        let Some(turn_span_id) = state.current_turn_span_id.clone() else {
            tracing::debug!(
                session_id = %end.session_id,
                tool = %end.tool,
                "tool finished outside a turn, dropping span"
            );
            return;
        };
        state.tool_call_count += 1;
        let start = state
            .tool_start_times
            .remove(&end.call_id)
            .unwrap_or_else(|| millis(&now));
        let reasoning = state
            .tool_call_message_ids
            .get(&end.call_id)
            .and_then(|message_id| state.llm_reasoning_parts.get(message_id))
            .cloned();

        let span_id = self.ids.span_id();
        let mut record = SpanRecord::new(
            &span_id,
            &state.effective_root_span_id,
            SpanAttributes {
                name: tool_display_name(&end.tool, &end.title),
                span_type: SpanType::Tool,
            },
            now,
        );
        record.span_parents = vec![turn_span_id];
        if !end.arguments.is_null() {
            record.input = Some(end.arguments);
        }
        record.output = Some(JsonValue::String(truncate_chars(
            &end.output,
            TOOL_OUTPUT_MAX_CHARS,
        )));
        record.metrics.start = Some(start);
        record.metrics.end = Some(millis(&now));
        record.metadata.insert("tool".to_string(), json!(end.tool));
        record
            .metadata
            .insert("call_id".to_string(), json!(end.call_id));
        if let Some(reasoning) = reasoning {
            record
                .metadata
                .insert("reasoning".to_string(), json!(reasoning));
        }
        self.submit(record).await;
    }

    // ========================================================================
    // PERSISTENCE
    // ========================================================================

    /// Best-effort persistence: a failed write loses the span, never the
    /// session state.
    async fn submit(&self, record: SpanRecord) {
        let span_id = record.span_id.clone();
        if let Err(error) = self.sink.insert_span(record).await {
            tracing::warn!(span_id = %span_id, error = %error, "failed to persist span");
        }
    }
}

// ============================================================================
// RECORD BUILDERS
// ============================================================================

/// Merge record closing an open turn span.
fn turn_close_record(
    state: &mut SessionState,
    turn_span_id: &str,
    now: &DateTime<Utc>,
    error: Option<&str>,
) -> SpanRecord {
    let mut record = SpanRecord::merge(turn_span_id, &state.effective_root_span_id, *now);
    record.output = state.current_output.take().map(JsonValue::String);
    record.metrics.end = Some(millis(now));
    if let Some(error) = error {
        record.error = Some(error.to_string());
    }
    record
}

/// Merge record closing a session's root span.
fn root_close_record(
    state: &SessionState,
    now: &DateTime<Utc>,
    error: Option<&str>,
    with_totals: bool,
) -> SpanRecord {
    let mut record = SpanRecord::merge(&state.root_span_id, &state.effective_root_span_id, *now);
    let end = millis(now);
    record.metrics.end = Some(end);
    record.metadata.insert(
        "duration_ms".to_string(),
        json!(end.saturating_sub(state.start_time)),
    );
    if with_totals {
        record
            .metadata
            .insert("total_turns".to_string(), json!(state.turn_number));
        record
            .metadata
            .insert("total_tool_calls".to_string(), json!(state.tool_call_count));
    }
    if let Some(title) = &state.subagent_title {
        record
            .metadata
            .insert("subagent".to_string(), json!(title));
    }
    if let Some(error) = error {
        record.error = Some(error.to_string());
    }
    record
}

/// Derive a tool span name from the tool and its display title.
///
/// File tools commonly use the full path as the title; only the final
/// segment is shown. Long titles are cut at [`TITLE_MAX_CHARS`].
fn tool_display_name(tool: &str, title: &str) -> String {
    let title = title.trim();
    if title.is_empty() {
        return tool.to_string();
    }
    let title = if FILE_TOOLS.contains(&tool) && title.contains('/') {
        path_tail(title)
    } else {
        title
    };
    format!("{}: {}", tool, truncate_chars(title, TITLE_MAX_CHARS))
}
