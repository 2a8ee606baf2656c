//! Typed host event feed.
//!
//! The host delivers session lifecycle events and hook calls as JSON
//! objects tagged by `type`. Lifecycle kinds keep the host's exact casing
//! (`session.created`, `message.part.updated`, ...). Kinds this processor
//! does not consume decode to [`HostMessage::Ignored`] so one unexpected
//! line never breaks the feed.

use serde::Deserialize;
use serde_json::Value as JsonValue;

/// One message from the host: a lifecycle event or a hook call.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum HostMessage {
    #[serde(rename = "session.created")]
    SessionCreated { session: SessionInfo },
    #[serde(rename = "message.part.updated")]
    MessagePartUpdated { part: MessagePart },
    #[serde(rename = "message.updated")]
    MessageUpdated { message: MessageInfo },
    #[serde(rename = "session.idle")]
    SessionIdle { session_id: String },
    #[serde(rename = "session.deleted")]
    SessionDeleted { session_id: String },
    #[serde(rename = "session.error")]
    SessionError {
        #[serde(default)]
        session_id: Option<String>,
        #[serde(default)]
        error: Option<SessionErrorInfo>,
    },
    /// Chat hook: the user sent a message.
    #[serde(rename = "chat.message")]
    ChatMessage(ChatMessage),
    /// Tool hook, fired before the tool runs.
    #[serde(rename = "tool.execute.before")]
    ToolExecuteBefore(ToolStart),
    /// Tool hook, fired after the tool finished.
    #[serde(rename = "tool.execute.after")]
    ToolExecuteAfter(ToolEnd),
    #[serde(other)]
    Ignored,
}

/// Session identity and workspace context from `session.created`.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionInfo {
    pub id: String,
    /// Present for child (sub-agent) sessions.
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub directory: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// Streamed fragment of an in-progress assistant message.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessagePart {
    Text(TextPart),
    ToolCall(ToolCallPart),
    Reasoning(ReasoningPart),
    #[serde(other)]
    Unknown,
}

impl MessagePart {
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::Text(part) => Some(&part.session_id),
            Self::ToolCall(part) => Some(&part.session_id),
            Self::Reasoning(part) => Some(&part.session_id),
            Self::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextPart {
    pub session_id: String,
    pub message_id: String,
    /// Accumulated text so far; each fragment carries the latest snapshot.
    #[serde(default)]
    pub text: String,
    /// End-of-stream marker.
    #[serde(default)]
    pub done: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallPart {
    pub session_id: String,
    pub message_id: String,
    pub call_id: String,
    pub tool: String,
    #[serde(default)]
    pub arguments: JsonValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReasoningPart {
    pub session_id: String,
    pub message_id: String,
    #[serde(default)]
    pub text: String,
}

/// Finalized assistant message from `message.updated`.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageInfo {
    pub id: String,
    pub session_id: String,
    pub role: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub time: MessageTime,
    #[serde(default)]
    pub tokens: Option<TokenUsage>,
}

/// The message's own timestamps (epoch millis), distinct from wall clock.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct MessageTime {
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub completed: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub input: u64,
    #[serde(default)]
    pub output: u64,
    #[serde(default)]
    pub reasoning: u64,
}

/// Error payload of `session.error`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionErrorInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// "User sent a message" hook payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    pub session_id: String,
    pub text: String,
    #[serde(default)]
    pub model: Option<String>,
}

/// "Tool executed" hook, before half.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolStart {
    pub session_id: String,
    pub call_id: String,
    pub tool: String,
}

/// "Tool executed" hook, after half.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolEnd {
    pub session_id: String,
    pub call_id: String,
    pub tool: String,
    /// Display title supplied by the host, often a file path for file tools.
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub arguments: JsonValue,
    #[serde(default)]
    pub output: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_session_created() {
        let message: HostMessage = serde_json::from_str(
            r#"{"type":"session.created","session":{"id":"s1","title":"hello","directory":"/w"}}"#,
        )
        .unwrap();
        match message {
            HostMessage::SessionCreated { session } => {
                assert_eq!(session.id, "s1");
                assert_eq!(session.parent_id, None);
                assert_eq!(session.title.as_deref(), Some("hello"));
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_decode_text_part() {
        let message: HostMessage = serde_json::from_str(
            r#"{"type":"message.part.updated","part":{"kind":"text","session_id":"s1","message_id":"m1","text":"Hi","done":true}}"#,
        )
        .unwrap();
        match message {
            HostMessage::MessagePartUpdated {
                part: MessagePart::Text(part),
            } => {
                assert_eq!(part.text, "Hi");
                assert!(part.done);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_decode_unknown_event_kind() {
        let message: HostMessage =
            serde_json::from_str(r#"{"type":"storage.write","key":"x"}"#).unwrap();
        assert!(matches!(message, HostMessage::Ignored));
    }

    #[test]
    fn test_decode_unknown_part_kind() {
        let message: HostMessage = serde_json::from_str(
            r#"{"type":"message.part.updated","part":{"kind":"step_start","session_id":"s1"}}"#,
        )
        .unwrap();
        match message {
            HostMessage::MessagePartUpdated { part } => {
                assert!(matches!(part, MessagePart::Unknown));
                assert_eq!(part.session_id(), None);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_decode_session_error_without_payload() {
        let message: HostMessage =
            serde_json::from_str(r#"{"type":"session.error"}"#).unwrap();
        match message {
            HostMessage::SessionError { session_id, error } => {
                assert_eq!(session_id, None);
                assert!(error.is_none());
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }
}
