//! Conversation message model.
//!
//! A [`Message`] is a common header (id, parent pointer, owning
//! conversation, timestamp) plus a [`MessageBody`] tagged by `role`.
//! Assistant and tool messages carry an ordered list of typed
//! [`MessagePart`]s; which parts are legal depends on the role and is
//! checked by [`MessagePart::is_legal_for`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::tool::{ToolCall, ToolCallResult};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Message
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    /// Id of the preceding message, `None` for a thread root.
    #[serde(default)]
    pub parent: Option<String>,
    pub sent_at: DateTime<Utc>,
    #[serde(flatten)]
    pub body: MessageBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "kebab-case")]
pub enum MessageBody {
    User {
        content: String,
        #[serde(default)]
        attachments: Vec<Attachment>,
    },
    Assistant {
        parts: Vec<MessagePart>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        citations: Option<Vec<Citation>>,
        #[serde(
            rename = "confirmRequest",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        confirm_request: Option<ConfirmRequest>,
    },
    Tool {
        parts: Vec<MessagePart>,
        #[serde(default)]
        attachments: Vec<Attachment>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        citations: Option<Vec<Citation>>,
    },
    ToolAuthRequest {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        #[serde(rename = "toolName")]
        tool_name: String,
        args: serde_json::Value,
    },
    ToolAuthResponse {
        allow: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    User,
    Assistant,
    Tool,
    ToolAuthRequest,
    ToolAuthResponse,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
            Role::ToolAuthRequest => "tool-auth-request",
            Role::ToolAuthResponse => "tool-auth-response",
        };
        f.write_str(s)
    }
}

impl Message {
    /// A new user message stamped with a fresh id and the current time.
    pub fn user(
        conversation_id: impl Into<String>,
        parent: Option<String>,
        content: impl Into<String>,
        attachments: Vec<Attachment>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation_id.into(),
            parent,
            sent_at: Utc::now(),
            body: MessageBody::User {
                content: content.into(),
                attachments,
            },
        }
    }

    pub fn role(&self) -> Role {
        match &self.body {
            MessageBody::User { .. } => Role::User,
            MessageBody::Assistant { .. } => Role::Assistant,
            MessageBody::Tool { .. } => Role::Tool,
            MessageBody::ToolAuthRequest { .. } => Role::ToolAuthRequest,
            MessageBody::ToolAuthResponse { .. } => Role::ToolAuthResponse,
        }
    }

    /// Parts of an assistant or tool message; empty for other roles.
    pub fn parts(&self) -> &[MessagePart] {
        match &self.body {
            MessageBody::Assistant { parts, .. } | MessageBody::Tool { parts, .. } => parts,
            _ => &[],
        }
    }

    /// Concatenated `text` parts of an assistant message, or the content
    /// of a user message.
    pub fn text(&self) -> String {
        match &self.body {
            MessageBody::User { content, .. } => content.clone(),
            _ => self
                .parts()
                .iter()
                .filter_map(|p| match p {
                    MessagePart::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
        }
    }

    /// The string whose token count represents this message in the
    /// model context.
    pub fn prompt_text(&self) -> String {
        match &self.body {
            MessageBody::User { content, .. } => content.clone(),
            MessageBody::Assistant { parts, .. } => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        MessagePart::Text { text } => out.push_str(text),
                        MessagePart::ToolCall(call) => {
                            out.push_str(&call.tool_name);
                            out.push_str(&call.args.to_string());
                        }
                        _ => {}
                    }
                }
                out
            }
            MessageBody::Tool { parts, .. } => parts
                .iter()
                .filter_map(|p| match p {
                    MessagePart::ToolResult(r) => Some(r.result.to_prompt_string()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
            MessageBody::ToolAuthRequest { tool_name, args, .. } => {
                format!("{tool_name}{args}")
            }
            MessageBody::ToolAuthResponse { .. } => String::new(),
        }
    }

    /// Whether this message only exists to drive the confirmation flow
    /// and is never sent to the model.
    pub fn is_tool_auth(&self) -> bool {
        matches!(self.role(), Role::ToolAuthRequest | Role::ToolAuthResponse)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Parts
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MessagePart {
    Text {
        text: String,
    },
    Reasoning {
        reasoning: String,
        #[serde(
            rename = "reasoningSignature",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        reasoning_signature: Option<String>,
    },
    ToolCall(ToolCall),
    BuiltinToolCall(ToolCall),
    BuiltinToolResult(BuiltinToolResult),
    ToolResult(ToolCallResult),
    Error {
        error: String,
    },
    Debug {
        #[serde(rename = "displayMessage")]
        display_message: String,
        #[serde(default)]
        data: Vec<serde_json::Value>,
    },
}

/// The result of a tool executed by the model backend itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuiltinToolResult {
    pub tool_call_id: String,
    pub tool_name: String,
    pub result: serde_json::Value,
}

/// Discriminant of a [`MessagePart`], used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartKind {
    Text,
    Reasoning,
    ToolCall,
    BuiltinToolCall,
    BuiltinToolResult,
    ToolResult,
    Error,
    Debug,
}

impl fmt::Display for PartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PartKind::Text => "text",
            PartKind::Reasoning => "reasoning",
            PartKind::ToolCall => "tool-call",
            PartKind::BuiltinToolCall => "builtin-tool-call",
            PartKind::BuiltinToolResult => "builtin-tool-result",
            PartKind::ToolResult => "tool-result",
            PartKind::Error => "error",
            PartKind::Debug => "debug",
        };
        f.write_str(s)
    }
}

impl MessagePart {
    pub fn text(text: impl Into<String>) -> Self {
        MessagePart::Text { text: text.into() }
    }

    pub fn reasoning(reasoning: impl Into<String>) -> Self {
        MessagePart::Reasoning {
            reasoning: reasoning.into(),
            reasoning_signature: None,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        MessagePart::Error { error: error.into() }
    }

    pub fn kind(&self) -> PartKind {
        match self {
            MessagePart::Text { .. } => PartKind::Text,
            MessagePart::Reasoning { .. } => PartKind::Reasoning,
            MessagePart::ToolCall(_) => PartKind::ToolCall,
            MessagePart::BuiltinToolCall(_) => PartKind::BuiltinToolCall,
            MessagePart::BuiltinToolResult(_) => PartKind::BuiltinToolResult,
            MessagePart::ToolResult(_) => PartKind::ToolResult,
            MessagePart::Error { .. } => PartKind::Error,
            MessagePart::Debug { .. } => PartKind::Debug,
        }
    }

    /// Whether a part of this kind may be appended to a message of `role`.
    pub fn is_legal_for(&self, role: Role) -> bool {
        match role {
            Role::Assistant => match self.kind() {
                PartKind::Text
                | PartKind::Reasoning
                | PartKind::ToolCall
                | PartKind::BuiltinToolCall
                | PartKind::BuiltinToolResult
                | PartKind::Error
                | PartKind::Debug => true,
                PartKind::ToolResult => false,
            },
            Role::Tool => matches!(self.kind(), PartKind::ToolResult | PartKind::Debug),
            Role::User | Role::ToolAuthRequest | Role::ToolAuthResponse => false,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Attachments, citations, confirmation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Reference to a stored file. The bytes live elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub mimetype: String,
    pub name: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Citation {
    Url(String),
    Rich {
        title: String,
        summary: String,
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        favicon: Option<String>,
    },
}

/// A pending request for the user to authorize a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    pub tool_call_id: String,
    pub tool_name: String,
    pub tool_args: serde_json::Value,
}

impl From<&ToolCall> for ConfirmRequest {
    fn from(call: &ToolCall) -> Self {
        Self {
            tool_call_id: call.tool_call_id.clone(),
            tool_name: call.tool_name.clone(),
            tool_args: call.args.clone(),
        }
    }
}

impl From<ConfirmRequest> for ToolCall {
    fn from(req: ConfirmRequest) -> Self {
        Self {
            tool_call_id: req.tool_call_id,
            tool_name: req.tool_name,
            args: req.tool_args,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolResultOutput;

    fn header(body: MessageBody) -> Message {
        Message {
            id: "m1".into(),
            conversation_id: "c1".into(),
            parent: None,
            sent_at: Utc::now(),
            body,
        }
    }

    #[test]
    fn user_message_serializes_with_role_tag() {
        let msg = header(MessageBody::User {
            content: "Hi".into(),
            attachments: vec![],
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["conversationId"], "c1");
        assert_eq!(json["content"], "Hi");
    }

    #[test]
    fn assistant_message_roundtrips_through_json() {
        let msg = header(MessageBody::Assistant {
            parts: vec![
                MessagePart::text("hello"),
                MessagePart::ToolCall(ToolCall {
                    tool_call_id: "t1".into(),
                    tool_name: "clock".into(),
                    args: serde_json::json!({}),
                }),
            ],
            citations: Some(vec![Citation::Url("https://example.com".into())]),
            confirm_request: None,
        });
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"tool-call""#));
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn tool_auth_request_uses_camel_case() {
        let msg = header(MessageBody::ToolAuthRequest {
            tool_call_id: "t1".into(),
            tool_name: "delete".into(),
            args: serde_json::json!({"path": "/"}),
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "tool-auth-request");
        assert_eq!(json["toolCallId"], "t1");
        assert!(msg.is_tool_auth());
    }

    #[test]
    fn part_legality_follows_role() {
        let result = MessagePart::ToolResult(ToolCallResult {
            tool_call_id: "t".into(),
            tool_name: "x".into(),
            result: ToolResultOutput::Text { value: "ok".into() },
        });
        assert!(result.is_legal_for(Role::Tool));
        assert!(!result.is_legal_for(Role::Assistant));
        assert!(MessagePart::text("a").is_legal_for(Role::Assistant));
        assert!(!MessagePart::text("a").is_legal_for(Role::Tool));
        assert!(MessagePart::Debug { display_message: "d".into(), data: vec![] }
            .is_legal_for(Role::Tool));
        assert!(!MessagePart::error("e").is_legal_for(Role::User));
    }

    #[test]
    fn text_concatenates_only_text_parts() {
        let msg = header(MessageBody::Assistant {
            parts: vec![
                MessagePart::reasoning("thinking"),
                MessagePart::text("a"),
                MessagePart::error("x"),
                MessagePart::text("b"),
            ],
            citations: None,
            confirm_request: None,
        });
        assert_eq!(msg.text(), "ab");
    }

    #[test]
    fn rich_citation_is_untagged() {
        let c: Citation = serde_json::from_str(
            r#"{"title":"T","summary":"S","url":"https://x"}"#,
        )
        .unwrap();
        assert!(matches!(c, Citation::Rich { ref favicon, .. } if favicon.is_none()));
        let u: Citation = serde_json::from_str(r#""https://y""#).unwrap();
        assert_eq!(u, Citation::Url("https://y".into()));
    }
}
