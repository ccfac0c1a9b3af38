//! In-memory state of one in-flight turn.
//!
//! [`ChatState`] holds the ordered message list of the active thread and
//! applies [`StreamPart`]s to it exactly the way a client renderer does,
//! so the server-side copy that gets persisted mirrors what was streamed.

use chrono::Utc;

use crate::message::{Message, MessageBody, MessagePart, PartKind, Role};
use crate::stream_part::StreamPart;
use crate::tool::ToolCall;

/// A stream part that cannot be applied to the current state.
///
/// These indicate a programming or data-integrity fault, never a user
/// error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamPartError {
    #[error("no open message to apply `{0}` to")]
    NoOpenMessage(&'static str),

    #[error("part `{part}` is not legal for a {role} message")]
    IllegalPart { role: Role, part: PartKind },

    #[error("`{delta}` delta without a matching open part")]
    DeltaWithoutPart { delta: PartKind },

    #[error("`{event}` is not valid for a {role} message")]
    WrongRole { event: &'static str, role: Role },
}

#[derive(Debug, Clone)]
pub struct ChatState {
    conversation_id: String,
    messages: Vec<Message>,
}

impl ChatState {
    pub fn new(conversation_id: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            messages,
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    // ── Factories ──────────────────────────────────────────────────

    fn stamp(&self, body: MessageBody) -> Message {
        Message {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: self.conversation_id.clone(),
            parent: self.messages.last().map(|m| m.id.clone()),
            sent_at: Utc::now(),
            body,
        }
    }

    pub fn create_empty_assistant_message(&self) -> Message {
        self.stamp(MessageBody::Assistant {
            parts: Vec::new(),
            citations: None,
            confirm_request: None,
        })
    }

    pub fn create_tool_message(&self) -> Message {
        self.stamp(MessageBody::Tool {
            parts: Vec::new(),
            attachments: Vec::new(),
            citations: None,
        })
    }

    pub fn create_tool_auth_request_message(&self, call: &ToolCall) -> Message {
        self.stamp(MessageBody::ToolAuthRequest {
            tool_call_id: call.tool_call_id.clone(),
            tool_name: call.tool_name.clone(),
            args: call.args.clone(),
        })
    }

    pub fn create_tool_auth_response_message(&self, allow: bool) -> Message {
        self.stamp(MessageBody::ToolAuthResponse { allow })
    }

    // ── Stream application ─────────────────────────────────────────

    pub fn apply_stream_part(&mut self, part: &StreamPart) -> Result<(), StreamPartError> {
        if let StreamPart::Message { content } = part {
            self.messages.push(content.clone());
            return Ok(());
        }
        if let StreamPart::Summary { .. } = part {
            return Ok(());
        }
        let last = self
            .messages
            .last_mut()
            .ok_or(StreamPartError::NoOpenMessage(part.kind()))?;
        apply_to_message(last, part)
    }
}

/// Apply a non-structural stream part to a single message.
pub fn apply_to_message(message: &mut Message, part: &StreamPart) -> Result<(), StreamPartError> {
    let role = message.role();
    match part {
        StreamPart::Message { .. } | StreamPart::Summary { .. } => Ok(()),

        StreamPart::Part { part } => {
            if !part.is_legal_for(role) {
                return Err(StreamPartError::IllegalPart { role, part: part.kind() });
            }
            match &mut message.body {
                MessageBody::Assistant { parts, .. } => parts.push(part.clone()),
                MessageBody::Tool { parts, attachments, .. } => {
                    if let MessagePart::ToolResult(result) = part {
                        attachments.extend(result.result.files().cloned());
                    }
                    parts.push(part.clone());
                }
                _ => return Err(StreamPartError::IllegalPart { role, part: part.kind() }),
            }
            Ok(())
        }

        StreamPart::Text { text } => match last_part_mut(message) {
            Some(MessagePart::Text { text: existing }) => {
                existing.push_str(text);
                Ok(())
            }
            _ => Err(StreamPartError::DeltaWithoutPart { delta: PartKind::Text }),
        },

        StreamPart::Reasoning { reasoning } => match last_part_mut(message) {
            Some(MessagePart::Reasoning { reasoning: existing, .. }) => {
                existing.push_str(reasoning);
                Ok(())
            }
            _ => Err(StreamPartError::DeltaWithoutPart { delta: PartKind::Reasoning }),
        },

        StreamPart::Citations { citations: new } => match &mut message.body {
            MessageBody::Assistant { citations, .. } | MessageBody::Tool { citations, .. } => {
                citations.get_or_insert_with(Vec::new).extend(new.iter().cloned());
                Ok(())
            }
            _ => Err(StreamPartError::WrongRole { event: "citations", role }),
        },

        StreamPart::Attachment { content } => match &mut message.body {
            MessageBody::User { attachments, .. } => {
                attachments.push(content.clone());
                Ok(())
            }
            _ => Err(StreamPartError::WrongRole { event: "attachment", role }),
        },

        StreamPart::ConfirmRequest { content } => match &mut message.body {
            MessageBody::Assistant { confirm_request, .. } => {
                *confirm_request = Some(content.clone());
                Ok(())
            }
            _ => Err(StreamPartError::WrongRole { event: "confirmRequest", role }),
        },
    }
}

fn last_part_mut(message: &mut Message) -> Option<&mut MessagePart> {
    match &mut message.body {
        MessageBody::Assistant { parts, .. } | MessageBody::Tool { parts, .. } => parts.last_mut(),
        _ => None,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
