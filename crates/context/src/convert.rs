use std::collections::HashSet;

use lc_domain::message::{Message, MessageBody, MessagePart};
use lc_domain::prompt::{PromptContent, PromptMessage, PromptPart, PromptRole};

/// Convert a linear thread into model input.
///
/// Confirmation bookkeeping (`tool-auth-*`) is dropped, as are parts the
/// model never sees (reasoning, errors, debug). Tool calls without a
/// matching result, and results without a matching call, are removed so
/// the backend never receives an unpaired tool exchange.
pub fn to_prompt_messages(messages: &[Message]) -> Vec<PromptMessage> {
    let mut call_ids: HashSet<&str> = HashSet::new();
    let mut result_ids: HashSet<&str> = HashSet::new();
    for message in messages {
        for part in message.parts() {
            match part {
                MessagePart::ToolCall(call) => {
                    call_ids.insert(call.tool_call_id.as_str());
                }
                MessagePart::ToolResult(result) => {
                    result_ids.insert(result.tool_call_id.as_str());
                }
                _ => {}
            }
        }
    }

    let mut out = Vec::with_capacity(messages.len());
    for message in messages {
        match &message.body {
            MessageBody::User { content, attachments } => {
                if attachments.is_empty() {
                    out.push(PromptMessage::user(content.clone()));
                } else {
                    let mut text = content.clone();
                    for a in attachments {
                        text.push_str(&format!("\n[attachment: {} ({}, id {})]", a.name, a.mimetype, a.id));
                    }
                    out.push(PromptMessage::user(text));
                }
            }
            MessageBody::Assistant { parts, .. } => {
                let mut text = String::new();
                let mut uses = Vec::new();
                for part in parts {
                    match part {
                        MessagePart::Text { text: t } => text.push_str(t),
                        MessagePart::ToolCall(call) if result_ids.contains(call.tool_call_id.as_str()) => {
                            uses.push(PromptPart::ToolUse {
                                id: call.tool_call_id.clone(),
                                name: call.tool_name.clone(),
                                input: call.args.clone(),
                            });
                        }
                        _ => {}
                    }
                }
                if uses.is_empty() {
                    if !text.is_empty() {
                        out.push(PromptMessage::assistant(text));
                    }
                } else {
                    let mut content = Vec::with_capacity(uses.len() + 1);
                    if !text.is_empty() {
                        content.push(PromptPart::Text { text });
                    }
                    content.extend(uses);
                    out.push(PromptMessage {
                        role: PromptRole::Assistant,
                        content: PromptContent::Parts(content),
                    });
                }
            }
            MessageBody::Tool { parts, .. } => {
                for part in parts {
                    if let MessagePart::ToolResult(r) = part {
                        if call_ids.contains(r.tool_call_id.as_str()) {
                            out.push(PromptMessage::tool_result(
                                r.tool_call_id.clone(),
                                r.result.to_prompt_string(),
                                r.result.is_error(),
                            ));
                        }
                    }
                }
            }
            MessageBody::ToolAuthRequest { .. } | MessageBody::ToolAuthResponse { .. } => {}
        }
    }
    out
}
