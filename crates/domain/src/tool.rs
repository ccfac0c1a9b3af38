use serde::{Deserialize, Serialize};

use crate::message::Attachment;

/// A tool call requested by the model (provider-agnostic).
///
/// Every adapter converts provider-specific tool calls to/from this, and
/// the same shape is stored verbatim in `tool-call` message parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    pub tool_call_id: String,
    pub tool_name: String,
    pub args: serde_json::Value,
}

/// Tool definition exposed to the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool's parameters.
    pub parameters: serde_json::Value,
}

/// The outcome of a tool call, as stored in a `tool-result` part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    pub tool_call_id: String,
    pub tool_name: String,
    pub result: ToolResultOutput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ToolResultOutput {
    Text { value: String },
    Json { value: serde_json::Value },
    ErrorText { value: String },
    Content { value: Vec<ContentItem> },
}

/// One entry of a rich (`content`) tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentItem {
    Text { text: String },
    File(Attachment),
}

impl ToolResultOutput {
    /// Render the output as the plain string fed back to the model.
    pub fn to_prompt_string(&self) -> String {
        match self {
            ToolResultOutput::Text { value } | ToolResultOutput::ErrorText { value } => {
                value.clone()
            }
            ToolResultOutput::Json { value } => value.to_string(),
            ToolResultOutput::Content { value } => value
                .iter()
                .map(|item| match item {
                    ContentItem::Text { text } => text.clone(),
                    ContentItem::File(a) => format!("[file: {} ({})]", a.name, a.mimetype),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolResultOutput::ErrorText { .. })
    }

    /// Files carried by a `content` result.
    pub fn files(&self) -> impl Iterator<Item = &Attachment> {
        let items: &[ContentItem] = match self {
            ToolResultOutput::Content { value } => value,
            _ => &[],
        };
        items.iter().filter_map(|item| match item {
            ContentItem::File(a) => Some(a),
            ContentItem::Text { .. } => None,
        })
    }
}
