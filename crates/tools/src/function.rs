use lc_domain::message::Message;
use lc_domain::tool::ToolDefinition;

use crate::ui_link::ToolUiLink;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    #[error("invalid arguments for {tool}: {message}")]
    InvalidArgs { tool: String, message: String },

    #[error("{tool} failed: {message}")]
    Failed { tool: String, message: String },
}

impl ToolError {
    pub fn failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        ToolError::Failed { tool: tool.into(), message: message.into() }
    }
}

/// Everything a tool sees when it is invoked.
pub struct ToolInvocation<'a> {
    /// The thread up to and including the assistant message that
    /// requested the call.
    pub messages: &'a [Message],
    pub assistant_id: &'a str,
    pub tool_call_id: &'a str,
    pub args: &'a serde_json::Value,
    /// Side channel for debug output and produced files.
    pub ui: &'a ToolUiLink,
}

/// A function the model can call.
///
/// Implementations must be cheap to share; one instance serves every
/// conversation concurrently.
#[async_trait::async_trait]
pub trait ToolFunction: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the accepted arguments.
    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    /// When true the orchestrator asks the user before every call and
    /// never invokes the tool on its own.
    fn require_confirm(&self) -> bool {
        false
    }

    async fn invoke(&self, call: ToolInvocation<'_>) -> Result<String, ToolError>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}
