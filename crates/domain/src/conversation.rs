//! Conversation header and the assistant parameters a turn runs with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-conversation assistant settings, resolved by the caller before a
/// turn starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantParams {
    pub assistant_id: String,
    #[serde(default)]
    pub system_prompt: String,
    /// "provider_id/model_name"; `None` uses the `executor` role.
    #[serde(default)]
    pub model: Option<String>,
    /// Prompt budget in tokens; `None` uses `chat.default_token_limit`.
    #[serde(default)]
    pub token_limit: Option<usize>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub owner_id: String,
    #[serde(default)]
    pub name: String,
    pub assistant: AssistantParams,
    /// Leaf to reply from on the next send; cleared once read.
    #[serde(default)]
    pub target_leaf: Option<String>,
    #[serde(default)]
    pub last_msg_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(owner_id: impl Into<String>, name: impl Into<String>, assistant: AssistantParams) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            name: name.into(),
            assistant,
            target_leaf: None,
            last_msg_sent_at: None,
            created_at: Utc::now(),
        }
    }
}
