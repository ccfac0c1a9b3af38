use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool catalog wiring
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Built-in tools available to every assistant.
    #[serde(default = "d_enabled")]
    pub enabled: Vec<String>,
    /// Tool names that must be confirmed by the user before each call,
    /// regardless of the tool's own default.
    #[serde(default)]
    pub require_confirm: Vec<String>,
    /// Extra tools per assistant id.
    #[serde(default)]
    pub assistants: HashMap<String, AssistantToolsConfig>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            enabled: d_enabled(),
            require_confirm: Vec::new(),
            assistants: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AssistantToolsConfig {
    #[serde(default)]
    pub tools: Vec<String>,
}

fn d_enabled() -> Vec<String> {
    vec!["current_time".into()]
}
