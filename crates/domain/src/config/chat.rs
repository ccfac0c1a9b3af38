use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Chat engine
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Upper bound on model calls within one turn (each tool round
    /// trip costs one).
    #[serde(default = "d_10")]
    pub max_tool_loops: usize,
    /// Token budget used when a conversation's assistant has none.
    #[serde(default = "d_8000")]
    pub default_token_limit: usize,
    /// Capacity of the per-turn frame channel.
    #[serde(default = "d_64")]
    pub event_buffer: usize,
    #[serde(default)]
    pub auto_summary: AutoSummaryConfig,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_tool_loops: 10,
            default_token_limit: 8000,
            event_buffer: 64,
            auto_summary: AutoSummaryConfig::default(),
        }
    }
}

/// Title generation after the first exchange of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoSummaryConfig {
    #[serde(default = "d_true")]
    pub enabled: bool,
    /// Each message is cropped to this many characters before being
    /// sent to the summarizer.
    #[serde(default = "d_300")]
    pub max_chars: usize,
}

impl Default for AutoSummaryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_chars: 300,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_10() -> usize {
    10
}
fn d_8000() -> usize {
    8000
}
fn d_64() -> usize {
    64
}
fn d_true() -> bool {
    true
}
fn d_300() -> usize {
    300
}
