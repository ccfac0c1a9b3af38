use serde::Serialize;

/// Structured lifecycle events of a chat turn.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    TurnStarted {
        conversation_id: String,
        assistant_id: String,
        history_len: usize,
        trimmed_len: usize,
        prompt_tokens: usize,
    },
    LlmRequest {
        provider: String,
        model: String,
        streaming: bool,
        duration_ms: u64,
        prompt_tokens: Option<u32>,
        completion_tokens: Option<u32>,
    },
    ToolInvoked {
        conversation_id: String,
        tool_name: String,
        duration_ms: u64,
        ok: bool,
    },
    ConfirmationRequested {
        conversation_id: String,
        tool_name: String,
        tool_call_id: String,
    },
    MessagePersisted {
        conversation_id: String,
        message_id: String,
        role: String,
    },
    SummaryGenerated {
        conversation_id: String,
        title: String,
    },
    ClientGone {
        conversation_id: String,
        dropped_frame: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(target: "lc.trace", trace_event = %json, "lc_event");
    }
}
