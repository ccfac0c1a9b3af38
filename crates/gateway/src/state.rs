use std::sync::Arc;

use lc_context::Tokenizer;
use lc_domain::config::Config;
use lc_domain::conversation::AssistantParams;
use lc_domain::error::{Error, Result};
use lc_providers::ProviderRegistry;
use lc_store::{ConversationStore, MessageStore};
use lc_tools::ToolRegistry;

use crate::runtime::{ChatAssistant, ChatOptions, ConversationLockMap};

/// Role used for chat turns when a conversation names no model.
pub const EXECUTOR_ROLE: &str = "executor";
/// Role used for conversation titles; falls back to the executor.
pub const SUMMARIZER_ROLE: &str = "summarizer";

/// Shared application state passed to all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub llm: Arc<ProviderRegistry>,
    pub tools: Arc<ToolRegistry>,

    pub messages: Arc<dyn MessageStore>,
    pub conversations: Arc<dyn ConversationStore>,
    pub tokenizer: Arc<dyn Tokenizer>,
    pub conversation_locks: Arc<ConversationLockMap>,

    /// SHA-256 of the API bearer token, `None` disables auth.
    pub api_token_hash: Option<Vec<u8>>,
}

impl AppState {
    /// Wire a [`ChatAssistant`] for one conversation's parameters.
    pub fn assistant_for(&self, params: &AssistantParams) -> Result<Arc<ChatAssistant>> {
        let resolved = match params.model.as_deref() {
            Some(spec) => self
                .llm
                .resolve(spec)
                .ok_or_else(|| Error::NoModel(format!("unknown model '{spec}'")))?,
            None => self
                .llm
                .for_role(EXECUTOR_ROLE)
                .ok_or_else(|| Error::NoModel("no model assigned to the executor role".into()))?,
        };

        let mut options = ChatOptions::from_config(&self.config.chat);
        options.model = resolved.model.clone();

        let summarizer = self
            .llm
            .for_role(SUMMARIZER_ROLE)
            .unwrap_or_else(|| resolved.clone());

        let assistant = ChatAssistant::new(
            params.clone(),
            resolved.provider,
            self.tools.resolve_tools(&params.assistant_id),
            Arc::clone(&self.messages),
            Arc::clone(&self.tokenizer),
            options,
        )
        .with_summarizer(summarizer.provider, summarizer.model);

        Ok(Arc::new(assistant))
    }
}
