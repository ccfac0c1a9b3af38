//! Persistence for conversations and their messages.
//!
//! The engine only sees the [`MessageStore`] and [`ConversationStore`]
//! traits. Two backends exist: an in-memory one for tests and one-shot
//! runs, and a file-backed one (append-only JSONL per conversation plus a
//! `conversations.json` index).

pub mod conversations;
pub mod jsonl;
pub mod memory;
pub mod traits;

use std::sync::Arc;

use lc_domain::config::{StoreConfig, StoreKind};
use lc_domain::error::Result;

pub use conversations::JsonConversationStore;
pub use jsonl::JsonlMessageStore;
pub use memory::{MemoryConversationStore, MemoryMessageStore};
pub use traits::{ConversationStore, MessageStore};

/// The pair of stores the gateway runs with.
#[derive(Clone)]
pub struct Stores {
    pub messages: Arc<dyn MessageStore>,
    pub conversations: Arc<dyn ConversationStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            messages: Arc::new(MemoryMessageStore::default()),
            conversations: Arc::new(MemoryConversationStore::default()),
        }
    }

    /// Open the backend selected by `[store]`.
    pub fn open(cfg: &StoreConfig) -> Result<Self> {
        match cfg.kind {
            StoreKind::Memory => Ok(Self::in_memory()),
            StoreKind::Jsonl => {
                let messages = JsonlMessageStore::new(&cfg.path)?;
                let conversations = JsonConversationStore::new(&cfg.path)?;
                Ok(Self {
                    messages: Arc::new(messages),
                    conversations: Arc::new(conversations),
                })
            }
        }
    }
}
