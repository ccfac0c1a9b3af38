//! In-memory stores. Nothing survives a restart.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use lc_domain::conversation::Conversation;
use lc_domain::error::{Error, Result};
use lc_domain::message::Message;
use lc_domain::stream::Usage;

use crate::traits::{ConversationStore, MessageStore};

#[derive(Default)]
pub struct MemoryMessageStore {
    messages: RwLock<HashMap<String, Vec<Message>>>,
}

#[async_trait::async_trait]
impl MessageStore for MemoryMessageStore {
    async fn save_message(&self, message: &Message, _usage: Option<&Usage>) -> Result<()> {
        self.messages
            .write()
            .entry(message.conversation_id.clone())
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        Ok(self
            .messages
            .read()
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct MemoryConversationStore {
    conversations: RwLock<HashMap<String, Conversation>>,
}

impl MemoryConversationStore {
    fn update<T>(&self, id: &str, f: impl FnOnce(&mut Conversation) -> T) -> Result<T> {
        let mut map = self.conversations.write();
        let conv = map
            .get_mut(id)
            .ok_or_else(|| Error::ConversationNotFound(id.to_owned()))?;
        Ok(f(conv))
    }
}

#[async_trait::async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn create(&self, conversation: Conversation) -> Result<()> {
        self.conversations
            .write()
            .insert(conversation.id.clone(), conversation);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Conversation>> {
        Ok(self.conversations.read().get(id).cloned())
    }

    async fn list(&self, owner_id: Option<&str>) -> Result<Vec<Conversation>> {
        let mut out: Vec<Conversation> = self
            .conversations
            .read()
            .values()
            .filter(|c| owner_id.map_or(true, |o| c.owner_id == o))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn set_name(&self, id: &str, name: &str) -> Result<()> {
        self.update(id, |c| c.name = name.to_owned())
    }

    async fn set_target_leaf(&self, id: &str, leaf: Option<String>) -> Result<()> {
        self.update(id, |c| c.target_leaf = leaf)
    }

    async fn take_target_leaf(&self, id: &str) -> Result<Option<String>> {
        self.update(id, |c| c.target_leaf.take())
    }

    async fn touch(&self, id: &str, sent_at: DateTime<Utc>) -> Result<()> {
        self.update(id, |c| c.last_msg_sent_at = Some(sent_at))
    }
}
