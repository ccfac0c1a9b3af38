use chrono::{DateTime, Utc};
use lc_domain::conversation::Conversation;
use lc_domain::error::Result;
use lc_domain::message::Message;
use lc_domain::stream::Usage;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Messages
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a finished message. Messages are immutable once saved.
    async fn save_message(&self, message: &Message, usage: Option<&Usage>) -> Result<()>;

    /// All messages of a conversation, in save order.
    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Message>>;

    async fn get_message(&self, conversation_id: &str, message_id: &str) -> Result<Option<Message>> {
        Ok(self
            .get_messages(conversation_id)
            .await?
            .into_iter()
            .find(|m| m.id == message_id))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Conversations
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Mutators return `Error::ConversationNotFound` for an unknown conversation id.
#[async_trait::async_trait]
pub trait ConversationStore: Send + Sync {
    async fn create(&self, conversation: Conversation) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<Conversation>>;

    async fn list(&self, owner_id: Option<&str>) -> Result<Vec<Conversation>>;

    async fn set_name(&self, id: &str, name: &str) -> Result<()>;

    async fn set_target_leaf(&self, id: &str, leaf: Option<String>) -> Result<()>;

    /// Read and clear the target leaf in one step.
    async fn take_target_leaf(&self, id: &str) -> Result<Option<String>>;

    /// Record the send time of the latest message.
    async fn touch(&self, id: &str, sent_at: DateTime<Utc>) -> Result<()>;
}
