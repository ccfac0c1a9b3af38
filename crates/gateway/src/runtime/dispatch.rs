//! Bookkeeping that runs after a turn, detached from the HTTP response.

use std::sync::Arc;

use tokio::sync::{oneshot, OwnedSemaphorePermit};

use lc_store::ConversationStore;

use super::assistant::{TurnCompletion, TurnOutcome};

/// Wait for the turn to finish, then record when the conversation last
/// got a message and store the generated title. The conversation lock is
/// released once this is done.
pub fn spawn_completion_handler(
    conversations: Arc<dyn ConversationStore>,
    conversation_id: String,
    completion: oneshot::Receiver<TurnCompletion>,
    permit: OwnedSemaphorePermit,
) -> tokio::task::JoinHandle<Option<TurnCompletion>> {
    tokio::spawn(async move {
        let _permit = permit;
        let completion = match completion.await {
            Ok(c) => c,
            Err(_) => {
                tracing::error!(conversation_id = %conversation_id, "turn task dropped without completing");
                return None;
            }
        };
        apply_completion(conversations.as_ref(), &conversation_id, &completion).await;
        Some(completion)
    })
}

pub async fn apply_completion(
    conversations: &dyn ConversationStore,
    conversation_id: &str,
    completion: &TurnCompletion,
) {
    if let Some(sent_at) = completion.last_sent_at {
        if let Err(e) = conversations.touch(conversation_id, sent_at).await {
            tracing::warn!(conversation_id = %conversation_id, error = %e, "failed to update last message time");
        }
    }
    if let Some(title) = &completion.title {
        if let Err(e) = conversations.set_name(conversation_id, title).await {
            tracing::warn!(conversation_id = %conversation_id, error = %e, "failed to store conversation title");
        }
    }

    match &completion.outcome {
        TurnOutcome::Failed(failure) => tracing::info!(
            conversation_id = %conversation_id,
            saved = completion.saved.len(),
            error = %failure,
            "turn completed with failure"
        ),
        outcome => tracing::info!(
            conversation_id = %conversation_id,
            saved = completion.saved.len(),
            total_tokens = completion.usage.total_tokens,
            outcome = ?outcome,
            "turn completed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lc_domain::conversation::{AssistantParams, Conversation};
    use lc_domain::stream::Usage;
    use lc_store::memory::MemoryConversationStore;

    fn completion(title: Option<&str>) -> TurnCompletion {
        TurnCompletion {
            outcome: TurnOutcome::Done,
            saved: Vec::new(),
            title: title.map(str::to_owned),
            usage: Usage::default(),
            last_sent_at: Some(Utc::now()),
        }
    }

    #[tokio::test]
    async fn handler_touches_and_renames_then_releases_lock() {
        let store = Arc::new(MemoryConversationStore::default());
        let conv = Conversation::new("u", "New chat", AssistantParams::default());
        let id = conv.id.clone();
        store.create(conv).await.unwrap();

        let locks = crate::runtime::ConversationLockMap::new();
        let permit = locks.try_acquire(&id).unwrap();
        let (tx, rx) = oneshot::channel();
        let handle = spawn_completion_handler(store.clone(), id.clone(), rx, permit);

        assert!(locks.try_acquire(&id).is_err());
        tx.send(completion(Some("Weather"))).unwrap();
        assert!(handle.await.unwrap().is_some());

        let stored = store.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Weather");
        assert!(stored.last_msg_sent_at.is_some());
        assert!(locks.try_acquire(&id).is_ok());
    }

    #[tokio::test]
    async fn dropped_turn_still_releases_lock() {
        let store = Arc::new(MemoryConversationStore::default());
        let locks = crate::runtime::ConversationLockMap::new();
        let permit = locks.try_acquire("c").unwrap();
        let (tx, rx) = oneshot::channel::<TurnCompletion>();
        let handle = spawn_completion_handler(store, "c".into(), rx, permit);
        drop(tx);
        assert!(handle.await.unwrap().is_none());
        assert!(locks.try_acquire("c").is_ok());
    }
}
