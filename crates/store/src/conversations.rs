//! File-backed conversation index.
//!
//! Conversations live in `conversations.json` under the store directory,
//! loaded once at startup and rewritten after every mutation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use lc_domain::conversation::Conversation;
use lc_domain::error::{Error, Result};

use crate::jsonl::is_safe_stem;
use crate::traits::ConversationStore;

pub struct JsonConversationStore {
    path: PathBuf,
    conversations: RwLock<HashMap<String, Conversation>>,
    // Serializes index rewrites.
    flush_lock: tokio::sync::Mutex<()>,
}

impl JsonConversationStore {
    /// Load or create the index at `dir/conversations.json`.
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;

        let path = dir.join("conversations.json");
        let conversations: HashMap<String, Conversation> = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "conversation index unreadable, starting empty"
                );
                HashMap::new()
            })
        } else {
            HashMap::new()
        };

        tracing::info!(
            conversations = conversations.len(),
            path = %path.display(),
            "conversation store loaded"
        );

        Ok(Self {
            path,
            conversations: RwLock::new(conversations),
            flush_lock: tokio::sync::Mutex::new(()),
        })
    }

    async fn flush(&self) -> Result<()> {
        let _guard = self.flush_lock.lock().await;
        let json = {
            let conversations = self.conversations.read();
            serde_json::to_string_pretty(&*conversations)?
        };
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            // Atomic replace: temp file, then rename.
            let tmp = path.with_extension("json.tmp");
            std::fs::write(&tmp, json)?;
            std::fs::rename(&tmp, &path)?;
            Ok::<(), Error>(())
        })
        .await
        .map_err(|e| Error::Store(format!("spawn_blocking join: {e}")))?
    }

    async fn update<T>(&self, id: &str, f: impl FnOnce(&mut Conversation) -> T) -> Result<T> {
        let out = {
            let mut map = self.conversations.write();
            let conv = map
                .get_mut(id)
                .ok_or_else(|| Error::ConversationNotFound(id.to_owned()))?;
            f(conv)
        };
        self.flush().await?;
        Ok(out)
    }
}

#[async_trait::async_trait]
impl ConversationStore for JsonConversationStore {
    async fn create(&self, conversation: Conversation) -> Result<()> {
        if !is_safe_stem(&conversation.id) {
            return Err(Error::InvalidId(conversation.id));
        }
        self.conversations
            .write()
            .insert(conversation.id.clone(), conversation);
        self.flush().await
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
        self.update(id, |c| c.name = name.to_owned()).await
    }

    async fn set_target_leaf(&self, id: &str, leaf: Option<String>) -> Result<()> {
        self.update(id, |c| c.target_leaf = leaf).await
    }

    async fn take_target_leaf(&self, id: &str) -> Result<Option<String>> {
        self.update(id, |c| c.target_leaf.take()).await
    }

    async fn touch(&self, id: &str, sent_at: DateTime<Utc>) -> Result<()> {
        self.update(id, |c| c.last_msg_sent_at = Some(sent_at)).await
    }
}
