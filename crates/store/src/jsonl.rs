//! Append-only JSONL message log.
//!
//! Each conversation gets a `<conversationId>.jsonl` file under the store
//! directory. Every saved message is appended as one JSON line together
//! with its token usage, if any.
//!
//! Reads go through an in-memory write-through cache so a conversation is
//! parsed from disk at most once per process. File I/O runs on
//! `spawn_blocking` to keep it off the tokio workers.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use lc_domain::error::{Error, Result};
use lc_domain::message::Message;
use lc_domain::stream::Usage;
use lc_domain::trace::TraceEvent;

use crate::traits::MessageStore;

/// A single log line.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredMessage {
    message: Message,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    usage: Option<Usage>,
}

pub struct JsonlMessageStore {
    base_dir: PathBuf,
    cache: RwLock<HashMap<String, Vec<Message>>>,
}

impl JsonlMessageStore {
    pub fn new(base_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(base_dir)?;
        Ok(Self {
            base_dir: base_dir.to_path_buf(),
            cache: RwLock::new(HashMap::new()),
        })
    }

    fn path_for(&self, conversation_id: &str) -> Result<PathBuf> {
        if !is_safe_stem(conversation_id) {
            return Err(Error::InvalidId(conversation_id.to_owned()));
        }
        Ok(self.base_dir.join(format!("{conversation_id}.jsonl")))
    }
}

/// Ids become file names, so only a conservative character set is allowed.
pub(crate) fn is_safe_stem(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[async_trait::async_trait]
impl MessageStore for JsonlMessageStore {
    async fn save_message(&self, message: &Message, usage: Option<&Usage>) -> Result<()> {
        let path = self.path_for(&message.conversation_id)?;
        let mut line = serde_json::to_string(&StoredMessage {
            message: message.clone(),
            usage: usage.copied(),
        })?;
        line.push('\n');

        // Disk first; the cache only follows a successful write.
        tokio::task::spawn_blocking(move || {
            use std::io::Write;
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)?;
            file.write_all(line.as_bytes())?;
            Ok::<(), Error>(())
        })
        .await
        .map_err(|e| Error::Store(format!("spawn_blocking join: {e}")))??;

        {
            let mut cache = self.cache.write();
            if let Some(cached) = cache.get_mut(&message.conversation_id) {
                cached.push(message.clone());
            }
        }

        TraceEvent::MessagePersisted {
            conversation_id: message.conversation_id.clone(),
            message_id: message.id.clone(),
            role: message.role().to_string(),
        }
        .emit();

        Ok(())
    }

    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        {
            let cache = self.cache.read();
            if let Some(messages) = cache.get(conversation_id) {
                return Ok(messages.clone());
            }
        }

        let path = self.path_for(conversation_id)?;
        let cid = conversation_id.to_owned();
        let messages = tokio::task::spawn_blocking(move || read_jsonl_file(&path, &cid))
            .await
            .map_err(|e| Error::Store(format!("spawn_blocking join: {e}")))??;

        // A save may have raced the read; only fill an empty slot.
        let mut cache = self.cache.write();
        let entry = cache
            .entry(conversation_id.to_owned())
            .or_insert(messages);
        Ok(entry.clone())
    }
}

/// Read and parse a conversation log. Malformed lines are skipped.
fn read_jsonl_file(path: &Path, conversation_id: &str) -> Result<Vec<Message>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let raw = std::fs::read_to_string(path)?;
    let mut messages = Vec::new();
    for (lineno, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<StoredMessage>(line) {
            Ok(stored) => messages.push(stored.message),
            Err(e) => {
                tracing::warn!(
                    conversation_id = conversation_id,
                    line = lineno + 1,
                    error = %e,
                    "skipping malformed message line"
                );
            }
        }
    }
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lc_domain::message::{MessageBody, MessagePart};

    fn assistant(conversation_id: &str, parent: &str, text: &str) -> Message {
        Message {
            id: format!("a-{text}"),
            conversation_id: conversation_id.into(),
            parent: Some(parent.into()),
            sent_at: chrono::Utc::now(),
            body: MessageBody::Assistant {
                parts: vec![MessagePart::text(text)],
                citations: None,
                confirm_request: None,
            },
        }
    }

    #[tokio::test]
    async fn round_trip_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let user = Message::user("c1", None, "hello", vec![]);
        let reply = assistant("c1", &user.id, "hi there");

        {
            let store = JsonlMessageStore::new(dir.path()).unwrap();
            store.save_message(&user, None).await.unwrap();
            let usage = Usage { prompt_tokens: 3, completion_tokens: 2, total_tokens: 5 };
            store.save_message(&reply, Some(&usage)).await.unwrap();
        }

        let reopened = JsonlMessageStore::new(dir.path()).unwrap();
        let messages = reopened.get_messages("c1").await.unwrap();
        assert_eq!(messages, vec![user, reply]);
    }

    #[tokio::test]
    async fn corrupt_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlMessageStore::new(dir.path()).unwrap();
        let user = Message::user("c2", None, "ok", vec![]);
        store.save_message(&user, None).await.unwrap();

        {
            use std::io::Write;
            let mut f = std::fs::OpenOptions::new()
                .append(true)
                .open(dir.path().join("c2.jsonl"))
                .unwrap();
            writeln!(f, "{{not json").unwrap();
            writeln!(f).unwrap();
        }

        let fresh = JsonlMessageStore::new(dir.path()).unwrap();
        let messages = fresh.get_messages("c2").await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, user.id);
    }

    #[tokio::test]
    async fn cache_sees_saves_after_first_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlMessageStore::new(dir.path()).unwrap();
        assert!(store.get_messages("c3").await.unwrap().is_empty());
        store
            .save_message(&Message::user("c3", None, "late", vec![]), None)
            .await
            .unwrap();
        assert_eq!(store.get_messages("c3").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn path_traversal_ids_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlMessageStore::new(dir.path()).unwrap();
        let err = store.get_messages("../etc/passwd").await.unwrap_err();
        assert!(matches!(err, Error::InvalidId(_)));
    }
}
