//! Per-conversation concurrency control.
//!
//! At most one turn runs per conversation. The HTTP layer uses
//! [`ConversationLockMap::try_acquire`] and turns a busy conversation into
//! `409 Conflict`; the CLI waits with [`ConversationLockMap::acquire`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Each conversation id maps to a `Semaphore(1)`. The permit is held for
/// the whole turn and released on drop.
#[derive(Default)]
pub struct ConversationLockMap {
    locks: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl ConversationLockMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn semaphore(&self, conversation_id: &str) -> Arc<Semaphore> {
        self.locks
            .lock()
            .entry(conversation_id.to_owned())
            .or_insert_with(|| Arc::new(Semaphore::new(1)))
            .clone()
    }

    /// Take the lock if nobody holds it.
    pub fn try_acquire(&self, conversation_id: &str) -> Result<OwnedSemaphorePermit, ConversationBusy> {
        self.semaphore(conversation_id)
            .try_acquire_owned()
            .map_err(|_| ConversationBusy)
    }

    /// Wait until the running turn (if any) finishes.
    pub async fn acquire(&self, conversation_id: &str) -> Result<OwnedSemaphorePermit, ConversationBusy> {
        self.semaphore(conversation_id)
            .acquire_owned()
            .await
            .map_err(|_| ConversationBusy)
    }

    pub fn conversation_count(&self) -> usize {
        self.locks.lock().len()
    }

    /// Drop semaphores nobody holds or is waiting on.
    ///
    /// Owned permits and pending `acquire` calls each keep a clone of the
    /// `Arc`, and clones are only taken under the map lock, so a strong
    /// count of one means the entry is unreachable outside the map.
    pub fn prune_idle(&self) -> usize {
        let mut locks = self.locks.lock();
        let before = locks.len();
        locks.retain(|_, sem| Arc::strong_count(sem) > 1);
        before - locks.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("a turn is already in progress for this conversation")]
pub struct ConversationBusy;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_try_acquire_is_busy() {
        let map = ConversationLockMap::new();
        let permit = map.try_acquire("c1").unwrap();
        assert_eq!(map.try_acquire("c1").unwrap_err(), ConversationBusy);
        assert!(map.try_acquire("c2").is_ok());
        drop(permit);
        assert!(map.try_acquire("c1").is_ok());
    }

    #[tokio::test]
    async fn acquire_waits_for_release() {
        let map = Arc::new(ConversationLockMap::new());
        let p1 = map.acquire("c1").await.unwrap();

        let map2 = map.clone();
        let waiter = tokio::spawn(async move {
            let _p = map2.acquire("c1").await.unwrap();
            42
        });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        drop(p1);
        assert_eq!(waiter.await.unwrap(), 42);
    }

    #[test]
    fn prune_keeps_held_locks() {
        let map = ConversationLockMap::new();
        let _held = map.try_acquire("busy").unwrap();
        drop(map.try_acquire("idle").unwrap());
        assert_eq!(map.prune_idle(), 1);
        assert_eq!(map.conversation_count(), 1);
        assert_eq!(map.try_acquire("busy").unwrap_err(), ConversationBusy);
    }

    #[test]
    fn released_locks_do_not_accumulate() {
        let map = ConversationLockMap::new();
        for i in 0..1000 {
            drop(map.try_acquire(&format!("c{i}")).unwrap());
        }
        assert_eq!(map.conversation_count(), 1000);
        assert_eq!(map.prune_idle(), 1000);
        assert_eq!(map.conversation_count(), 0);
    }

    #[tokio::test]
    async fn prune_keeps_locks_with_waiters() {
        let map = Arc::new(ConversationLockMap::new());
        let held = map.acquire("c1").await.unwrap();

        let map2 = map.clone();
        let waiter = tokio::spawn(async move { map2.acquire("c1").await.map(|_| ()) });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert_eq!(map.prune_idle(), 0);
        drop(held);
        waiter.await.unwrap().unwrap();
        assert_eq!(map.prune_idle(), 1);
    }
}
