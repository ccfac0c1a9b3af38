use std::collections::{HashMap, HashSet};

use lc_domain::message::Message;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ThreadError {
    #[error("leaf message not found: {0}")]
    LeafNotFound(String),
}

/// Reconstruct the chronological root → leaf path ending at `leaf_id`.
///
/// `messages` may hold the whole conversation forest in any order. The
/// walk stops at a message whose parent is absent from the set (a
/// dangling pointer is treated as a root) or when a parent pointer would
/// revisit a message.
pub fn build_thread(messages: &[Message], leaf_id: &str) -> Result<Vec<Message>, ThreadError> {
    let by_id: HashMap<&str, &Message> = messages.iter().map(|m| (m.id.as_str(), m)).collect();

    let mut current = *by_id
        .get(leaf_id)
        .ok_or_else(|| ThreadError::LeafNotFound(leaf_id.to_string()))?;

    let mut seen: HashSet<&str> = HashSet::new();
    let mut chain: Vec<Message> = Vec::new();
    loop {
        seen.insert(current.id.as_str());
        chain.push(current.clone());
        let Some(parent_id) = current.parent.as_deref() else {
            break;
        };
        if seen.contains(parent_id) {
            tracing::warn!(
                message_id = %current.id,
                parent_id = %parent_id,
                "parent cycle in message thread, stopping walk"
            );
            break;
        }
        match by_id.get(parent_id) {
            Some(&parent) => current = parent,
            None => {
                tracing::debug!(
                    message_id = %current.id,
                    parent_id = %parent_id,
                    "dangling parent reference, treating as root"
                );
                break;
            }
        }
    }
    chain.reverse();
    Ok(chain)
}

/// The most recently sent message of a conversation, used as the default
/// leaf when the caller names none.
pub fn latest_message(messages: &[Message]) -> Option<&Message> {
    messages.iter().max_by_key(|m| m.sent_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use lc_domain::message::MessageBody;

    fn msg(id: &str, parent: Option<&str>, minutes: i64) -> Message {
        Message {
            id: id.into(),
            conversation_id: "c".into(),
            parent: parent.map(Into::into),
            sent_at: Utc::now() + Duration::minutes(minutes),
            body: MessageBody::User { content: id.into(), attachments: vec![] },
        }
    }

    fn ids(thread: &[Message]) -> Vec<&str> {
        thread.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn linear_chain_in_chronological_order() {
        let all = vec![msg("c", Some("b"), 2), msg("a", None, 0), msg("b", Some("a"), 1)];
        let thread = build_thread(&all, "c").unwrap();
        assert_eq!(ids(&thread), vec!["a", "b", "c"]);
    }

    #[test]
    fn sibling_branches_are_excluded() {
        // a ─┬─ b ── d
        //    └─ c
        let all = vec![
            msg("a", None, 0),
            msg("b", Some("a"), 1),
            msg("c", Some("a"), 2),
            msg("d", Some("b"), 3),
        ];
        assert_eq!(ids(&build_thread(&all, "d").unwrap()), vec!["a", "b", "d"]);
        assert_eq!(ids(&build_thread(&all, "c").unwrap()), vec!["a", "c"]);
    }

    #[test]
    fn leaf_must_exist() {
        let all = vec![msg("a", None, 0)];
        assert_eq!(
            build_thread(&all, "zz").unwrap_err(),
            ThreadError::LeafNotFound("zz".into())
        );
    }

    #[test]
    fn dangling_parent_stops_walk() {
        let all = vec![msg("b", Some("gone"), 1), msg("c", Some("b"), 2)];
        assert_eq!(ids(&build_thread(&all, "c").unwrap()), vec!["b", "c"]);
    }

    #[test]
    fn parent_cycle_terminates() {
        let all = vec![msg("a", Some("b"), 0), msg("b", Some("a"), 1)];
        assert_eq!(ids(&build_thread(&all, "b").unwrap()), vec!["a", "b"]);
    }

    #[test]
    fn latest_by_sent_at() {
        let all = vec![msg("a", None, 0), msg("b", Some("a"), 5), msg("c", Some("a"), 2)];
        assert_eq!(latest_message(&all).map(|m| m.id.as_str()), Some("b"));
        assert!(latest_message(&[]).is_none());
    }
}
