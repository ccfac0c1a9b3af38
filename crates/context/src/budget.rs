use lc_domain::message::Message;

use crate::tokenizer::Tokenizer;

/// Result of fitting a thread into a token budget.
#[derive(Debug, Clone)]
pub struct Trimmed {
    /// Contiguous suffix of the input thread, oldest first.
    pub messages: Vec<Message>,
    /// Tokens used by the system prompt plus `messages`.
    pub token_count: usize,
    /// Number of older messages left out.
    pub dropped: usize,
}

/// Select the longest suffix of `messages` that fits `budget` tokens
/// together with `system_prompt`.
///
/// The message that would overflow the budget is excluded whole and
/// everything older than it is dropped, so a single oversized message can
/// leave the result empty. The tokenizer is called once for the system
/// prompt and at most once per message.
pub fn limit_messages(
    tokenizer: &dyn Tokenizer,
    system_prompt: &str,
    messages: &[Message],
    budget: usize,
) -> Trimmed {
    let mut total = tokenizer.count(system_prompt);
    let mut keep = 0usize;

    for message in messages.iter().rev() {
        let tokens = tokenizer.count(&message.prompt_text());
        if total + tokens > budget {
            break;
        }
        total += tokens;
        keep += 1;
    }

    let start = messages.len() - keep;
    Trimmed {
        messages: messages[start..].to_vec(),
        token_count: total,
        dropped: start,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::HeuristicTokenizer;
    use chrono::Utc;
    use lc_domain::message::MessageBody;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// One token per whitespace-separated word.
    struct WordTokenizer;

    impl Tokenizer for WordTokenizer {
        fn encode(&self, text: &str) -> Vec<u32> {
            text.split_whitespace().map(|_| 0).collect()
        }
    }

    struct CountingTokenizer(AtomicUsize);

    impl Tokenizer for CountingTokenizer {
        fn encode(&self, text: &str) -> Vec<u32> {
            self.0.fetch_add(1, Ordering::SeqCst);
            HeuristicTokenizer::default().encode(text)
        }
    }

    fn user(id: &str, words: usize) -> Message {
        Message {
            id: id.into(),
            conversation_id: "c".into(),
            parent: None,
            sent_at: Utc::now(),
            body: MessageBody::User {
                content: vec!["w"; words].join(" "),
                attachments: vec![],
            },
        }
    }

    fn ids(t: &Trimmed) -> Vec<&str> {
        t.messages.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn everything_fits() {
        let thread = vec![user("a", 2), user("b", 2)];
        let t = limit_messages(&WordTokenizer, "sys", &thread, 100);
        assert_eq!(ids(&t), vec!["a", "b"]);
        assert_eq!(t.token_count, 5);
        assert_eq!(t.dropped, 0);
    }

    #[test]
    fn exact_fit_is_kept() {
        let thread = vec![user("a", 3), user("b", 3)];
        let t = limit_messages(&WordTokenizer, "one two", &thread, 8);
        assert_eq!(ids(&t), vec!["a", "b"]);
        let t = limit_messages(&WordTokenizer, "one two", &thread, 7);
        assert_eq!(ids(&t), vec!["b"]);
    }

    #[test]
    fn oversized_message_is_excluded_whole() {
        let thread = vec![user("a", 1), user("huge", 50), user("c", 1)];
        let t = limit_messages(&WordTokenizer, "", &thread, 10);
        assert_eq!(ids(&t), vec!["c"]);
        assert_eq!(t.dropped, 2);
        assert_eq!(t.token_count, 1);
    }

    #[test]
    fn oversized_newest_message_leaves_nothing() {
        let thread = vec![user("a", 1), user("huge", 50)];
        let t = limit_messages(&WordTokenizer, "", &thread, 10);
        assert!(t.messages.is_empty());
        assert_eq!(t.dropped, 2);
    }

    #[test]
    fn system_prompt_counts_against_budget() {
        let thread = vec![user("a", 2)];
        let t = limit_messages(&WordTokenizer, "a b c d", &thread, 5);
        assert!(t.messages.is_empty());
        assert_eq!(t.token_count, 4);
    }

    #[test]
    fn larger_budget_never_keeps_fewer() {
        let thread: Vec<Message> =
            (0..8).map(|i| user(&format!("m{i}"), (i * 7) % 5 + 1)).collect();
        let mut previous = 0;
        for budget in 0..60 {
            let t = limit_messages(&WordTokenizer, "sys", &thread, budget);
            assert!(t.messages.len() >= previous, "budget {budget}");
            previous = t.messages.len();
            let suffix = &thread[thread.len() - t.messages.len()..];
            assert_eq!(t.messages.as_slice(), suffix);
        }
    }

    #[test]
    fn tokenizer_called_once_per_visited_message() {
        let counter = CountingTokenizer(AtomicUsize::new(0));
        let thread = vec![user("a", 1), user("b", 1), user("c", 1)];
        limit_messages(&counter, "sys", &thread, 1000);
        assert_eq!(counter.0.load(Ordering::SeqCst), 4);
    }
}
