//! Conversation titles generated after the first exchange.

use lc_context::crop::{crop_chars, first_line_ellipsis};
use lc_domain::error::Result;
use lc_domain::message::{Message, Role};
use lc_domain::prompt::PromptMessage;
use lc_domain::trace::TraceEvent;
use lc_providers::{ChatRequest, LlmProvider};

const SUMMARY_PROMPT: &str = "The user will provide a chat in JSON format. \
Reply with a title, at most three words, in the same language of the conversation. \
Be very concise: no apices, nor preamble";

const MAX_TITLE_CHARS: usize = 128;

/// First line of the model output, at most 128 chars plus `...`.
pub fn safe_summary(raw: &str) -> String {
    first_line_ellipsis(raw.trim(), MAX_TITLE_CHARS)
}

/// The chat as the JSON array the summarizer reads. Only user and
/// assistant text is included, each cropped to `max_chars`.
fn chat_json(messages: &[Message], max_chars: usize) -> String {
    let entries: Vec<serde_json::Value> = messages
        .iter()
        .filter(|m| matches!(m.role(), Role::User | Role::Assistant))
        .map(|m| {
            let (content, _) = crop_chars(&m.text(), max_chars);
            serde_json::json!({ "role": m.role().to_string(), "content": content })
        })
        .collect();
    serde_json::Value::Array(entries).to_string()
}

pub async fn summarize(
    provider: &dyn LlmProvider,
    model: Option<String>,
    conversation_id: &str,
    messages: &[Message],
    max_chars: usize,
) -> Result<String> {
    let req = ChatRequest {
        messages: vec![
            PromptMessage::system(SUMMARY_PROMPT),
            PromptMessage::user(chat_json(messages, max_chars)),
        ],
        temperature: Some(0.0),
        model,
        ..Default::default()
    };
    let resp = provider.chat(&req).await?;
    let title = safe_summary(&resp.content);

    TraceEvent::SummaryGenerated {
        conversation_id: conversation_id.to_owned(),
        title: title.clone(),
    }
    .emit();

    Ok(title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lc_domain::message::{MessageBody, MessagePart};

    #[test]
    fn safe_summary_keeps_first_line() {
        assert_eq!(safe_summary("Rust lifetimes\nsecond line"), "Rust lifetimes");
        assert_eq!(safe_summary("  padded  "), "padded");
    }

    #[test]
    fn safe_summary_truncates_long_titles() {
        let long = "x".repeat(200);
        let out = safe_summary(&long);
        assert_eq!(out.chars().count(), 128 + 3);
        assert!(out.ends_with("..."));

        let exact = "y".repeat(128);
        assert_eq!(safe_summary(&exact), exact);
    }

    #[test]
    fn chat_json_crops_and_skips_tool_messages() {
        let user = Message::user("c", None, "abcdef", vec![]);
        let tool = Message {
            id: "t".into(),
            conversation_id: "c".into(),
            parent: Some(user.id.clone()),
            sent_at: chrono::Utc::now(),
            body: MessageBody::Tool { parts: vec![], attachments: vec![], citations: None },
        };
        let assistant = Message {
            id: "a".into(),
            conversation_id: "c".into(),
            parent: Some("t".into()),
            sent_at: chrono::Utc::now(),
            body: MessageBody::Assistant {
                parts: vec![MessagePart::text("hello")],
                citations: None,
                confirm_request: None,
            },
        };
        let json: serde_json::Value =
            serde_json::from_str(&chat_json(&[user, tool, assistant], 3)).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"role": "user", "content": "abc"},
                {"role": "assistant", "content": "hel"}
            ])
        );
    }
}
