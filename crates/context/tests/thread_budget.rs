//! Thread reconstruction feeding the budget trimmer and prompt conversion,
//! the way a turn prepares its model input.

use chrono::Utc;

use lc_context::{build_thread, limit_messages, to_prompt_messages, HeuristicTokenizer};
use lc_domain::message::{Message, MessageBody, MessagePart};
use lc_domain::prompt::PromptRole;
use lc_domain::tool::{ToolCall, ToolCallResult, ToolResultOutput};

fn msg(id: &str, parent: Option<&str>, body: MessageBody) -> Message {
    Message {
        id: id.into(),
        conversation_id: "c".into(),
        parent: parent.map(str::to_owned),
        sent_at: Utc::now(),
        body,
    }
}

fn user(id: &str, parent: Option<&str>, text: &str) -> Message {
    msg(id, parent, MessageBody::User { content: text.into(), attachments: vec![] })
}

fn assistant(id: &str, parent: &str, parts: Vec<MessagePart>) -> Message {
    msg(
        id,
        Some(parent),
        MessageBody::Assistant { parts, citations: None, confirm_request: None },
    )
}

/// A conversation forest: `u1 -> a1 -> u2a -> a2a` and a sibling
/// branch `a1 -> u2b -> a2b (tool call) -> t2b -> a3b`.
fn forest() -> Vec<Message> {
    let call = ToolCall {
        tool_call_id: "call-1".into(),
        tool_name: "clock".into(),
        args: serde_json::json!({}),
    };
    vec![
        user("u1", None, "hello there"),
        assistant("a1", "u1", vec![MessagePart::text("hi, how can I help?")]),
        user("u2a", Some("a1"), "first branch"),
        assistant("a2a", "u2a", vec![MessagePart::text("first answer")]),
        user("u2b", Some("a1"), "what time is it?"),
        assistant("a2b", "u2b", vec![MessagePart::ToolCall(call)]),
        msg(
            "t2b",
            Some("a2b"),
            MessageBody::Tool {
                parts: vec![MessagePart::ToolResult(ToolCallResult {
                    tool_call_id: "call-1".into(),
                    tool_name: "clock".into(),
                    result: ToolResultOutput::Text { value: "12:00".into() },
                })],
                attachments: vec![],
                citations: None,
            },
        ),
        assistant("a3b", "t2b", vec![MessagePart::text("It is noon.")]),
    ]
}

#[test]
fn branch_is_followed_from_the_leaf() {
    let thread = build_thread(&forest(), "a3b").unwrap();
    let ids: Vec<&str> = thread.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["u1", "a1", "u2b", "a2b", "t2b", "a3b"]);
}

#[test]
fn unknown_leaf_is_an_error() {
    assert!(build_thread(&forest(), "ghost").is_err());
}

#[test]
fn generous_budget_keeps_the_whole_branch() {
    let tok = HeuristicTokenizer::default();
    let thread = build_thread(&forest(), "a3b").unwrap();
    let trimmed = limit_messages(&tok, "sys", &thread, 10_000);

    assert_eq!(trimmed.dropped, 0);
    let prompt = to_prompt_messages(&trimmed.messages);
    let roles: Vec<PromptRole> = prompt.iter().map(|p| p.role).collect();
    assert_eq!(
        roles,
        vec![
            PromptRole::User,
            PromptRole::Assistant,
            PromptRole::User,
            PromptRole::Assistant,
            PromptRole::Tool,
            PromptRole::Assistant,
        ]
    );
}

#[test]
fn trimming_through_a_tool_exchange_drops_the_orphaned_result() {
    let tok = HeuristicTokenizer::default();
    let thread = build_thread(&forest(), "a3b").unwrap();

    // Budget fits the tool message and the final answer only.
    let tail: usize = thread[4..]
        .iter()
        .map(|m| lc_context::Tokenizer::count(&tok, &m.prompt_text()))
        .sum();
    let trimmed = limit_messages(&tok, "", &thread, tail);
    assert_eq!(trimmed.dropped, 4);

    let prompt = to_prompt_messages(&trimmed.messages);
    let roles: Vec<PromptRole> = prompt.iter().map(|p| p.role).collect();
    assert_eq!(roles, vec![PromptRole::Assistant]);
}
