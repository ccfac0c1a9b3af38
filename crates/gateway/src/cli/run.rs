//! `logicle-engine run`: one-shot chat turn.
//!
//! Boots the runtime with in-memory stores, sends one message and streams
//! the answer to stdout. Tool confirmations are denied unless `--approve`
//! is given.

use std::io::Write;
use std::sync::Arc;

use lc_context::build_thread;
use lc_domain::config::Config;
use lc_domain::conversation::{AssistantParams, Conversation};
use lc_domain::message::{ConfirmRequest, Message, MessageBody, MessagePart};
use lc_domain::stream_part::StreamPart;
use lc_store::Stores;

use crate::bootstrap;
use crate::runtime::{dispatch, Frame, TurnCompletion, TurnInput, TurnOutcome, TurnStream};

pub struct RunArgs {
    pub message: String,
    pub system: String,
    pub model: Option<String>,
    pub approve: bool,
    pub json: bool,
}

pub async fn run(config: Arc<Config>, args: RunArgs) -> anyhow::Result<()> {
    let state = bootstrap::build_with_stores(config, Stores::in_memory())?;

    let conversation = Conversation::new(
        "cli",
        "New chat",
        AssistantParams {
            assistant_id: "cli".into(),
            system_prompt: args.system,
            model: args.model,
            token_limit: None,
            temperature: None,
        },
    );
    let conversation_id = conversation.id.clone();
    state.conversations.create(conversation.clone()).await?;
    let assistant = state.assistant_for(&conversation.assistant)?;

    let user = Message::user(&conversation_id, None, args.message, Vec::new());
    state.messages.save_message(&user, None).await?;

    // Each turn holds the conversation lock until its completion is applied.
    let mut permit = state.conversation_locks.acquire(&conversation_id).await?;
    let mut turn = assistant.clone().send_user_message(TurnInput {
        conversation_id: conversation_id.clone(),
        history: vec![user],
    });

    let mut frames = Vec::new();
    loop {
        let completion = drain(turn, args.json, &mut frames).await?;
        dispatch::apply_completion(state.conversations.as_ref(), &conversation_id, &completion).await;
        drop(permit);

        match completion.outcome {
            TurnOutcome::AwaitingConfirmation => {
                let Some(request) = completion.saved.last() else {
                    anyhow::bail!("turn paused without a tool-auth-request");
                };
                let MessageBody::ToolAuthRequest { tool_call_id, tool_name, args: tool_args } = &request.body
                else {
                    anyhow::bail!("turn paused without a tool-auth-request");
                };
                if !args.json {
                    let verdict = if args.approve { "approved" } else { "denied" };
                    eprintln!("\x1b[2m[confirm {tool_name}: {verdict}]\x1b[0m");
                }
                let confirm = ConfirmRequest {
                    tool_call_id: tool_call_id.clone(),
                    tool_name: tool_name.clone(),
                    tool_args: tool_args.clone(),
                };
                let stored = state.messages.get_messages(&conversation_id).await?;
                let history = build_thread(&stored, &request.id)?;
                permit = state.conversation_locks.acquire(&conversation_id).await?;
                turn = assistant.clone().send_confirm_response(
                    TurnInput {
                        conversation_id: conversation_id.clone(),
                        history,
                    },
                    confirm,
                    args.approve,
                );
            }
            TurnOutcome::Done => break,
            TurnOutcome::ClientGone => anyhow::bail!("output closed"),
            TurnOutcome::Failed(failure) => {
                if args.json {
                    print_json(&frames)?;
                }
                anyhow::bail!("turn failed: {failure}");
            }
        }
    }

    if args.json {
        print_json(&frames)?;
    } else {
        println!();
    }
    Ok(())
}

async fn drain(turn: TurnStream, json: bool, frames: &mut Vec<serde_json::Value>) -> anyhow::Result<TurnCompletion> {
    let TurnStream { frames: mut rx, completion } = turn;
    while let Some(frame) = rx.recv().await {
        if json {
            frames.push(serde_json::from_str(&frame.data())?);
        } else {
            print_frame(&frame);
        }
    }
    completion
        .await
        .map_err(|_| anyhow::anyhow!("turn ended without a completion"))
}

fn print_frame(frame: &Frame) {
    match frame {
        Frame::Part(StreamPart::Text { text }) => {
            print!("{text}");
            std::io::stdout().flush().ok();
        }
        Frame::Part(StreamPart::Reasoning { reasoning }) => {
            // Dim output to stderr so it doesn't pollute stdout.
            eprint!("\x1b[2m{reasoning}\x1b[0m");
            std::io::stderr().flush().ok();
        }
        Frame::Part(StreamPart::Part { part: MessagePart::ToolCall(call) }) => {
            eprintln!("\x1b[2m[tool: {}]\x1b[0m", call.tool_name);
        }
        Frame::Part(StreamPart::Part { part: MessagePart::Error { error } }) => {
            eprintln!("error: {error}");
        }
        Frame::Part(StreamPart::Summary { content }) => {
            eprintln!("\x1b[2m[title: {content}]\x1b[0m");
        }
        Frame::RawError(message) => eprintln!("error: {message}"),
        _ => {}
    }
}

fn print_json(frames: &[serde_json::Value]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(frames)
        .map_err(|e| anyhow::anyhow!("serializing frames: {e}"))?;
    println!("{json}");
    Ok(())
}
