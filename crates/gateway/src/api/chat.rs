//! Chat turn endpoints.
//!
//! Both handlers answer with an SSE stream of [`Frame`]s. Everything that
//! can be rejected (unknown conversation, busy conversation, unknown
//! parent, no model) is rejected with a plain JSON error before the stream
//! starts.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use futures_util::stream::Stream;
use serde::Deserialize;
use tokio::sync::{mpsc, OwnedSemaphorePermit};

use lc_context::{build_thread, latest_message};
use lc_domain::conversation::Conversation;
use lc_domain::message::{Attachment, ConfirmRequest, Message, MessageBody};

use super::conversations::load;
use super::error::ApiError;
use crate::runtime::{spawn_completion_handler, ChatAssistant, Frame, TurnInput, TurnStream};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendMessage {
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Client-chosen id for the user message.
    #[serde(default)]
    pub id: Option<String>,
    /// Message to reply to; defaults to the target leaf, then the newest
    /// stored message.
    #[serde(default)]
    pub parent: Option<String>,
}

pub async fn post_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SendMessage>,
) -> Result<Response, ApiError> {
    let conversation = load(&state, &id).await?;
    let permit = state.conversation_locks.try_acquire(&id)?;
    let assistant = resolve_assistant(&state, &conversation)?;

    let mut stored = state.messages.get_messages(&id).await?;
    let parent = match body.parent {
        Some(parent) => {
            if !stored.iter().any(|m| m.id == parent) {
                return Err(ApiError::NotFound(format!("parent message {parent} not found")));
            }
            Some(parent)
        }
        None => match state.conversations.take_target_leaf(&id).await? {
            Some(leaf) if stored.iter().any(|m| m.id == leaf) => Some(leaf),
            _ => latest_message(&stored).map(|m| m.id.clone()),
        },
    };

    let mut user = Message::user(&id, parent, body.content, body.attachments);
    if let Some(client_id) = body.id.filter(|s| !s.is_empty()) {
        if stored.iter().any(|m| m.id == client_id) {
            return Err(ApiError::Conflict(format!("message {client_id} already exists")));
        }
        user.id = client_id;
    }
    state.messages.save_message(&user, None).await?;
    tracing::debug!(conversation_id = %id, message_id = %user.id, "user message saved");

    let leaf = user.id.clone();
    stored.push(user);
    let history = build_thread(&stored, &leaf)?;

    let turn = assistant.send_user_message(TurnInput {
        conversation_id: id.clone(),
        history,
    });
    Ok(stream_turn(&state, id, turn, permit))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmBody {
    pub tool_auth_request_id: String,
    pub allow: bool,
}

/// Answer a pending tool confirmation and resume the turn.
pub async fn confirm(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ConfirmBody>,
) -> Result<Response, ApiError> {
    let conversation = load(&state, &id).await?;
    let permit = state.conversation_locks.try_acquire(&id)?;

    let stored = state.messages.get_messages(&id).await?;
    let request_id = body.tool_auth_request_id;
    let request = stored
        .iter()
        .find(|m| m.id == request_id)
        .ok_or_else(|| ApiError::NotFound(format!("message {request_id} not found")))?;
    let request = match &request.body {
        MessageBody::ToolAuthRequest { tool_call_id, tool_name, args } => ConfirmRequest {
            tool_call_id: tool_call_id.clone(),
            tool_name: tool_name.clone(),
            tool_args: args.clone(),
        },
        _ => {
            return Err(ApiError::BadRequest(format!(
                "message {request_id} is not a tool-auth-request"
            )))
        }
    };
    if stored.iter().any(|m| m.parent.as_deref() == Some(request_id.as_str())) {
        return Err(ApiError::Conflict(format!(
            "tool-auth-request {request_id} was already answered"
        )));
    }

    let assistant = resolve_assistant(&state, &conversation)?;
    let history = build_thread(&stored, &request_id)?;
    tracing::info!(
        conversation_id = %id,
        tool = %request.tool_name,
        allow = body.allow,
        "tool confirmation received"
    );

    let turn = assistant.send_confirm_response(
        TurnInput {
            conversation_id: id.clone(),
            history,
        },
        request,
        body.allow,
    );
    Ok(stream_turn(&state, id, turn, permit))
}

fn resolve_assistant(state: &AppState, conversation: &Conversation) -> Result<Arc<ChatAssistant>, ApiError> {
    state
        .assistant_for(&conversation.assistant)
        .map_err(|e| ApiError::Unavailable(e.to_string()))
}

fn stream_turn(state: &AppState, conversation_id: String, turn: TurnStream, permit: OwnedSemaphorePermit) -> Response {
    let TurnStream { frames, completion } = turn;
    spawn_completion_handler(state.conversations.clone(), conversation_id, completion, permit);
    Sse::new(make_sse_stream(frames))
        .keep_alive(KeepAlive::new().interval(state.config.server.sse_keep_alive()))
        .into_response()
}

fn make_sse_stream(mut rx: mpsc::Receiver<Frame>) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        while let Some(frame) = rx.recv().await {
            yield Ok(Event::default().data(frame.data()));
        }
    }
}
