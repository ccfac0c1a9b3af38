//! Conversation CRUD.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;

use lc_domain::conversation::{AssistantParams, Conversation};
use lc_domain::message::Message;

use super::error::ApiError;
use crate::state::AppState;

const DEFAULT_OWNER: &str = "local";
const DEFAULT_NAME: &str = "New chat";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversation {
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub assistant: AssistantParams,
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateConversation>,
) -> Result<impl IntoResponse, ApiError> {
    if body.assistant.assistant_id.is_empty() {
        return Err(ApiError::BadRequest("assistant.assistantId must not be empty".into()));
    }
    let conversation = Conversation::new(
        body.owner_id.unwrap_or_else(|| DEFAULT_OWNER.into()),
        body.name.unwrap_or_else(|| DEFAULT_NAME.into()),
        body.assistant,
    );
    state.conversations.create(conversation.clone()).await?;
    tracing::info!(
        conversation_id = %conversation.id,
        assistant_id = %conversation.assistant.assistant_id,
        "conversation created"
    );
    Ok((StatusCode::CREATED, Json(conversation)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub owner_id: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Conversation>>, ApiError> {
    Ok(Json(state.conversations.list(query.owner_id.as_deref()).await?))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Conversation>, ApiError> {
    Ok(Json(load(&state, &id).await?))
}

pub async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Message>>, ApiError> {
    load(&state, &id).await?;
    Ok(Json(state.messages.get_messages(&id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetTargetLeaf {
    pub message_id: String,
}

/// Choose the message the next send replies to.
pub async fn set_target_leaf(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SetTargetLeaf>,
) -> Result<StatusCode, ApiError> {
    load(&state, &id).await?;
    if state.messages.get_message(&id, &body.message_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("message {} not found", body.message_id)));
    }
    state.conversations.set_target_leaf(&id, Some(body.message_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn load(state: &AppState, id: &str) -> Result<Conversation, ApiError> {
    state
        .conversations
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("conversation {id} not found")))
}
