//! Customer/vendor chat endpoints. Clients poll; there is no push channel.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{
    Chat, ChatFilter, CreateChatRequest, MarkReadRequest, PostMessageRequest, UnreadCount,
};
use crate::AppState;

/// GET /api/chats?participantId=
pub async fn list_chats(
    State(state): State<AppState>,
    Query(filter): Query<ChatFilter>,
) -> ApiResult<Vec<Chat>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_chats(&filter.participant_id).await {
        Ok(chats) => success(chats, revision_id),
        Err(e) => error(e, revision_id),
    }
}

pub async fn get_chat(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Chat> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_chat(&id).await {
        Ok(Some(chat)) => success(chat, revision_id),
        Ok(None) => error(AppError::not_found("Chat", &id), revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/chats - Open a chat, reusing an existing one for the same parties and order.
pub async fn create_chat(
    State(state): State<AppState>,
    Json(request): Json<CreateChatRequest>,
) -> ApiResult<Chat> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.create_chat(&request).await {
        Ok((chat, created)) => {
            if created {
                tracing::info!(chat_id = %chat.id, vendor_id = %chat.vendor_id, "Chat opened");
            }
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(chat, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/chats/{id}/messages
pub async fn post_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<PostMessageRequest>,
) -> ApiResult<Chat> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state
        .repo
        .post_message(&id, &request.sender_id, &request.body)
        .await
    {
        Ok(chat) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(chat, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/chats/{id}/read - Mark the other party's messages as read.
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<MarkReadRequest>,
) -> ApiResult<Chat> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.mark_chat_read(&id, &request.reader_id).await {
        Ok(chat) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(chat, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/chats/unread?participantId=
pub async fn unread_count(
    State(state): State<AppState>,
    Query(filter): Query<ChatFilter>,
) -> ApiResult<UnreadCount> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.unread_count(&filter.participant_id).await {
        Ok(count) => success(count, revision_id),
        Err(e) => error(e, revision_id),
    }
}
