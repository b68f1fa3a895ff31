//! Coach chat transcript endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::AppState;

/// Upper bound on a single transcript page.
const MAX_CHAT_PAGE: usize = 200;

/// Model recorded for messages that do not name one.
const UNSPECIFIED_MODEL: &str = "unspecified";

async fn ensure_user(state: &AppState, user_id: Uuid) -> Result<()> {
    if state.store.get_user(user_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("user not found: {}", user_id)));
    }
    Ok(())
}

/// GET /api/users/:user_id/chat-messages
/// The newest messages, oldest first.
pub async fn list(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<ChatQuery>,
) -> Result<Json<Vec<ChatMessage>>> {
    ensure_user(&state, user_id).await?;

    let limit = query.limit.unwrap_or(MAX_CHAT_PAGE).min(MAX_CHAT_PAGE);
    let messages = state
        .store
        .list_chat_messages(user_id, query.session_id, limit)
        .await?;
    Ok(Json(messages))
}

/// POST /api/users/:user_id/chat-messages
pub async fn append(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<CreateChatMessageRequest>,
) -> Result<(StatusCode, Json<ChatMessage>)> {
    ensure_user(&state, user_id).await?;

    if let Some(case_id) = &payload.related_case_id {
        if state.store.get_case(case_id).await?.is_none() {
            return Err(ApiError::NotFound(format!("case not found: {}", case_id)));
        }
    }

    let model_used = payload
        .model_used
        .unwrap_or_else(|| UNSPECIFIED_MODEL.to_string());
    let mut message =
        ChatMessage::new(user_id, payload.role, &payload.content, model_used, Utc::now())?;
    message.session_id = payload.session_id;
    message.related_case_id = payload.related_case_id;
    message.token_count = payload.token_count;

    state.store.append_chat_message(&message).await?;

    tracing::debug!(%user_id, message_id = %message.id, "appended chat message");

    Ok((StatusCode::CREATED, Json(message)))
}
