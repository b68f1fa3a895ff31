//! User endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::services::{recent_history, with_trends};
use crate::AppState;

/// Upper bound on a single interactions page.
const MAX_INTERACTIONS_PAGE: usize = 200;

/// Trimmed, lowercased email, or `None` when it cannot be an address.
fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim();
    if email.is_empty() || !email.contains('@') {
        return None;
    }
    Some(email.to_lowercase())
}

/// POST /api/users
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let email = normalize_email(&payload.email)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid email: {:?}", payload.email)))?;

    let user = User::new(email, payload.full_name, Utc::now());
    state.store.create_user(&user).await?;

    tracing::info!(user_id = %user.id, "registered user");

    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/users/:user_id
pub async fn get(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<User>> {
    let mut user = state
        .store
        .get_user(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user not found: {}", user_id)))?;

    let history = recent_history(&state, user_id).await?;
    user.progress = with_trends(&state, user.progress, &history);
    Ok(Json(user))
}

/// GET /api/users/:user_id/interactions
pub async fn interactions(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<InteractionQuery>,
) -> Result<Json<Vec<Interaction>>> {
    if state.store.get_user(user_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("user not found: {}", user_id)));
    }

    let mut filter = query.into_filter(user_id);
    filter.limit = Some(
        filter
            .limit
            .unwrap_or(MAX_INTERACTIONS_PAGE)
            .min(MAX_INTERACTIONS_PAGE),
    );
    let interactions = state.store.list_interactions(&filter).await?;
    Ok(Json(interactions))
}
