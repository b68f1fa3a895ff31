//! Badge catalog endpoint

use axum::{extract::State, Json};

use crate::error::Result;
use crate::models::Badge;
use crate::AppState;

/// GET /api/badges
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Badge>>> {
    let badges = state.store.list_badges().await?;
    Ok(Json(badges))
}
