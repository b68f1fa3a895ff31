use chrono::Utc;
use uuid::Uuid;

use medcards_core::build_dashboard;

use crate::error::{ApiError, Result};
use crate::models::DashboardStats;
use crate::services::recent_history;
use crate::AppState;

pub async fn dashboard(state: &AppState, user_id: Uuid) -> Result<DashboardStats> {
    let versioned = state
        .store
        .get_progress(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user not found: {}", user_id)))?;
    let history = recent_history(state, user_id).await?;
    let catalog = state.store.list_badges().await?;
    let earned = state.store.user_badges(user_id).await?;

    Ok(build_dashboard(
        &versioned.progress,
        &history,
        &catalog,
        &earned,
        &state.engine.config,
        Utc::now(),
    ))
}
