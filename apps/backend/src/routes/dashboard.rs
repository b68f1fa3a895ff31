//! Dashboard endpoint

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::Result;
use crate::models::DashboardStats;
use crate::services;
use crate::AppState;

/// GET /api/users/:user_id/dashboard
pub async fn get(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<DashboardStats>> {
    let stats = services::dashboard::dashboard(&state, user_id).await?;
    Ok(Json(stats))
}
