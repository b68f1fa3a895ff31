//! Study endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;
use crate::services::{scoring, selection};
use crate::AppState;

/// GET /api/users/:user_id/next-case
pub async fn next_case(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<NextCaseResponse>> {
    let response = selection::next_case(&state, user_id).await?;
    Ok(Json(response))
}

/// POST /api/users/:user_id/answers
pub async fn submit_answer(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<AnswerSubmission>,
) -> Result<Json<SubmitAnswerResponse>> {
    let response = scoring::submit_answer(&state, user_id, &payload).await?;
    Ok(Json(response))
}
