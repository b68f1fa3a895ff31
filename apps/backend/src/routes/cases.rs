//! Case catalog endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::AppState;

/// GET /api/cases/:case_id
pub async fn get(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
) -> Result<Json<ClinicalCase>> {
    let case = state
        .store
        .get_case(&case_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("case not found: {}", case_id)))?;
    Ok(Json(case))
}

/// POST /api/cases
/// Imports a batch of cases. The batch is validated up front and written in
/// one store call, so a failure leaves none of it behind.
pub async fn import(
    State(state): State<AppState>,
    Json(payload): Json<ImportCasesRequest>,
) -> Result<(StatusCode, Json<ImportCasesResponse>)> {
    if payload.cases.is_empty() {
        return Err(ApiError::BadRequest("no cases to import".to_string()));
    }
    for case in &payload.cases {
        case.validate()?;
    }

    state.store.upsert_cases(&payload.cases).await?;

    tracing::info!(count = payload.cases.len(), "imported cases");

    Ok((
        StatusCode::CREATED,
        Json(ImportCasesResponse {
            imported: payload.cases.len(),
        }),
    ))
}
