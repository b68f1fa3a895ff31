//! Next-case selection against the live stores.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use medcards_core::{CaseCatalog, CaseFilter};

use crate::error::{ApiError, Result};
use crate::models::NextCaseResponse;
use crate::services::recent_history;
use crate::AppState;

pub async fn next_case(state: &AppState, user_id: Uuid) -> Result<NextCaseResponse> {
    let versioned = state
        .store
        .get_progress(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user not found: {}", user_id)))?;
    let history = recent_history(state, user_id).await?;
    let catalog = CaseCatalog::new(state.store.find_cases(&CaseFilter::default()).await?);

    let response = {
        let mut rng = state
            .rng
            .lock()
            .map_err(|_| ApiError::Internal("selection rng poisoned".to_string()))?;
        let selection = state.engine.select(
            &versioned.progress,
            &history,
            &catalog,
            &mut *rng,
            Utc::now(),
        )?;
        info!(
            %user_id,
            case_id = %selection.case.id,
            goal = selection.goal.as_str(),
            specialty = %selection.specialty,
            relaxed = selection.relaxed.len(),
            "case selected"
        );
        state.engine.respond(&selection)
    };

    Ok(response)
}
