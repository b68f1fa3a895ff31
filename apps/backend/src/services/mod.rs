pub mod badges;
pub mod dashboard;
pub mod feedback;
pub mod scoring;
pub mod selection;

use uuid::Uuid;

use medcards_core::selection::refresh_trends;

use crate::error::Result;
use crate::models::{Interaction, InteractionFilter, UserProgress};
use crate::AppState;

/// Interactions considered by selection, trends and the dashboard.
pub const HISTORY_LIMIT: usize = 500;

/// Most recent interactions of a user, newest first.
pub async fn recent_history(state: &AppState, user_id: Uuid) -> Result<Vec<Interaction>> {
    state
        .store
        .list_interactions(&InteractionFilter {
            limit: Some(HISTORY_LIMIT),
            ..InteractionFilter::for_user(user_id)
        })
        .await
}

/// Recompute display trends, which are never trusted from storage.
pub fn with_trends(
    state: &AppState,
    mut progress: UserProgress,
    history: &[Interaction],
) -> UserProgress {
    let selection = &state.engine.config.selection;
    refresh_trends(
        &mut progress,
        history,
        selection.trend_window,
        selection.trend_threshold,
    );
    progress
}
