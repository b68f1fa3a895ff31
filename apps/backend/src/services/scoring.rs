//! Answer submission: score, commit with compare-and-set, then feedback.

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use medcards_core::scoring::{apply_interaction, score_answer};
use medcards_core::EngineError;

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::services::{recent_history, with_trends};
use crate::AppState;

pub async fn submit_answer(
    state: &AppState,
    user_id: Uuid,
    submission: &AnswerSubmission,
) -> Result<SubmitAnswerResponse> {
    let case = state
        .store
        .get_case(&submission.case_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("case not found: {}", submission.case_id)))?;
    let badges = state.store.list_badges().await?;
    let config = &state.engine.config;

    let now = Utc::now();
    let mut interaction = score_answer(&case, user_id, submission, config, now)?;

    let mut committed = None;
    for attempt in 1..=state.max_commit_attempts {
        let current = state
            .store
            .get_progress(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("user not found: {}", user_id)))?;
        let update = apply_interaction(&current.progress, &interaction, &badges, &config.scoring, now);
        let commit = ProgressCommit {
            progress: update.progress.clone(),
            interaction: interaction.clone(),
            user_badges: update.user_badges.clone(),
        };
        if state
            .store
            .compare_and_set(user_id, current.version, &commit)
            .await?
        {
            committed = Some(update);
            break;
        }
        debug!(%user_id, attempt, "progress commit lost a race, retrying");
    }

    let Some(update) = committed else {
        warn!(%user_id, attempts = state.max_commit_attempts, "giving up on progress commit");
        return Err(EngineError::ConcurrentUpdateConflict {
            user_id: user_id.to_string(),
            attempts: state.max_commit_attempts,
        }
        .into());
    };

    info!(
        %user_id,
        case_id = %case.id,
        is_correct = interaction.is_correct,
        points = interaction.points_earned,
        badges = update.new_badges.len(),
        "answer committed"
    );

    let feedback = generate_feedback(state, &case, &interaction).await;
    if let Some(feedback) = &feedback {
        interaction.ai_feedback = Some(feedback.clone());
        if let Err(e) = state.store.attach_feedback(interaction.id, feedback).await {
            warn!(interaction_id = %interaction.id, error = %e, "failed to store feedback");
        }
    }

    // The answer is durable at this point; a failed history read only costs
    // the refreshed trends.
    let updated_progress = match recent_history(state, user_id).await {
        Ok(history) => with_trends(state, update.progress, &history),
        Err(e) => {
            warn!(%user_id, error = %e, "history unavailable, trends not refreshed");
            update.progress
        }
    };

    Ok(SubmitAnswerResponse {
        interaction_id: interaction.id,
        is_correct: interaction.is_correct,
        correct_answer_id: case.correct_answer_id.clone(),
        feedback,
        points_earned: interaction.points_earned,
        new_badges_unlocked: update.new_badges,
        updated_progress,
    })
}

/// Ask the adapter for feedback. Failure and timeout yield `None`; the
/// committed score is never affected.
async fn generate_feedback(
    state: &AppState,
    case: &ClinicalCase,
    interaction: &Interaction,
) -> Option<AIFeedback> {
    let adapter = state.feedback.as_ref()?;
    let timeout = state.feedback_timeout;

    let outcome = match tokio::time::timeout(timeout, adapter.generate(case, interaction)).await {
        Ok(result) => result,
        Err(_) => Err(EngineError::AdapterTimeout {
            millis: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    };

    match outcome {
        Ok(feedback) => Some(feedback),
        Err(e) => {
            warn!(
                interaction_id = %interaction.id,
                model = adapter.model(),
                error = %e,
                "feedback unavailable"
            );
            None
        }
    }
}
