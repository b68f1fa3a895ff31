//! Answer scoring and the pure progress transition applied per submission.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::badges::{self, Badge};
use crate::config::{EngineConfig, ScoringConfig};
use crate::error::{EngineError, Result};
use crate::hints::hint_ladder;
use crate::progress::UserProgress;
use crate::types::{ClinicalCase, Hint, Interaction, UserBadge};

/// A hint the student revealed before answering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintUsage {
    pub hint_level: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_at: Option<DateTime<Utc>>,
}

/// Answer as submitted by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerSubmission {
    pub case_id: String,
    pub selected_answer_id: String,
    pub time_to_answer_seconds: u32,
    #[serde(default)]
    pub hints_used: Vec<HintUsage>,
    #[serde(default)]
    pub student_reasoning: Option<String>,
    #[serde(default)]
    pub confidence_level: Option<u8>,
    #[serde(default)]
    pub ai_coach_consulted: bool,
    #[serde(default)]
    pub session_id: Option<Uuid>,
    #[serde(default)]
    pub was_adaptive_selection: bool,
    #[serde(default)]
    pub adaptive_reason: Option<String>,
}

/// Points for an answer: base by difficulty minus hint costs and the late
/// penalty, floored at zero. Wrong answers earn nothing.
pub fn points_earned(
    config: &ScoringConfig,
    difficulty_level: u8,
    is_correct: bool,
    hint_cost: u32,
    time_to_answer_seconds: u32,
) -> u32 {
    if !is_correct {
        return 0;
    }
    let late_penalty = if time_to_answer_seconds <= config.target_time_seconds(difficulty_level) {
        0
    } else {
        config.time_penalty_points
    };
    config
        .base_points(difficulty_level)
        .saturating_sub(hint_cost)
        .saturating_sub(late_penalty)
}

/// Validate a submission against its case and freeze the result into an
/// interaction. Correctness is decided here once and never recomputed.
pub fn score_answer(
    case: &ClinicalCase,
    user_id: Uuid,
    submission: &AnswerSubmission,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> Result<Interaction> {
    if case.option(&submission.selected_answer_id).is_none() {
        return Err(EngineError::InvalidAnswer {
            case_id: case.id.clone(),
            selected: submission.selected_answer_id.clone(),
        });
    }

    let ladder = hint_ladder(case, &config.selection.hint_costs);
    let levels: BTreeSet<u8> = submission.hints_used.iter().map(|h| h.hint_level).collect();
    let mut hints = Vec::with_capacity(levels.len());
    for level in levels {
        let prepared = ladder
            .iter()
            .find(|h| h.hint_level == level)
            .ok_or_else(|| EngineError::InvalidHint {
                case_id: case.id.clone(),
                level,
            })?;
        let timestamp = submission
            .hints_used
            .iter()
            .find(|h| h.hint_level == level)
            .and_then(|h| h.used_at)
            .unwrap_or(now);
        hints.push(Hint {
            hint_level: level,
            hint_text: prepared.hint_text.clone(),
            points_cost: prepared.points_cost,
            timestamp,
        });
    }

    let is_correct = submission.selected_answer_id == case.correct_answer_id;
    let hint_cost: u32 = hints.iter().map(|h| h.points_cost).sum();
    let points = points_earned(
        &config.scoring,
        case.difficulty_level,
        is_correct,
        hint_cost,
        submission.time_to_answer_seconds,
    );

    Ok(Interaction {
        id: Uuid::new_v4(),
        created_at: now,
        user_id,
        case_id: case.id.clone(),
        specialty: case.specialty.clone(),
        clinical_algorithm: case.clinical_algorithm.clone(),
        selected_answer_id: submission.selected_answer_id.clone(),
        is_correct,
        time_to_answer_seconds: submission.time_to_answer_seconds,
        student_reasoning: submission.student_reasoning.clone(),
        confidence_level: submission.confidence_level.filter(|c| (1..=5).contains(c)),
        hint_count: hints.len() as u32,
        hints_used: hints,
        ai_coach_consulted: submission.ai_coach_consulted,
        ai_feedback: None,
        session_id: submission.session_id,
        was_adaptive_selection: submission.was_adaptive_selection,
        adaptive_reason: submission.adaptive_reason.clone(),
        points_earned: points,
    })
}

/// Next progress state plus the badge facts it produced.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub progress: UserProgress,
    pub new_badges: Vec<Badge>,
    pub user_badges: Vec<UserBadge>,
}

/// Apply a scored interaction to a progress snapshot. `current` is left
/// untouched so a failed commit can simply retry from a fresh snapshot.
pub fn apply_interaction(
    current: &UserProgress,
    interaction: &Interaction,
    catalog: &[Badge],
    config: &ScoringConfig,
    now: DateTime<Utc>,
) -> ProgressUpdate {
    let mut progress = current.clone();
    progress.record(interaction, config.xp_per_level);

    let (earned, user_badges) = badges::award(catalog, &mut progress, interaction, now);
    let new_badges = earned.into_iter().cloned().collect();

    ProgressUpdate {
        progress,
        new_badges,
        user_badges,
    }
}
