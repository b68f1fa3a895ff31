//! Adaptive next-case selection.
//!
//! A request goes through three stages:
//! - score every attempted specialty for weakness ([`weakness`])
//! - draw a strategy and a target specialty with the injected RNG
//! - query the catalog, relaxing constraints until a case is found

pub mod trend;
pub mod weakness;

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::hints::hint_ladder;
use crate::progress::UserProgress;
use crate::repository::{CaseCatalog, CaseFilter, DifficultyBand};
use crate::types::{
    ClinicalCase, Interaction, NextCaseResponse, PrimaryGoal, SelectionReasoning,
    SuccessCriteria, MAX_DIFFICULTY, MIN_DIFFICULTY,
};

pub use trend::{derive_trend, refresh_trends};
pub use weakness::{GoalWeights, SpecialtySignal};

/// Constraint dropped to find a case, in the order they are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relaxation {
    DifficultyBand,
    Cooldown,
    Specialty,
}

/// Outcome of a selection before it is rendered into a response.
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    pub case: &'a ClinicalCase,
    pub goal: PrimaryGoal,
    pub specialty: String,
    pub target_difficulty: u8,
    pub relaxed: Vec<Relaxation>,
    /// Signal of the targeted specialty; absent when exploring.
    pub signal: Option<SpecialtySignal>,
}

/// Selects the next case for a user.
#[derive(Debug, Clone, Default)]
pub struct SelectionEngine {
    pub config: EngineConfig,
}

impl SelectionEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Pick exactly one case. Fails only when the catalog has no active case.
    ///
    /// `history` is the user's recent interactions in any order; it feeds the
    /// recency decay and the cooldown window.
    pub fn select<'a, R: Rng + ?Sized>(
        &self,
        progress: &UserProgress,
        history: &[Interaction],
        catalog: &'a CaseCatalog,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Result<Selection<'a>> {
        if catalog.is_empty() {
            return Err(EngineError::not_found("case", "any active case"));
        }
        let config = &self.config.selection;

        let catalog_specialties = catalog.specialties();
        let signals =
            weakness::specialty_signals(progress, history, &catalog_specialties, config, now);
        let unseen: Vec<&str> = catalog_specialties
            .iter()
            .copied()
            .filter(|s| progress.specialties.get(*s).map_or(true, |p| p.attempts == 0))
            .collect();

        let weights = GoalWeights::compute(&signals, unseen.len(), config);
        let (goal, specialty, signal) = match weights.draw(rng) {
            Some(PrimaryGoal::AddressWeakness) => {
                let s = weakness::draw_weak_specialty(&signals, rng)
                    .ok_or_else(|| EngineError::not_found("specialty", "weak specialty"))?;
                (PrimaryGoal::AddressWeakness, s.specialty.clone(), Some(s.clone()))
            }
            Some(PrimaryGoal::ReinforceStrength) => {
                let s = weakness::reinforcement_target(&signals, config)
                    .ok_or_else(|| EngineError::not_found("specialty", "reinforcement target"))?;
                (PrimaryGoal::ReinforceStrength, s.specialty.clone(), Some(s.clone()))
            }
            Some(PrimaryGoal::ExploreNew) => {
                let pick = unseen[rng.gen_range(0..unseen.len())];
                (PrimaryGoal::ExploreNew, pick.to_string(), None)
            }
            None => fallback_target(&signals, &catalog_specialties),
        };

        let target_difficulty = target_difficulty(signal.as_ref(), progress, &self.config);
        let cooldown = cooldown_exclusions(history, now, config.cooldown_hours);
        let band = DifficultyBand::around(target_difficulty, config.difficulty_band_width);

        let ladder = [
            (
                vec![],
                CaseFilter {
                    specialty: Some(specialty.clone()),
                    difficulty_band: Some(band),
                    exclude_case_ids: cooldown.clone(),
                    ..Default::default()
                },
            ),
            (
                vec![Relaxation::DifficultyBand],
                CaseFilter {
                    specialty: Some(specialty.clone()),
                    exclude_case_ids: cooldown,
                    ..Default::default()
                },
            ),
            (
                vec![Relaxation::DifficultyBand, Relaxation::Cooldown],
                CaseFilter {
                    specialty: Some(specialty.clone()),
                    ..Default::default()
                },
            ),
            (
                vec![
                    Relaxation::DifficultyBand,
                    Relaxation::Cooldown,
                    Relaxation::Specialty,
                ],
                CaseFilter::default(),
            ),
        ];

        for (relaxed, filter) in ladder {
            if let Some(case) = least_presented(catalog.find(&filter)) {
                return Ok(Selection {
                    case,
                    goal,
                    specialty,
                    target_difficulty,
                    relaxed,
                    signal,
                });
            }
        }

        Err(EngineError::not_found("case", "any active case"))
    }

    /// Render a selection into the API response.
    pub fn respond(&self, selection: &Selection<'_>) -> NextCaseResponse {
        let case = selection.case;
        let selection_config = &self.config.selection;

        let key_reasoning_steps = if case.key_concepts.is_empty() {
            case.differential_diagnosis.clone()
        } else {
            case.key_concepts.clone()
        };

        NextCaseResponse {
            case: case.clone(),
            selection_reasoning: self.reasoning(selection),
            coaching_message: coaching_message(selection),
            hints_prepared: hint_ladder(case, &selection_config.hint_costs),
            success_criteria: SuccessCriteria {
                target_time_seconds: self
                    .config
                    .scoring
                    .target_time_seconds(case.difficulty_level),
                key_reasoning_steps,
            },
        }
    }

    fn reasoning(&self, selection: &Selection<'_>) -> SelectionReasoning {
        let config = &self.config.selection;
        let name = &selection.specialty;
        let certainty = selection.signal.as_ref().map_or(0.0, |s| s.certainty);

        let (specific_gap, expected_outcome, base_confidence) = match (&selection.signal, selection.goal) {
            (Some(s), PrimaryGoal::AddressWeakness) => {
                let mut gap = format!(
                    "{}: {:.0}% correct over {} attempts",
                    name,
                    s.success_rate * 100.0,
                    s.attempts
                );
                if s.attempts < config.min_sample {
                    gap.push_str(", too few attempts to judge");
                }
                (
                    gap,
                    format!(
                        "Close the gap in {} at difficulty {}",
                        name, selection.target_difficulty
                    ),
                    0.6 + 0.4 * certainty,
                )
            }
            (Some(s), _) => (
                format!(
                    "{}: {:.0}% correct, below the {:.0}% mastery threshold",
                    name,
                    s.success_rate * 100.0,
                    config.mastery_threshold * 100.0
                ),
                format!("Push {} toward mastery", name),
                0.5 + 0.4 * certainty,
            ),
            (None, _) => (
                format!("No attempts in {} yet", name),
                format!("Establish a baseline in {}", name),
                0.5,
            ),
        };

        let confidence = base_confidence
            * config
                .relaxation_confidence_factor
                .powi(selection.relaxed.len() as i32);

        SelectionReasoning {
            primary_goal: selection.goal,
            specialty_targeted: name.clone(),
            specific_gap,
            expected_outcome,
            confidence_this_helps: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Lowest `times_presented` first, then id.
fn least_presented(cases: Vec<&ClinicalCase>) -> Option<&ClinicalCase> {
    cases.into_iter().min_by(|a, b| {
        a.times_presented
            .cmp(&b.times_presented)
            .then_with(|| a.id.cmp(&b.id))
    })
}

/// Used only when every strategy weight is zero.
fn fallback_target(
    signals: &[SpecialtySignal],
    catalog_specialties: &BTreeSet<&str>,
) -> (PrimaryGoal, String, Option<SpecialtySignal>) {
    let weakest = signals.iter().fold(None, |best: Option<&SpecialtySignal>, s| match best {
        Some(b) if b.weakness >= s.weakness => Some(b),
        _ => Some(s),
    });
    match weakest {
        Some(s) => (PrimaryGoal::AddressWeakness, s.specialty.clone(), Some(s.clone())),
        None => (
            PrimaryGoal::ExploreNew,
            catalog_specialties
                .iter()
                .next()
                .map(|s| s.to_string())
                .unwrap_or_default(),
            None,
        ),
    }
}

/// `clamp(round(1 + 4 * rate), 1, 5)` for the targeted specialty, falling
/// back to the overall rate and then to the configured starting difficulty.
fn target_difficulty(
    signal: Option<&SpecialtySignal>,
    progress: &UserProgress,
    config: &EngineConfig,
) -> u8 {
    let rate = match signal {
        Some(s) => Some(s.decayed_rate),
        None if progress.overall_stats.total_cases_attempted > 0 => {
            Some(progress.overall_stats.success_rate())
        }
        None => None,
    };
    match rate {
        Some(rate) => {
            let level_proxy = 1.0 + 4.0 * rate;
            (level_proxy.round() as i64).clamp(i64::from(MIN_DIFFICULTY), i64::from(MAX_DIFFICULTY))
                as u8
        }
        None => config.selection.starting_difficulty,
    }
}

/// Ids of cases answered correctly inside the cooldown window.
fn cooldown_exclusions(history: &[Interaction], now: DateTime<Utc>, cooldown_hours: i64) -> Vec<String> {
    // An unrepresentable window covers the whole history
    let since = Duration::try_hours(cooldown_hours)
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let ids: BTreeSet<&str> = history
        .iter()
        .filter(|i| i.is_correct && i.created_at >= since)
        .map(|i| i.case_id.as_str())
        .collect();
    ids.into_iter().map(str::to_string).collect()
}

fn coaching_message(selection: &Selection<'_>) -> String {
    match selection.goal {
        PrimaryGoal::AddressWeakness => format!(
            "{} has been tricky lately. Take your time and reason step by step.",
            selection.specialty
        ),
        PrimaryGoal::ReinforceStrength => format!(
            "You are close to mastering {}. Lock it in with this one.",
            selection.specialty
        ),
        PrimaryGoal::ExploreNew => format!(
            "New territory: your first look at {}. Mistakes here are how you learn.",
            selection.specialty
        ),
    }
}
