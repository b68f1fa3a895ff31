//! Weakness scoring and the weighted strategy draw.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::config::SelectionConfig;
use crate::progress::UserProgress;
use crate::types::{Interaction, PrimaryGoal};

/// How much a specialty needs attention.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecialtySignal {
    pub specialty: String,
    pub attempts: u32,
    pub success_rate: f64,
    /// Success rate with older attempts weighing less.
    pub decayed_rate: f64,
    /// Trust in `decayed_rate`, grows with attempts towards 1.
    pub certainty: f64,
    /// In [0, 1]; 1 means no evidence of competence at all.
    pub weakness: f64,
}

/// Success rate over `history` with exponential recency decay. `None` when
/// there is nothing to weigh.
pub fn decayed_success_rate<'a>(
    history: impl IntoIterator<Item = &'a Interaction>,
    now: DateTime<Utc>,
    half_life_days: f64,
) -> Option<f64> {
    let (mut weighted_correct, mut total_weight) = (0.0, 0.0);
    for interaction in history {
        let age_days = (now - interaction.created_at).num_seconds().max(0) as f64 / 86_400.0;
        let weight = if half_life_days > 0.0 {
            0.5f64.powf(age_days / half_life_days)
        } else {
            1.0
        };
        total_weight += weight;
        if interaction.is_correct {
            weighted_correct += weight;
        }
    }
    (total_weight > 0.0).then(|| weighted_correct / total_weight)
}

/// Signals for every attempted specialty in `candidates`, in name order.
pub fn specialty_signals(
    progress: &UserProgress,
    history: &[Interaction],
    candidates: &BTreeSet<&str>,
    config: &SelectionConfig,
    now: DateTime<Utc>,
) -> Vec<SpecialtySignal> {
    progress
        .specialties
        .iter()
        .filter(|(name, stats)| stats.attempts > 0 && candidates.contains(name.as_str()))
        .map(|(name, stats)| {
            let decayed_rate = decayed_success_rate(
                history.iter().filter(|i| i.specialty == *name),
                now,
                config.recency_half_life_days,
            )
            .unwrap_or(stats.success_rate);
            let attempts = f64::from(stats.attempts);
            let certainty = attempts / (attempts + f64::from(config.min_sample));
            SpecialtySignal {
                specialty: name.clone(),
                attempts: stats.attempts,
                success_rate: stats.success_rate,
                decayed_rate,
                certainty,
                weakness: certainty * (1.0 - decayed_rate) + (1.0 - certainty),
            }
        })
        .collect()
}

/// Draw weights of the three strategies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalWeights {
    pub address_weakness: f64,
    pub reinforce_strength: f64,
    pub explore_new: f64,
}

impl GoalWeights {
    pub fn compute(signals: &[SpecialtySignal], unseen: usize, config: &SelectionConfig) -> Self {
        let address_weakness = signals.iter().map(|s| s.weakness).fold(0.0, f64::max);
        let reinforce_strength = reinforcement_target(signals, config)
            .map(|s| s.success_rate)
            .unwrap_or(0.0);
        let explore_new = if unseen > 0 {
            config.explore_baseline
        } else {
            0.0
        };
        Self {
            address_weakness,
            reinforce_strength,
            explore_new,
        }
    }

    /// Weighted draw; `None` when every weight is zero.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<PrimaryGoal> {
        let goals = [
            (PrimaryGoal::AddressWeakness, self.address_weakness),
            (PrimaryGoal::ReinforceStrength, self.reinforce_strength),
            (PrimaryGoal::ExploreNew, self.explore_new),
        ];
        let dist = WeightedIndex::new(goals.iter().map(|(_, w)| w.max(0.0))).ok()?;
        Some(goals[dist.sample(rng)].0)
    }
}

/// Specialty drawn with probability proportional to its weakness.
pub fn draw_weak_specialty<'a, R: Rng + ?Sized>(
    signals: &'a [SpecialtySignal],
    rng: &mut R,
) -> Option<&'a SpecialtySignal> {
    let dist = WeightedIndex::new(signals.iter().map(|s| s.weakness.max(0.0))).ok()?;
    Some(&signals[dist.sample(rng)])
}

/// Strongest specialty still below the mastery threshold.
pub fn reinforcement_target<'a>(
    signals: &'a [SpecialtySignal],
    config: &SelectionConfig,
) -> Option<&'a SpecialtySignal> {
    signals
        .iter()
        .filter(|s| s.success_rate < config.mastery_threshold)
        .fold(None, |best: Option<&SpecialtySignal>, s| match best {
            Some(b) if b.success_rate >= s.success_rate => Some(b),
            _ => Some(s),
        })
}
