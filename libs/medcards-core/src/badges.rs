//! Badge definitions and their award predicates.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::progress::UserProgress;
use crate::types::{Interaction, UserBadge};

/// Badge grouping shown in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeCategory {
    Achievement,
    Streak,
    Mastery,
    Speed,
    Special,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeRarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

/// Award rule of a badge, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BadgeCriteria {
    StreakReached {
        target: u32,
    },
    SpeedRun {
        max_seconds: u32,
        #[serde(default)]
        must_be_correct: bool,
    },
    SpecialtyMastery {
        /// Any specialty qualifies when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        specialty: Option<String>,
        min_cases: u32,
        min_rate: f64,
    },
    /// UTC hours, end exclusive; wraps past midnight when start > end.
    TimeOfDay {
        start_hour: u32,
        end_hour: u32,
    },
    CasesCompleted {
        target: u32,
    },
    CasesCorrect {
        target: u32,
    },
    LevelReached {
        target: u32,
    },
    /// Any criteria this build does not understand. Never satisfied.
    #[serde(other)]
    Unknown,
}

impl BadgeCriteria {
    /// Whether the criteria holds for the updated progress and the interaction
    /// that produced it.
    pub fn is_satisfied(&self, progress: &UserProgress, interaction: &Interaction) -> bool {
        match self {
            Self::StreakReached { target } => progress.overall_stats.current_streak >= *target,
            Self::SpeedRun {
                max_seconds,
                must_be_correct,
            } => {
                interaction.time_to_answer_seconds <= *max_seconds
                    && (!must_be_correct || interaction.is_correct)
            }
            Self::SpecialtyMastery {
                specialty,
                min_cases,
                min_rate,
            } => {
                let qualifies = |s: &crate::progress::SpecialtyProgress| {
                    s.attempts >= *min_cases && s.success_rate >= *min_rate
                };
                match specialty {
                    Some(name) => progress.specialties.get(name).is_some_and(qualifies),
                    None => progress.specialties.values().any(qualifies),
                }
            }
            Self::TimeOfDay {
                start_hour,
                end_hour,
            } => hour_in_window(interaction.created_at.hour(), *start_hour, *end_hour),
            Self::CasesCompleted { target } => {
                progress.overall_stats.total_cases_attempted >= *target
            }
            Self::CasesCorrect { target } => progress.overall_stats.total_cases_correct >= *target,
            Self::LevelReached { target } => progress.level >= *target,
            Self::Unknown => false,
        }
    }
}

fn hour_in_window(hour: u32, start: u32, end: u32) -> bool {
    if start <= end {
        start <= hour && hour < end
    } else {
        hour >= start || hour < end
    }
}

impl BadgeCriteria {
    /// Decode stored criteria, treating malformed known types like unknown ones.
    pub fn from_json(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or(Self::Unknown)
    }
}

fn lenient_criteria<'de, D>(deserializer: D) -> Result<BadgeCriteria, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(BadgeCriteria::from_json)
}

/// Static badge definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub code: String,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_emoji: Option<String>,
    #[serde(deserialize_with = "lenient_criteria")]
    pub criteria: BadgeCriteria,
    pub category: BadgeCategory,
    pub rarity: BadgeRarity,
    pub points_value: u32,
}

/// Badges from `catalog` that the snapshot satisfies and the user does not
/// hold yet. Each badge id appears at most once.
pub fn evaluate<'a>(
    catalog: &'a [Badge],
    progress: &UserProgress,
    interaction: &Interaction,
) -> Vec<&'a Badge> {
    let mut satisfied: Vec<&Badge> = Vec::new();
    for badge in catalog {
        if progress.badges_earned.contains(&badge.id)
            || satisfied.iter().any(|b| b.id == badge.id)
        {
            continue;
        }
        if badge.criteria.is_satisfied(progress, interaction) {
            satisfied.push(badge);
        }
    }
    satisfied
}

/// Evaluate and record newly earned badges on `progress`.
///
/// Returns the badge definitions and the join facts to persist. Running it
/// again on the same snapshot awards nothing.
pub fn award<'a>(
    catalog: &'a [Badge],
    progress: &mut UserProgress,
    interaction: &Interaction,
    now: DateTime<Utc>,
) -> (Vec<&'a Badge>, Vec<UserBadge>) {
    let earned = evaluate(catalog, progress, interaction);
    let mut facts = Vec::with_capacity(earned.len());
    for badge in &earned {
        if progress.badges_earned.insert(badge.id.clone()) {
            facts.push(UserBadge {
                id: Uuid::new_v4(),
                earned_at: now,
                user_id: interaction.user_id,
                badge_id: badge.id.clone(),
                earned_by_interaction_id: Some(interaction.id),
            });
        }
    }
    (earned, facts)
}
