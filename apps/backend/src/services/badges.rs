//! Badge catalog shipped with the service.

use chrono::{DateTime, TimeZone, Utc};
use tracing::info;

use crate::error::Result;
use crate::models::{Badge, BadgeCategory, BadgeCriteria, BadgeRarity};
use crate::store::Store;

#[allow(clippy::too_many_arguments)]
fn badge(
    id: &str,
    name: &str,
    description: &str,
    icon: &str,
    criteria: BadgeCriteria,
    category: BadgeCategory,
    rarity: BadgeRarity,
    points_value: u32,
    created_at: DateTime<Utc>,
) -> Badge {
    Badge {
        id: id.to_string(),
        created_at,
        code: id.to_uppercase(),
        name: name.to_string(),
        description: description.to_string(),
        icon_emoji: Some(icon.to_string()),
        criteria,
        category,
        rarity,
        points_value,
    }
}

/// Default badge definitions.
pub fn default_catalog() -> Vec<Badge> {
    let created = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single().unwrap_or_default();
    vec![
        badge(
            "first_case",
            "First Case",
            "Answer your first clinical case",
            "🩺",
            BadgeCriteria::CasesCompleted { target: 1 },
            BadgeCategory::Achievement,
            BadgeRarity::Common,
            10,
            created,
        ),
        badge(
            "fifty_correct",
            "Half Century",
            "Answer 50 cases correctly",
            "🎯",
            BadgeCriteria::CasesCorrect { target: 50 },
            BadgeCategory::Achievement,
            BadgeRarity::Rare,
            50,
            created,
        ),
        badge(
            "streak_5",
            "On a Roll",
            "Reach a streak of 5",
            "🔥",
            BadgeCriteria::StreakReached { target: 5 },
            BadgeCategory::Streak,
            BadgeRarity::Common,
            20,
            created,
        ),
        badge(
            "streak_30",
            "Unstoppable",
            "Reach a streak of 30",
            "⚡",
            BadgeCriteria::StreakReached { target: 30 },
            BadgeCategory::Streak,
            BadgeRarity::Epic,
            100,
            created,
        ),
        badge(
            "speed_demon",
            "Speed Demon",
            "Answer correctly in under 30 seconds",
            "⏱️",
            BadgeCriteria::SpeedRun {
                max_seconds: 30,
                must_be_correct: true,
            },
            BadgeCategory::Speed,
            BadgeRarity::Rare,
            25,
            created,
        ),
        badge(
            "cardiology_master",
            "Cardiology Master",
            "90% success over 20 cardiology cases",
            "❤️",
            BadgeCriteria::SpecialtyMastery {
                specialty: Some("cardiology".to_string()),
                min_cases: 20,
                min_rate: 0.9,
            },
            BadgeCategory::Mastery,
            BadgeRarity::Epic,
            100,
            created,
        ),
        badge(
            "specialist",
            "Specialist",
            "85% success over 15 cases in any specialty",
            "🏅",
            BadgeCriteria::SpecialtyMastery {
                specialty: None,
                min_cases: 15,
                min_rate: 0.85,
            },
            BadgeCategory::Mastery,
            BadgeRarity::Rare,
            50,
            created,
        ),
        badge(
            "night_shift",
            "Night Shift",
            "Answer a case between 22:00 and 04:00 UTC",
            "🌙",
            BadgeCriteria::TimeOfDay {
                start_hour: 22,
                end_hour: 4,
            },
            BadgeCategory::Special,
            BadgeRarity::Common,
            10,
            created,
        ),
        badge(
            "level_10",
            "Attending",
            "Reach level 10",
            "👑",
            BadgeCriteria::LevelReached { target: 10 },
            BadgeCategory::Achievement,
            BadgeRarity::Legendary,
            200,
            created,
        ),
    ]
}

/// Insert the default catalog. Existing definitions with the same id are
/// overwritten.
pub async fn ensure_default_badges(store: &dyn Store) -> Result<()> {
    let catalog = default_catalog();
    for badge in &catalog {
        store.upsert_badge(badge).await?;
    }
    info!(count = catalog.len(), "default badges installed");
    Ok(())
}
