//! Read-only dashboard aggregation over progress, history and badges.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::badges::Badge;
use crate::config::EngineConfig;
use crate::progress::{Trend, UserProgress};
use crate::selection::trend::{derive_trend, outcomes_for};
use crate::types::{Interaction, UserBadge};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardOverall {
    pub total_cases: u32,
    pub success_rate: f64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub avg_time_per_case: f64,
    pub level: u32,
    pub experience_points: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialtyPerformance {
    pub specialty: String,
    pub attempts: u32,
    pub success_rate: f64,
    pub trend: Trend,
}

/// One calendar day (UTC) of activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub cases_completed: u32,
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeakArea {
    pub clinical_algorithm: String,
    pub specialty: String,
    pub success_rate: f64,
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgesProgress {
    pub total_earned: usize,
    pub total_available: usize,
    pub recently_earned: Vec<Badge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub overall_stats: DashboardOverall,
    pub specialty_performance: Vec<SpecialtyPerformance>,
    pub recent_activity: Vec<DailyActivity>,
    pub weak_areas: Vec<WeakArea>,
    pub badges_progress: BadgesProgress,
}

/// Build the dashboard for one user.
///
/// `history` should cover at least the recent-activity window and enough
/// attempts per specialty for trends; anything older is ignored where it
/// does not matter.
pub fn build_dashboard(
    progress: &UserProgress,
    history: &[Interaction],
    badge_catalog: &[Badge],
    user_badges: &[UserBadge],
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> DashboardStats {
    let overall = &progress.overall_stats;
    DashboardStats {
        overall_stats: DashboardOverall {
            total_cases: overall.total_cases_attempted,
            success_rate: overall.success_rate(),
            current_streak: overall.current_streak,
            longest_streak: overall.longest_streak,
            avg_time_per_case: overall.avg_time_per_case(),
            level: progress.level,
            experience_points: progress.experience_points,
        },
        specialty_performance: specialty_performance(progress, history, config),
        recent_activity: recent_activity(history, config.dashboard.recent_activity_days, now),
        weak_areas: weak_areas(history, config),
        badges_progress: badges_progress(badge_catalog, user_badges, progress, config),
    }
}

fn specialty_performance(
    progress: &UserProgress,
    history: &[Interaction],
    config: &EngineConfig,
) -> Vec<SpecialtyPerformance> {
    let mut performance: Vec<SpecialtyPerformance> = progress
        .specialties
        .iter()
        .map(|(name, stats)| {
            let outcomes = outcomes_for(history, name);
            SpecialtyPerformance {
                specialty: name.clone(),
                attempts: stats.attempts,
                success_rate: stats.success_rate,
                trend: derive_trend(
                    stats.attempts,
                    &outcomes,
                    config.selection.trend_window,
                    config.selection.trend_threshold,
                ),
            }
        })
        .collect();
    // Most practised first; the map already gives name order for ties
    performance.sort_by(|a, b| b.attempts.cmp(&a.attempts));
    performance
}

fn recent_activity(history: &[Interaction], days: u32, now: DateTime<Utc>) -> Vec<DailyActivity> {
    let today = now.date_naive();
    let mut by_day: BTreeMap<NaiveDate, (u32, u32)> = (0..days)
        .rev()
        .map(|offset| (today - Duration::days(i64::from(offset)), (0, 0)))
        .collect();

    for interaction in history {
        if let Some((completed, correct)) = by_day.get_mut(&interaction.created_at.date_naive()) {
            *completed += 1;
            if interaction.is_correct {
                *correct += 1;
            }
        }
    }

    by_day
        .into_iter()
        .map(|(date, (completed, correct))| DailyActivity {
            date,
            cases_completed: completed,
            success_rate: if completed == 0 {
                0.0
            } else {
                f64::from(correct) / f64::from(completed)
            },
        })
        .collect()
}

fn weak_areas(history: &[Interaction], config: &EngineConfig) -> Vec<WeakArea> {
    let mut groups: BTreeMap<(&str, &str), (u32, u32)> = BTreeMap::new();
    for interaction in history {
        let entry = groups
            .entry((interaction.clinical_algorithm.as_str(), interaction.specialty.as_str()))
            .or_default();
        entry.0 += 1;
        if interaction.is_correct {
            entry.1 += 1;
        }
    }

    let mut areas: Vec<WeakArea> = groups
        .into_iter()
        .filter(|(_, (attempts, _))| *attempts >= config.dashboard.weak_area_min_attempts)
        .map(|((algorithm, specialty), (attempts, correct))| WeakArea {
            clinical_algorithm: algorithm.to_string(),
            specialty: specialty.to_string(),
            success_rate: f64::from(correct) / f64::from(attempts),
            attempts,
        })
        .filter(|area| area.success_rate < config.selection.mastery_threshold)
        .collect();
    areas.sort_by(|a, b| a.success_rate.total_cmp(&b.success_rate));
    areas
}

fn badges_progress(
    catalog: &[Badge],
    user_badges: &[UserBadge],
    progress: &UserProgress,
    config: &EngineConfig,
) -> BadgesProgress {
    let mut earned: Vec<&UserBadge> = user_badges.iter().collect();
    earned.sort_by(|a, b| b.earned_at.cmp(&a.earned_at));

    let recently_earned = earned
        .into_iter()
        .filter_map(|ub| catalog.iter().find(|b| b.id == ub.badge_id))
        .take(config.dashboard.recently_earned_badges)
        .cloned()
        .collect();

    BadgesProgress {
        total_earned: progress.badges_earned.len(),
        total_available: catalog.len(),
        recently_earned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::badges::{BadgeCategory, BadgeCriteria, BadgeRarity};
    use crate::test_support::{at, interaction};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn badge(id: &str) -> Badge {
        Badge {
            id: id.to_string(),
            created_at: at(2025, 1, 1, 0),
            code: id.to_uppercase(),
            name: id.to_string(),
            description: String::new(),
            icon_emoji: None,
            criteria: BadgeCriteria::CasesCompleted { target: 1 },
            category: BadgeCategory::Achievement,
            rarity: BadgeRarity::Common,
            points_value: 0,
        }
    }

    fn earned(badge_id: &str, earned_at: DateTime<Utc>) -> UserBadge {
        UserBadge {
            id: Uuid::new_v4(),
            earned_at,
            user_id: Uuid::nil(),
            badge_id: badge_id.to_string(),
            earned_by_interaction_id: None,
        }
    }

    fn replay(history: &[Interaction]) -> UserProgress {
        let mut progress = UserProgress::default();
        for i in history {
            progress.record(i, 100);
        }
        progress
    }

    #[test]
    fn recent_activity_covers_every_day() {
        let now = at(2026, 6, 10, 12);
        let history = vec![
            interaction("cardiology", true, 30, 10, at(2026, 6, 10, 8)),
            interaction("cardiology", false, 30, 0, at(2026, 6, 10, 9)),
            interaction("cardiology", true, 30, 10, at(2026, 6, 8, 9)),
            interaction("cardiology", true, 30, 10, at(2026, 5, 1, 9)),
        ];
        let activity = recent_activity(&history, 7, now);
        assert_eq!(activity.len(), 7);
        assert_eq!(activity[0].date, NaiveDate::from_ymd_opt(2026, 6, 4).unwrap());
        assert_eq!(activity[6].cases_completed, 2);
        assert_eq!(activity[6].success_rate, 0.5);
        assert_eq!(activity[4].cases_completed, 1);
        let total: u32 = activity.iter().map(|d| d.cases_completed).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn weak_areas_need_enough_attempts_and_low_rate() {
        let config = EngineConfig::default();
        let mut history = Vec::new();
        for day in 1..=4 {
            history.push(interaction("cardiology", day == 1, 30, 0, at(2026, 6, day, 8)));
            history.push(interaction("dermatology", true, 30, 10, at(2026, 6, day, 9)));
        }
        history.push(interaction("neurology", false, 30, 0, at(2026, 6, 5, 9)));

        let areas = weak_areas(&history, &config);
        assert_eq!(areas.len(), 1);
        assert_eq!(areas[0].specialty, "cardiology");
        assert_eq!(areas[0].clinical_algorithm, "cardiology-core");
        assert_eq!(areas[0].attempts, 4);
        assert_eq!(areas[0].success_rate, 0.25);
    }

    #[test]
    fn dashboard_summarises_progress_and_badges() {
        let now = at(2026, 6, 10, 12);
        let history: Vec<Interaction> = (1..=6)
            .map(|day| interaction("cardiology", day % 2 == 0, 60, 10, at(2026, 6, day, 8)))
            .collect();
        let mut progress = replay(&history);
        progress.badges_earned.insert("first".to_string());
        progress.badges_earned.insert("second".to_string());

        let catalog = vec![badge("first"), badge("second"), badge("third")];
        let user_badges = vec![
            earned("first", at(2026, 6, 1, 8)),
            earned("second", at(2026, 6, 2, 8)),
        ];

        let stats = build_dashboard(
            &progress,
            &history,
            &catalog,
            &user_badges,
            &EngineConfig::default(),
            now,
        );
        assert_eq!(stats.overall_stats.total_cases, 6);
        assert_eq!(stats.overall_stats.success_rate, 0.5);
        assert_eq!(stats.overall_stats.avg_time_per_case, 60.0);
        assert_eq!(stats.specialty_performance.len(), 1);
        assert_eq!(stats.specialty_performance[0].trend, Trend::Improving);
        assert_eq!(stats.badges_progress.total_earned, 2);
        assert_eq!(stats.badges_progress.total_available, 3);
        let recent: Vec<&str> = stats
            .badges_progress
            .recently_earned
            .iter()
            .map(|b| b.id.as_str())
            .collect();
        assert_eq!(recent, vec!["second", "first"]);
    }
}
