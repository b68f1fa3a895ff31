//! Per-user progress aggregate and its update rules.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Interaction;

/// Direction of recent performance in a specialty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
    New,
}

impl Default for Trend {
    fn default() -> Self {
        Self::New
    }
}

/// Statistics for one specialty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialtyProgress {
    pub attempts: u32,
    pub correct: u32,
    pub success_rate: f64,
    pub avg_time_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_attempt: Option<DateTime<Utc>>,
    /// Derived from history on read; a stored value is never trusted.
    #[serde(default)]
    pub trend: Trend,
}

impl Default for SpecialtyProgress {
    fn default() -> Self {
        Self {
            attempts: 0,
            correct: 0,
            success_rate: 0.0,
            avg_time_seconds: 0.0,
            last_attempt: None,
            trend: Trend::New,
        }
    }
}

impl SpecialtyProgress {
    fn record(&mut self, is_correct: bool, time_seconds: u32, at: DateTime<Utc>) {
        self.attempts += 1;
        if is_correct {
            self.correct += 1;
        }
        self.success_rate = f64::from(self.correct) / f64::from(self.attempts);
        // Running mean
        self.avg_time_seconds +=
            (f64::from(time_seconds) - self.avg_time_seconds) / f64::from(self.attempts);
        self.last_attempt = Some(match self.last_attempt {
            Some(prev) if prev > at => prev,
            _ => at,
        });
    }
}

/// Totals across all specialties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallStats {
    pub total_cases_attempted: u32,
    pub total_cases_correct: u32,
    pub total_time_spent_seconds: u64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_activity_date: Option<NaiveDate>,
}

impl OverallStats {
    pub fn success_rate(&self) -> f64 {
        if self.total_cases_attempted == 0 {
            0.0
        } else {
            f64::from(self.total_cases_correct) / f64::from(self.total_cases_attempted)
        }
    }

    pub fn avg_time_per_case(&self) -> f64 {
        if self.total_cases_attempted == 0 {
            0.0
        } else {
            self.total_time_spent_seconds as f64 / f64::from(self.total_cases_attempted)
        }
    }

    /// A correct answer extends the streak when the previous activity was
    /// today or yesterday; anything else restarts it at 1.
    fn update_streak(&mut self, is_correct: bool, day: NaiveDate) {
        let contiguous = match (self.last_activity_date, day.pred_opt()) {
            (Some(last), Some(yesterday)) => last >= yesterday,
            (Some(last), None) => last >= day,
            (None, _) => false,
        };

        self.current_streak = if is_correct && contiguous {
            self.current_streak + 1
        } else {
            1
        };
        self.longest_streak = self.longest_streak.max(self.current_streak);
        self.last_activity_date = Some(match self.last_activity_date {
            Some(last) if last > day => last,
            _ => day,
        });
    }
}

/// Per-user progress aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProgress {
    #[serde(default)]
    pub specialties: BTreeMap<String, SpecialtyProgress>,
    #[serde(default)]
    pub overall_stats: OverallStats,
    #[serde(default)]
    pub badges_earned: BTreeSet<String>,
    pub level: u32,
    pub experience_points: u64,
}

impl Default for UserProgress {
    fn default() -> Self {
        Self {
            specialties: BTreeMap::new(),
            overall_stats: OverallStats::default(),
            badges_earned: BTreeSet::new(),
            level: 1,
            experience_points: 0,
        }
    }
}

impl UserProgress {
    /// Stats for a specialty, defaulting when it has never been attempted.
    pub fn specialty(&self, name: &str) -> SpecialtyProgress {
        self.specialties.get(name).cloned().unwrap_or_default()
    }

    /// Fold a scored interaction into the aggregate.
    pub fn record(&mut self, interaction: &Interaction, xp_per_level: u64) {
        let at = interaction.created_at;

        self.specialties
            .entry(interaction.specialty.clone())
            .or_default()
            .record(interaction.is_correct, interaction.time_to_answer_seconds, at);

        let overall = &mut self.overall_stats;
        overall.total_cases_attempted += 1;
        if interaction.is_correct {
            overall.total_cases_correct += 1;
        }
        overall.total_time_spent_seconds += u64::from(interaction.time_to_answer_seconds);
        overall.update_streak(interaction.is_correct, at.date_naive());

        self.experience_points += u64::from(interaction.points_earned);
        self.level = level_for_experience(self.experience_points, xp_per_level);
    }
}

/// Monotonic experience → level curve: `1 + floor(sqrt(xp / xp_per_level))`.
pub fn level_for_experience(experience_points: u64, xp_per_level: u64) -> u32 {
    let units = experience_points / xp_per_level.max(1);
    let mut root = (units as f64).sqrt() as u64;
    // Correct float rounding at perfect squares
    while root * root > units {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= units {
        root += 1;
    }
    1 + root as u32
}
