//! Engine tunables.
//!
//! Defaults mirror the values the service ships with; the backend overrides
//! a subset from the environment.

use thiserror::Error;

use crate::types::{MAX_DIFFICULTY, MIN_DIFFICULTY};

/// Longest accepted cooldown window, one year.
pub const MAX_COOLDOWN_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("hint costs must be non-empty and strictly increasing: {0:?}")]
    HintCosts(Vec<u32>),

    #[error("{name} must be within {min}..={max}, got {value}")]
    OutOfRange {
        name: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
}

/// Parameters of the case selection engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionConfig {
    /// Success rate at or above which a specialty counts as mastered.
    pub mastery_threshold: f64,
    /// Attempts at which a specialty's rate is trusted at 50%.
    pub min_sample: u32,
    /// Age in days at which an attempt weighs half as much as a fresh one.
    pub recency_half_life_days: f64,
    /// Draw weight of the explore_new strategy.
    pub explore_baseline: f64,
    /// Correctly answered cases are not re-selected within this window.
    pub cooldown_hours: i64,
    /// Half-width of the difficulty band around the target difficulty.
    pub difficulty_band_width: u8,
    /// Target difficulty for a user with no history at all.
    pub starting_difficulty: u8,
    /// Attempts per window when deriving a trend.
    pub trend_window: usize,
    /// Minimum change in success rate between windows to report a trend.
    pub trend_threshold: f64,
    /// Point cost of each hint level, level 1 first.
    pub hint_costs: Vec<u32>,
    /// Confidence multiplier applied per relaxed constraint.
    pub relaxation_confidence_factor: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            mastery_threshold: 0.85,
            min_sample: 5,
            recency_half_life_days: 14.0,
            explore_baseline: 0.15,
            cooldown_hours: 72,
            difficulty_band_width: 0,
            starting_difficulty: 2,
            trend_window: 5,
            trend_threshold: 0.1,
            hint_costs: vec![5, 10, 20],
            relaxation_confidence_factor: 0.8,
        }
    }
}

/// Parameters of answer scoring and levelling.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    pub base_points_per_level: u32,
    pub target_time_base_seconds: u32,
    pub target_time_per_level_seconds: u32,
    /// Flat deduction when the answer took longer than the target time.
    pub time_penalty_points: u32,
    pub xp_per_level: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_points_per_level: 10,
            target_time_base_seconds: 90,
            target_time_per_level_seconds: 30,
            time_penalty_points: 5,
            xp_per_level: 100,
        }
    }
}

impl ScoringConfig {
    /// Points for a correct answer before deductions.
    pub fn base_points(&self, difficulty_level: u8) -> u32 {
        self.base_points_per_level * u32::from(difficulty_level)
    }

    /// Time within which an answer incurs no penalty.
    pub fn target_time_seconds(&self, difficulty_level: u8) -> u32 {
        let extra_levels = u32::from(difficulty_level.saturating_sub(MIN_DIFFICULTY));
        self.target_time_base_seconds + self.target_time_per_level_seconds * extra_levels
    }
}

/// Parameters of the dashboard aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub recent_activity_days: u32,
    pub weak_area_min_attempts: u32,
    pub recently_earned_badges: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            recent_activity_days: 7,
            weak_area_min_attempts: 3,
            recently_earned_badges: 3,
        }
    }
}

/// All engine parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineConfig {
    pub selection: SelectionConfig,
    pub scoring: ScoringConfig,
    pub dashboard: DashboardConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let costs = &self.selection.hint_costs;
        if costs.is_empty() || costs.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConfigError::HintCosts(costs.clone()));
        }

        check_range("mastery_threshold", self.selection.mastery_threshold, 0.0, 1.0)?;
        check_range("explore_baseline", self.selection.explore_baseline, 0.0, 1.0)?;
        check_range(
            "relaxation_confidence_factor",
            self.selection.relaxation_confidence_factor,
            0.0,
            1.0,
        )?;
        check_range(
            "starting_difficulty",
            f64::from(self.selection.starting_difficulty),
            f64::from(MIN_DIFFICULTY),
            f64::from(MAX_DIFFICULTY),
        )?;
        check_range(
            "cooldown_hours",
            self.selection.cooldown_hours as f64,
            0.0,
            MAX_COOLDOWN_HOURS as f64,
        )?;
        Ok(())
    }
}

fn check_range(name: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value.is_nan() || value < min || value > max {
        return Err(ConfigError::OutOfRange {
            name,
            min,
            max,
            value,
        });
    }
    Ok(())
}
