//! Adaptive clinical case engine shared by the medcards backend.
//!
//! Provides:
//! - Case catalog filtering and the selection engine (weakness scoring,
//!   weighted strategy draw, constraint relaxation)
//! - Answer scoring, hint ladder and progress/XP bookkeeping
//! - Badge criteria and idempotent awarding
//! - Dashboard aggregation
//!
//! Everything here is synchronous and free of I/O. Randomness and the clock
//! are passed in by the caller.

pub mod badges;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod hints;
pub mod progress;
pub mod repository;
pub mod scoring;
pub mod selection;
pub mod types;

#[cfg(test)]
mod test_support;

pub use badges::{Badge, BadgeCategory, BadgeCriteria, BadgeRarity};
pub use config::{ConfigError, DashboardConfig, EngineConfig, ScoringConfig, SelectionConfig};
pub use dashboard::{build_dashboard, DashboardStats};
pub use error::{EngineError, Result};
pub use progress::{level_for_experience, OverallStats, SpecialtyProgress, Trend, UserProgress};
pub use repository::{CaseCatalog, CaseFilter, DifficultyBand};
pub use scoring::{apply_interaction, score_answer, AnswerSubmission, HintUsage, ProgressUpdate};
pub use selection::{Selection, SelectionEngine};
pub use types::{
    AIFeedback, ChatMessage, ChatRole, ClinicalCase, Interaction, NextCaseResponse, PrimaryGoal,
    SubmitAnswerResponse, User, UserBadge,
};
