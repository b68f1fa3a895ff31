//! Database models and API types

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{ApiError, Result};

// Re-export shared types from medcards-core
pub use medcards_core::badges::{Badge, BadgeCategory, BadgeCriteria, BadgeRarity};
pub use medcards_core::dashboard::DashboardStats;
pub use medcards_core::scoring::{AnswerSubmission, HintUsage};
pub use medcards_core::types::{
    AIFeedback, ChatMessage, ChatRole, ClinicalCase, Interaction, NextCaseResponse,
    SubmitAnswerResponse, SubscriptionStatus, User, UserBadge, UserPreferences,
};
pub use medcards_core::UserProgress;

/// Encode a unit enum as its serde name, e.g. `BadgeRarity::Epic` -> `"epic"`.
pub fn enum_to_str<T: Serialize>(value: &T) -> Result<String> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => Ok(s),
        Ok(other) => Err(ApiError::Internal(format!("expected string enum, got {}", other))),
        Err(e) => Err(ApiError::Internal(e.to_string())),
    }
}

/// Decode a unit enum stored as text.
pub fn enum_from_str<T: DeserializeOwned>(column: &str, value: &str) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|e| ApiError::Internal(format!("bad {} value {:?}: {}", column, value, e)))
}

// === Database Entity Types ===

/// User row. Progress is a JSONB document guarded by `progress_version`.
#[derive(Debug, Clone, FromRow)]
pub struct DbUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub progress: Json<UserProgress>,
    pub progress_version: i64,
    pub preferences: Json<UserPreferences>,
    pub subscription_status: String,
    pub subscription_ends_at: Option<DateTime<Utc>>,
}

impl DbUser {
    pub fn into_user(self) -> Result<User> {
        Ok(User {
            id: self.id,
            email: self.email,
            full_name: self.full_name,
            created_at: self.created_at,
            updated_at: self.updated_at,
            progress: self.progress.0,
            preferences: self.preferences.0,
            subscription_status: enum_from_str("subscription_status", &self.subscription_status)?,
            subscription_ends_at: self.subscription_ends_at,
        })
    }
}

/// Catalog row; filter columns are copies of document fields.
#[derive(Debug, Clone, FromRow)]
pub struct DbCase {
    pub id: String,
    pub document: Json<ClinicalCase>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbInteraction {
    pub id: Uuid,
    pub document: Json<Interaction>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbBadge {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub code: String,
    pub name: String,
    pub description: String,
    pub icon_emoji: Option<String>,
    pub criteria: Json<serde_json::Value>,
    pub category: String,
    pub rarity: String,
    pub points_value: i32,
}

impl DbBadge {
    pub fn into_badge(self) -> Result<Badge> {
        Ok(Badge {
            id: self.id,
            created_at: self.created_at,
            code: self.code,
            name: self.name,
            description: self.description,
            icon_emoji: self.icon_emoji,
            criteria: BadgeCriteria::from_json(self.criteria.0),
            category: enum_from_str("category", &self.category)?,
            rarity: enum_from_str("rarity", &self.rarity)?,
            points_value: self.points_value.max(0) as u32,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbUserBadge {
    pub id: Uuid,
    pub earned_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub badge_id: String,
    pub earned_by_interaction_id: Option<Uuid>,
}

impl From<DbUserBadge> for UserBadge {
    fn from(row: DbUserBadge) -> Self {
        UserBadge {
            id: row.id,
            earned_at: row.earned_at,
            user_id: row.user_id,
            badge_id: row.badge_id,
            earned_by_interaction_id: row.earned_by_interaction_id,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbChatMessage {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub role: String,
    pub content: String,
    pub session_id: Option<Uuid>,
    pub related_case_id: Option<String>,
    pub token_count: Option<i32>,
    pub model_used: String,
}

impl DbChatMessage {
    pub fn into_message(self) -> Result<ChatMessage> {
        Ok(ChatMessage {
            id: self.id,
            created_at: self.created_at,
            user_id: self.user_id,
            role: enum_from_str("role", &self.role)?,
            content: self.content,
            session_id: self.session_id,
            related_case_id: self.related_case_id,
            token_count: self.token_count.map(|t| t.max(0) as u32),
            model_used: self.model_used,
        })
    }
}

// === Store Types ===

/// Progress snapshot with the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedProgress {
    pub progress: UserProgress,
    pub version: i64,
}

/// Everything a submission persists at once.
#[derive(Debug, Clone)]
pub struct ProgressCommit {
    pub progress: UserProgress,
    pub interaction: Interaction,
    pub user_badges: Vec<UserBadge>,
}

/// Interaction log query. Results are newest first.
#[derive(Debug, Clone, Default)]
pub struct InteractionFilter {
    pub user_id: Uuid,
    pub specialty: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_correct: Option<bool>,
    pub limit: Option<usize>,
}

impl InteractionFilter {
    pub fn for_user(user_id: Uuid) -> Self {
        Self {
            user_id,
            ..Default::default()
        }
    }

    pub fn matches(&self, interaction: &Interaction) -> bool {
        interaction.user_id == self.user_id
            && self
                .specialty
                .as_ref()
                .map_or(true, |s| *s == interaction.specialty)
            && self.start_date.map_or(true, |d| interaction.created_at >= d)
            && self.end_date.map_or(true, |d| interaction.created_at <= d)
            && self.is_correct.map_or(true, |c| c == interaction.is_correct)
    }
}

// === API Request/Response Types ===

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Query string of `GET /api/users/:user_id/interactions`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct InteractionQuery {
    pub specialty: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_correct: Option<bool>,
    pub limit: Option<usize>,
}

impl InteractionQuery {
    pub fn into_filter(self, user_id: Uuid) -> InteractionFilter {
        InteractionFilter {
            user_id,
            specialty: self.specialty,
            start_date: self.start_date,
            end_date: self.end_date,
            is_correct: self.is_correct,
            limit: self.limit,
        }
    }
}

/// Query string of `GET /api/users/:user_id/chat-messages`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ChatQuery {
    pub session_id: Option<Uuid>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateChatMessageRequest {
    pub role: ChatRole,
    pub content: String,
    #[serde(default)]
    pub session_id: Option<Uuid>,
    #[serde(default)]
    pub related_case_id: Option<String>,
    #[serde(default)]
    pub token_count: Option<u32>,
    #[serde(default)]
    pub model_used: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportCasesRequest {
    pub cases: Vec<ClinicalCase>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportCasesResponse {
    pub imported: usize,
}
