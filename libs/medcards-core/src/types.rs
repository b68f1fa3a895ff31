//! Core types for the case-study engine.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::badges::Badge;
use crate::error::{EngineError, Result};
use crate::progress::UserProgress;

/// Lowest difficulty a case can have.
pub const MIN_DIFFICULTY: u8 = 1;
/// Highest difficulty a case can have.
pub const MAX_DIFFICULTY: u8 = 5;

/// Subscription tier of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Free,
    Trial,
    Paid,
    Cancelled,
}

impl Default for SubscriptionStatus {
    fn default() -> Self {
        Self::Free
    }
}

/// UI theme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Light,
    Dark,
}

impl Default for Theme {
    fn default() -> Self {
        Self::Light
    }
}

/// Study preferences of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub daily_goal_cases: u32,
    #[serde(default)]
    pub preferred_specialties: Vec<String>,
    pub notification_enabled: bool,
    pub theme: Theme,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            daily_goal_cases: 10,
            preferred_specialties: Vec::new(),
            notification_enabled: true,
            theme: Theme::default(),
        }
    }
}

/// Registered learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub progress: UserProgress,
    pub preferences: UserPreferences,
    pub subscription_status: SubscriptionStatus,
    pub subscription_ends_at: Option<DateTime<Utc>>,
}

impl User {
    /// Create a new user with empty progress.
    pub fn new(email: String, full_name: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            full_name,
            created_at: now,
            updated_at: now,
            progress: UserProgress::default(),
            preferences: UserPreferences::default(),
            subscription_status: SubscriptionStatus::default(),
            subscription_ends_at: None,
        }
    }
}

/// Patient sex as recorded in the case bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "masculino")]
    Male,
    #[serde(rename = "feminino")]
    Female,
}

/// Vital signs at presentation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blood_pressure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub respiratory_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spo2: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub glasgow: Option<u32>,
}

/// Patient data attached to a case. Unknown fields are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientData {
    pub age: u32,
    pub sex: Sex,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vitals: Option<Vitals>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labs: Option<BTreeMap<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imaging: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ecg: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comorbidities: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub medications: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One answer option ("A", "B", ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseOption {
    pub id: String,
    pub text: String,
    pub is_correct: bool,
}

fn default_active() -> bool {
    true
}

/// Catalog entry. Immutable from the point of view of gameplay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalCase {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub case_code: String,
    pub title: String,
    pub clinical_presentation: String,
    pub patient_data: PatientData,
    pub question: String,
    pub options: Vec<CaseOption>,
    pub correct_answer_id: String,
    pub explanation: String,
    pub clinical_reasoning: String,
    #[serde(default)]
    pub key_concepts: Vec<String>,
    #[serde(default)]
    pub differential_diagnosis: Vec<String>,
    pub specialty: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subspecialty: Option<String>,
    pub difficulty_level: u8,
    pub clinical_algorithm: String,
    #[serde(default)]
    pub times_presented: u32,
    #[serde(default)]
    pub times_answered_correctly: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_time_to_answer_seconds: Option<f64>,
    #[serde(default)]
    pub global_success_rate: f64,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl ClinicalCase {
    /// Look up an option by id.
    pub fn option(&self, id: &str) -> Option<&CaseOption> {
        self.options.iter().find(|o| o.id == id)
    }

    /// Check catalog invariants: difficulty in range, unique option ids and
    /// exactly one correct option which matches `correct_answer_id`.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| EngineError::InvalidCase {
            case_id: self.id.clone(),
            reason,
        };

        if self.id.trim().is_empty() {
            return Err(invalid("empty id".to_string()));
        }
        if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&self.difficulty_level) {
            return Err(invalid(format!(
                "difficulty_level {} outside {}..={}",
                self.difficulty_level, MIN_DIFFICULTY, MAX_DIFFICULTY
            )));
        }
        if self.options.is_empty() {
            return Err(invalid("no options".to_string()));
        }

        let mut seen = HashSet::new();
        for option in &self.options {
            if !seen.insert(option.id.as_str()) {
                return Err(invalid(format!("duplicate option id {}", option.id)));
            }
        }

        let correct: Vec<&CaseOption> = self.options.iter().filter(|o| o.is_correct).collect();
        match correct.as_slice() {
            [only] if only.id == self.correct_answer_id => Ok(()),
            [only] => Err(invalid(format!(
                "correct option {} does not match correct_answer_id {}",
                only.id, self.correct_answer_id
            ))),
            other => Err(invalid(format!(
                "expected exactly one correct option, found {}",
                other.len()
            ))),
        }
    }
}

/// Hint revealed during an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hint {
    pub hint_level: u8,
    pub hint_text: String,
    pub points_cost: u32,
    pub timestamp: DateTime<Utc>,
}

/// One user's attempt at one case. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub case_id: String,
    /// Specialty of the case at submission time.
    pub specialty: String,
    /// Clinical algorithm of the case at submission time.
    pub clinical_algorithm: String,
    pub selected_answer_id: String,
    pub is_correct: bool,
    pub time_to_answer_seconds: u32,
    pub student_reasoning: Option<String>,
    pub confidence_level: Option<u8>,
    pub hints_used: Vec<Hint>,
    pub hint_count: u32,
    pub ai_coach_consulted: bool,
    pub ai_feedback: Option<AIFeedback>,
    pub session_id: Option<Uuid>,
    pub was_adaptive_selection: bool,
    pub adaptive_reason: Option<String>,
    pub points_earned: u32,
}

/// Award of a badge to a user. Earned at most once per (user, badge).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBadge {
    pub id: Uuid,
    pub earned_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub badge_id: String,
    pub earned_by_interaction_id: Option<Uuid>,
}

// === Coach chat ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One message of a coach conversation. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub role: ChatRole,
    pub content: String,
    pub session_id: Option<Uuid>,
    /// Case the conversation is about, if any.
    pub related_case_id: Option<String>,
    pub token_count: Option<u32>,
    pub model_used: String,
}

impl ChatMessage {
    /// Build a message, rejecting blank content.
    pub fn new(
        user_id: Uuid,
        role: ChatRole,
        content: &str,
        model_used: String,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let content = content.trim();
        if content.is_empty() {
            return Err(EngineError::InvalidMessage("empty content".to_string()));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            created_at: now,
            user_id,
            role,
            content: content.to_string(),
            session_id: None,
            related_case_id: None,
            token_count: None,
            model_used,
        })
    }
}

// === AI feedback ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Correct,
    Incorrect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalPattern {
    pub name: String,
    pub key_features: Vec<String>,
    pub pathophysiology_brief: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningAnalysis {
    pub what_student_got_right: Vec<String>,
    pub critical_mistake: String,
    pub information_missed: Vec<String>,
    pub cognitive_error_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextSteps {
    pub immediate_practice: Vec<String>,
    pub concept_to_review: String,
    pub similar_patterns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encouragement {
    pub positive_reinforcement: String,
    pub growth_mindset: String,
    pub progress_note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyRating {
    pub case_difficulty: u8,
    pub why_challenging: String,
    pub student_should_have_known: bool,
    pub acceptable_mistake_for_level: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackMetadata {
    pub feedback_generated_at: DateTime<Utc>,
    pub model_used: String,
    pub tokens_used: u32,
}

/// Structured feedback returned by the AI coach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AIFeedback {
    pub verdict: Verdict,
    pub correct_answer_id: String,
    pub immediate_feedback: String,
    pub clinical_pattern: ClinicalPattern,
    pub reasoning_analysis: ReasoningAnalysis,
    pub correct_reasoning_path: BTreeMap<String, String>,
    pub key_takeaways: Vec<String>,
    pub common_exam_traps: Vec<String>,
    pub next_steps: NextSteps,
    pub encouragement: Encouragement,
    pub difficulty_rating: DifficultyRating,
    pub metadata: FeedbackMetadata,
}

// === Engine responses ===

/// Strategy chosen for the next case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryGoal {
    AddressWeakness,
    ReinforceStrength,
    ExploreNew,
}

impl PrimaryGoal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AddressWeakness => "address_weakness",
            Self::ReinforceStrength => "reinforce_strength",
            Self::ExploreNew => "explore_new",
        }
    }
}

/// Why a case was chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionReasoning {
    pub primary_goal: PrimaryGoal,
    pub specialty_targeted: String,
    pub specific_gap: String,
    pub expected_outcome: String,
    /// Confidence in [0, 1].
    pub confidence_this_helps: f64,
}

/// Hint prepared ahead of the attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedHint {
    pub hint_level: u8,
    pub hint_text: String,
    pub points_cost: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessCriteria {
    pub target_time_seconds: u32,
    pub key_reasoning_steps: Vec<String>,
}

/// Response of the next-case operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextCaseResponse {
    pub case: ClinicalCase,
    pub selection_reasoning: SelectionReasoning,
    pub coaching_message: String,
    pub hints_prepared: Vec<PreparedHint>,
    pub success_criteria: SuccessCriteria,
}

/// Response of the submit-answer operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAnswerResponse {
    pub interaction_id: Uuid,
    pub is_correct: bool,
    pub correct_answer_id: String,
    /// Absent when the feedback adapter failed or timed out.
    pub feedback: Option<AIFeedback>,
    pub points_earned: u32,
    pub new_badges_unlocked: Vec<Badge>,
    pub updated_progress: UserProgress,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_case;

    #[test]
    fn valid_case_passes() {
        assert!(sample_case("c1", "cardiology", 3).validate().is_ok());
    }

    #[test]
    fn difficulty_out_of_range_rejected() {
        let case = sample_case("c1", "cardiology", 6);
        assert!(matches!(case.validate(), Err(EngineError::InvalidCase { .. })));
    }

    #[test]
    fn two_correct_options_rejected() {
        let mut case = sample_case("c1", "cardiology", 2);
        case.options[1].is_correct = true;
        assert!(case.validate().is_err());
    }

    #[test]
    fn mismatched_correct_answer_rejected() {
        let mut case = sample_case("c1", "cardiology", 2);
        case.correct_answer_id = "B".to_string();
        assert!(case.validate().is_err());
    }

    #[test]
    fn chat_message_trims_and_rejects_blank() {
        let now = chrono::Utc::now();
        let user_id = Uuid::new_v4();
        let message =
            ChatMessage::new(user_id, ChatRole::User, "  why not thrombolysis? ", "user".into(), now)
                .unwrap();
        assert_eq!(message.content, "why not thrombolysis?");
        assert_eq!(serde_json::to_value(message.role).unwrap(), "user");

        let blank = ChatMessage::new(user_id, ChatRole::Assistant, " \n ", "canned".into(), now);
        assert!(matches!(blank, Err(EngineError::InvalidMessage(_))));
    }

    #[test]
    fn patient_data_keeps_unknown_fields() {
        let json = serde_json::json!({
            "age": 54,
            "sex": "masculino",
            "vitals": { "heart_rate": 110 },
            "smoking_pack_years": 30
        });
        let data: PatientData = serde_json::from_value(json).unwrap();
        assert_eq!(data.sex, Sex::Male);
        assert_eq!(data.extra["smoking_pack_years"], 30);
        assert_eq!(data.vitals.unwrap().heart_rate, Some(110));
    }
}
