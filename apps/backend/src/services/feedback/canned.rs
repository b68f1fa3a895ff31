//! Deterministic feedback built from the case itself.
//!
//! Used by tests and local development. Delay and failure can be injected
//! to exercise the timeout path.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use medcards_core::types::{
    AIFeedback, ClinicalCase, ClinicalPattern, DifficultyRating, Encouragement, FeedbackMetadata,
    Interaction, NextSteps, ReasoningAnalysis, Verdict,
};
use medcards_core::EngineError;

use super::FeedbackAdapter;

pub struct CannedFeedbackAdapter {
    delay: Option<Duration>,
    fail: bool,
    call_count: AtomicU32,
}

impl Default for CannedFeedbackAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl CannedFeedbackAdapter {
    pub fn new() -> Self {
        Self {
            delay: None,
            fail: false,
            call_count: AtomicU32::new(0),
        }
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Always fail with `AdapterError`.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedbackAdapter for CannedFeedbackAdapter {
    fn model(&self) -> &str {
        "canned"
    }

    async fn generate(
        &self,
        case: &ClinicalCase,
        interaction: &Interaction,
    ) -> Result<AIFeedback, EngineError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(EngineError::AdapterError("canned failure".to_string()));
        }

        let correct = interaction.is_correct;
        let correct_text = case
            .option(&case.correct_answer_id)
            .map(|o| o.text.clone())
            .unwrap_or_default();
        let correct_reasoning_path: BTreeMap<String, String> = case
            .key_concepts
            .iter()
            .enumerate()
            .map(|(i, concept)| (format!("step_{}", i + 1), concept.clone()))
            .collect();

        Ok(AIFeedback {
            verdict: if correct {
                Verdict::Correct
            } else {
                Verdict::Incorrect
            },
            correct_answer_id: case.correct_answer_id.clone(),
            immediate_feedback: if correct {
                format!("Correct: {}.", correct_text)
            } else {
                format!(
                    "Not quite. The answer is {}: {}.",
                    case.correct_answer_id, correct_text
                )
            },
            clinical_pattern: ClinicalPattern {
                name: case.title.clone(),
                key_features: case.key_concepts.clone(),
                pathophysiology_brief: case.clinical_reasoning.clone(),
            },
            reasoning_analysis: ReasoningAnalysis {
                what_student_got_right: if correct {
                    vec![correct_text.clone()]
                } else {
                    Vec::new()
                },
                critical_mistake: if correct {
                    String::new()
                } else {
                    format!("Chose option {}", interaction.selected_answer_id)
                },
                information_missed: if correct {
                    Vec::new()
                } else {
                    case.key_concepts.clone()
                },
                cognitive_error_type: if correct { "none" } else { "premature_closure" }
                    .to_string(),
            },
            correct_reasoning_path,
            key_takeaways: vec![case.explanation.clone()],
            common_exam_traps: case.differential_diagnosis.clone(),
            next_steps: NextSteps {
                immediate_practice: vec![case.clinical_algorithm.clone()],
                concept_to_review: case.clinical_algorithm.clone(),
                similar_patterns: case.differential_diagnosis.clone(),
            },
            encouragement: Encouragement {
                positive_reinforcement: "You committed to an answer.".to_string(),
                growth_mindset: "Every miss here is one you will not make on the ward.".to_string(),
                progress_note: format!("Keep working through {}.", case.specialty),
            },
            difficulty_rating: DifficultyRating {
                case_difficulty: case.difficulty_level,
                why_challenging: case.clinical_reasoning.clone(),
                student_should_have_known: case.difficulty_level <= 2,
                acceptable_mistake_for_level: case.difficulty_level >= 4,
            },
            metadata: FeedbackMetadata {
                feedback_generated_at: Utc::now(),
                model_used: self.model().to_string(),
                tokens_used: 0,
            },
        })
    }
}

#[cfg(test)]
impl CannedFeedbackAdapter {
    /// A case and an answer to it, for adapter tests.
    pub(crate) fn sample_pair(is_correct: bool) -> (ClinicalCase, Interaction) {
        let case: ClinicalCase = serde_json::from_value(serde_json::json!({
            "id": "card-001",
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z",
            "case_code": "CARD-001",
            "title": "Crushing chest pain",
            "clinical_presentation": "58-year-old with 40 minutes of chest pain.",
            "patient_data": { "age": 58, "sex": "masculino" },
            "question": "Next step?",
            "options": [
                { "id": "A", "text": "Primary PCI", "is_correct": true },
                { "id": "B", "text": "Discharge", "is_correct": false }
            ],
            "correct_answer_id": "A",
            "explanation": "STEMI needs reperfusion.",
            "clinical_reasoning": "ST elevation with ischemic pain.",
            "key_concepts": ["STEMI"],
            "specialty": "cardiology",
            "difficulty_level": 2,
            "clinical_algorithm": "acs"
        }))
        .expect("sample case");
        let interaction = Interaction {
            id: uuid::Uuid::new_v4(),
            created_at: Utc::now(),
            user_id: uuid::Uuid::new_v4(),
            case_id: case.id.clone(),
            specialty: case.specialty.clone(),
            clinical_algorithm: case.clinical_algorithm.clone(),
            selected_answer_id: if is_correct { "A" } else { "B" }.to_string(),
            is_correct,
            time_to_answer_seconds: 45,
            student_reasoning: None,
            confidence_level: None,
            hints_used: Vec::new(),
            hint_count: 0,
            ai_coach_consulted: false,
            ai_feedback: None,
            session_id: None,
            was_adaptive_selection: true,
            adaptive_reason: None,
            points_earned: 0,
        };
        (case, interaction)
    }
}
