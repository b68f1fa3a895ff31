//! Feedback from an OpenAI-compatible chat completions endpoint.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use medcards_core::types::{AIFeedback, ClinicalCase, Interaction, Verdict};
use medcards_core::EngineError;

use super::FeedbackAdapter;
use crate::config::FeedbackSettings;

const SYSTEM_PROMPT: &str = "You are a clinical reasoning coach for medical students. \
Answer with a single JSON object with the keys: immediate_feedback, clinical_pattern \
{name, key_features, pathophysiology_brief}, reasoning_analysis {what_student_got_right, \
critical_mistake, information_missed, cognitive_error_type}, correct_reasoning_path \
(object of step name to text), key_takeaways, common_exam_traps, next_steps \
{immediate_practice, concept_to_review, similar_patterns}, encouragement \
{positive_reinforcement, growth_mindset, progress_note}, difficulty_rating \
{case_difficulty, why_challenging, student_should_have_known, acceptable_mistake_for_level}.";

pub struct OpenAiFeedbackAdapter {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiFeedbackAdapter {
    pub fn new(settings: &FeedbackSettings) -> Result<Self, EngineError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| EngineError::AdapterError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: settings.api_url.clone(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        })
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageResponse,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u32,
}

fn user_prompt(case: &ClinicalCase, interaction: &Interaction) -> String {
    let options: Vec<String> = case
        .options
        .iter()
        .map(|o| format!("{}) {}", o.id, o.text))
        .collect();
    let mut prompt = format!(
        "Case ({} / {}, difficulty {}): {}\n\nQuestion: {}\n{}\n\nCorrect answer: {}\n\
         Explanation: {}\nStudent answered: {} ({}) in {}s using {} hint(s).",
        case.specialty,
        case.clinical_algorithm,
        case.difficulty_level,
        case.clinical_presentation,
        case.question,
        options.join("\n"),
        case.correct_answer_id,
        case.explanation,
        interaction.selected_answer_id,
        if interaction.is_correct { "correct" } else { "incorrect" },
        interaction.time_to_answer_seconds,
        interaction.hint_count,
    );
    if let Some(reasoning) = &interaction.student_reasoning {
        prompt.push_str("\nStudent reasoning: ");
        prompt.push_str(reasoning);
    }
    prompt
}

/// Merge model output with the facts the engine already knows.
fn assemble(
    mut content: Value,
    interaction: &Interaction,
    case: &ClinicalCase,
    model: &str,
    tokens_used: u32,
) -> Result<AIFeedback, EngineError> {
    let object = content
        .as_object_mut()
        .ok_or_else(|| EngineError::AdapterError("feedback is not a JSON object".to_string()))?;
    let verdict = if interaction.is_correct {
        Verdict::Correct
    } else {
        Verdict::Incorrect
    };
    object.insert("verdict".to_string(), json!(verdict));
    object.insert("correct_answer_id".to_string(), json!(case.correct_answer_id));
    object.insert(
        "metadata".to_string(),
        json!({
            "feedback_generated_at": Utc::now(),
            "model_used": model,
            "tokens_used": tokens_used,
        }),
    );
    serde_json::from_value(content)
        .map_err(|e| EngineError::AdapterError(format!("malformed feedback: {}", e)))
}

#[async_trait]
impl FeedbackAdapter for OpenAiFeedbackAdapter {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        case: &ClinicalCase,
        interaction: &Interaction,
    ) -> Result<AIFeedback, EngineError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt(case, interaction),
                },
            ],
            temperature: 0.3,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let mut request = self.client.post(self.chat_completions_url()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| EngineError::AdapterError(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(EngineError::AdapterError(format!(
                "feedback endpoint returned {}: {}",
                status, text
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| EngineError::AdapterError(e.to_string()))?;
        let tokens_used = chat.usage.map(|u| u.total_tokens).unwrap_or(0);
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| EngineError::AdapterError("empty completion".to_string()))?;
        debug!(case_id = %case.id, tokens_used, "feedback completion received");

        let parsed: Value = serde_json::from_str(&content)
            .map_err(|e| EngineError::AdapterError(format!("completion is not JSON: {}", e)))?;
        assemble(parsed, interaction, case, &self.model, tokens_used)
    }
}
