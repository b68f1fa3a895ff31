//! Test fixtures and factory functions for creating test data.

use serde_json::{json, Value};

use medcards_backend::models::ClinicalCase;

/// Case document as the import endpoint accepts it.
///
/// # Arguments
/// * `id` - Case id, also used to derive the case code
/// * `specialty` - Specialty the case belongs to
/// * `difficulty` - Difficulty level, 1 to 5
pub fn case_json(id: &str, specialty: &str, difficulty: u8) -> Value {
    json!({
        "id": id,
        "created_at": "2025-01-01T00:00:00Z",
        "updated_at": "2025-01-01T00:00:00Z",
        "case_code": format!("MC-{}", id.to_uppercase()),
        "title": format!("{} case {}", specialty, id),
        "clinical_presentation": "Chest pain radiating to the left arm for 40 minutes.",
        "patient_data": {
            "age": 58,
            "sex": "masculino",
            "vitals": { "heart_rate": 104, "blood_pressure": "150/95" },
            "ecg": "ST elevation in V1-V4"
        },
        "question": "What is the next best step?",
        "options": [
            { "id": "A", "text": "Primary PCI", "is_correct": true },
            { "id": "B", "text": "Discharge with NSAIDs", "is_correct": false },
            { "id": "C", "text": "Outpatient stress test", "is_correct": false }
        ],
        "correct_answer_id": "A",
        "explanation": "Anterior STEMI requires reperfusion.",
        "clinical_reasoning": "ST elevation with ischemic pain defines STEMI.",
        "key_concepts": ["STEMI", "door-to-balloon time"],
        "differential_diagnosis": ["aortic dissection"],
        "specialty": specialty,
        "difficulty_level": difficulty,
        "clinical_algorithm": format!("{}-core", specialty),
        "source": "integration-test",
        "tags": [specialty]
    })
}

pub fn clinical_case(id: &str, specialty: &str, difficulty: u8) -> ClinicalCase {
    serde_json::from_value(case_json(id, specialty, difficulty)).expect("fixture case is valid")
}

/// Small catalog spread over three specialties.
pub fn seed_cases() -> Vec<ClinicalCase> {
    vec![
        clinical_case("card-1", "cardiology", 1),
        clinical_case("card-2", "cardiology", 2),
        clinical_case("card-3", "cardiology", 3),
        clinical_case("neuro-1", "neurology", 2),
        clinical_case("neuro-2", "neurology", 4),
        clinical_case("pulm-1", "pulmonology", 2),
        clinical_case("pulm-2", "pulmonology", 3),
    ]
}

/// Body for POST /api/users/:user_id/answers.
pub fn answer_request(case_id: &str, selected: &str, seconds: u32) -> Value {
    json!({
        "case_id": case_id,
        "selected_answer_id": selected,
        "time_to_answer_seconds": seconds
    })
}

/// Answer body with hint levels revealed.
pub fn answer_with_hints(case_id: &str, selected: &str, seconds: u32, levels: &[u8]) -> Value {
    let mut body = answer_request(case_id, selected, seconds);
    body["hints_used"] = levels.iter().map(|l| json!({ "hint_level": l })).collect();
    body
}

/// Body for POST /api/cases.
pub fn import_request(cases: Vec<Value>) -> Value {
    json!({ "cases": cases })
}
