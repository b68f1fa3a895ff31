//! Builders shared by unit tests.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::types::{CaseOption, ClinicalCase, Interaction, PatientData, Sex};

pub fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}

pub fn sample_case(id: &str, specialty: &str, difficulty_level: u8) -> ClinicalCase {
    let created = at(2025, 1, 1, 0);
    ClinicalCase {
        id: id.to_string(),
        created_at: created,
        updated_at: created,
        case_code: format!("MC-{}", id.to_uppercase()),
        title: format!("{} case {}", specialty, id),
        clinical_presentation: "Chest pain radiating to the left arm for 40 minutes.".to_string(),
        patient_data: PatientData {
            age: 58,
            sex: Sex::Male,
            vitals: None,
            labs: None,
            imaging: None,
            ecg: Some("ST elevation in V1-V4".to_string()),
            comorbidities: vec!["hypertension".to_string()],
            medications: Vec::new(),
            extra: BTreeMap::new(),
        },
        question: "What is the next best step?".to_string(),
        options: vec![
            CaseOption {
                id: "A".to_string(),
                text: "Primary PCI".to_string(),
                is_correct: true,
            },
            CaseOption {
                id: "B".to_string(),
                text: "Discharge with NSAIDs".to_string(),
                is_correct: false,
            },
            CaseOption {
                id: "C".to_string(),
                text: "Outpatient stress test".to_string(),
                is_correct: false,
            },
        ],
        correct_answer_id: "A".to_string(),
        explanation: "Anterior STEMI requires reperfusion.".to_string(),
        clinical_reasoning: "ST elevation with ischemic pain defines STEMI.".to_string(),
        key_concepts: vec!["STEMI".to_string(), "door-to-balloon time".to_string()],
        differential_diagnosis: vec!["aortic dissection".to_string()],
        specialty: specialty.to_string(),
        subspecialty: None,
        difficulty_level,
        clinical_algorithm: format!("{}-core", specialty),
        times_presented: 0,
        times_answered_correctly: 0,
        average_time_to_answer_seconds: None,
        global_success_rate: 0.0,
        source: "unit-test".to_string(),
        tags: vec![specialty.to_string()],
        is_active: true,
    }
}

pub fn interaction(
    specialty: &str,
    is_correct: bool,
    time_to_answer_seconds: u32,
    points_earned: u32,
    created_at: DateTime<Utc>,
) -> Interaction {
    Interaction {
        id: Uuid::new_v4(),
        created_at,
        user_id: Uuid::nil(),
        case_id: format!("{}-case", specialty),
        specialty: specialty.to_string(),
        clinical_algorithm: format!("{}-core", specialty),
        selected_answer_id: if is_correct { "A" } else { "B" }.to_string(),
        is_correct,
        time_to_answer_seconds,
        student_reasoning: None,
        confidence_level: None,
        hints_used: Vec::new(),
        hint_count: 0,
        ai_coach_consulted: false,
        ai_feedback: None,
        session_id: None,
        was_adaptive_selection: false,
        adaptive_reason: None,
        points_earned,
    }
}
