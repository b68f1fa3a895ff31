//! Hint ladder prepared for each case.

use crate::types::{ClinicalCase, PreparedHint};

/// Build the ladder for a case. Level 1 reveals the least; each level costs
/// `costs[level - 1]`. The ladder never eliminates every wrong option.
pub fn hint_ladder(case: &ClinicalCase, costs: &[u32]) -> Vec<PreparedHint> {
    let mut texts = vec![format!(
        "Work through the {} algorithm for this {} presentation.",
        case.clinical_algorithm, case.specialty
    )];

    if !case.key_concepts.is_empty() {
        texts.push(format!("Key concepts: {}.", case.key_concepts.join(", ")));
    } else if !case.differential_diagnosis.is_empty() {
        texts.push(format!(
            "Weigh the differential: {}.",
            case.differential_diagnosis.join(", ")
        ));
    }

    let wrong: Vec<_> = case.options.iter().filter(|o| !o.is_correct).collect();
    let eliminable = wrong.len().saturating_sub(1);
    for option in wrong.into_iter().take(eliminable) {
        texts.push(format!("Option {} can be ruled out: {}.", option.id, option.text));
    }

    texts
        .into_iter()
        .zip(costs)
        .enumerate()
        .map(|(i, (hint_text, cost))| PreparedHint {
            hint_level: (i + 1) as u8,
            hint_text,
            points_cost: *cost,
        })
        .collect()
}
