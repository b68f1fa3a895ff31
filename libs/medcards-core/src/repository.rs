//! Case filtering and the in-memory catalog snapshot used by selection.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::{ClinicalCase, MAX_DIFFICULTY, MIN_DIFFICULTY};

/// Inclusive difficulty range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyBand {
    pub min: u8,
    pub max: u8,
}

impl DifficultyBand {
    /// Band of `half_width` around `center`, clamped to the valid range.
    pub fn around(center: u8, half_width: u8) -> Self {
        Self {
            min: center.saturating_sub(half_width).max(MIN_DIFFICULTY),
            max: center.saturating_add(half_width).min(MAX_DIFFICULTY),
        }
    }

    pub fn contains(&self, difficulty_level: u8) -> bool {
        self.min <= difficulty_level && difficulty_level <= self.max
    }
}

/// Catalog query. Set fields combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subspecialty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty_level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty_band: Option<DifficultyBand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinical_algorithm: Option<String>,
    /// Matches when the case shares at least one tag. Empty means any.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub exclude_case_ids: Vec<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

impl CaseFilter {
    pub fn matches(&self, case: &ClinicalCase) -> bool {
        if !self.include_inactive && !case.is_active {
            return false;
        }
        if self.specialty.as_ref().is_some_and(|s| *s != case.specialty) {
            return false;
        }
        if self.subspecialty.is_some() && self.subspecialty != case.subspecialty {
            return false;
        }
        if self.difficulty_level.is_some_and(|d| d != case.difficulty_level) {
            return false;
        }
        if self
            .difficulty_band
            .is_some_and(|band| !band.contains(case.difficulty_level))
        {
            return false;
        }
        if self
            .clinical_algorithm
            .as_ref()
            .is_some_and(|a| *a != case.clinical_algorithm)
        {
            return false;
        }
        if !self.tags.is_empty() && !self.tags.iter().any(|t| case.tags.contains(t)) {
            return false;
        }
        !self.exclude_case_ids.contains(&case.id)
    }
}

/// Immutable snapshot of catalog entries, ordered by id.
#[derive(Debug, Clone, Default)]
pub struct CaseCatalog {
    cases: Vec<ClinicalCase>,
}

impl CaseCatalog {
    pub fn new(mut cases: Vec<ClinicalCase>) -> Self {
        cases.sort_by(|a, b| a.id.cmp(&b.id));
        cases.dedup_by(|a, b| a.id == b.id);
        Self { cases }
    }

    /// Cases matching the filter, ordered by id. An empty result is not an error.
    pub fn find(&self, filter: &CaseFilter) -> Vec<&ClinicalCase> {
        self.cases.iter().filter(|c| filter.matches(c)).collect()
    }

    pub fn get(&self, id: &str) -> Option<&ClinicalCase> {
        self.cases
            .binary_search_by(|c| c.id.as_str().cmp(id))
            .ok()
            .map(|i| &self.cases[i])
    }

    /// Specialties that have at least one active case.
    pub fn specialties(&self) -> BTreeSet<&str> {
        self.cases
            .iter()
            .filter(|c| c.is_active)
            .map(|c| c.specialty.as_str())
            .collect()
    }

    /// True when no active case exists.
    pub fn is_empty(&self) -> bool {
        !self.cases.iter().any(|c| c.is_active)
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_case;

    fn catalog() -> CaseCatalog {
        let mut tagged = sample_case("c3", "cardiology", 4);
        tagged.tags = vec!["ecg".to_string(), "acs".to_string()];
        tagged.subspecialty = Some("coronary".to_string());
        let mut inactive = sample_case("c4", "cardiology", 2);
        inactive.is_active = false;
        CaseCatalog::new(vec![
            sample_case("c2", "dermatology", 2),
            sample_case("c1", "cardiology", 2),
            tagged,
            inactive,
        ])
    }

    fn ids(cases: Vec<&ClinicalCase>) -> Vec<&str> {
        cases.into_iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn empty_filter_returns_active_sorted() {
        assert_eq!(ids(catalog().find(&CaseFilter::default())), vec!["c1", "c2", "c3"]);
    }

    #[test]
    fn fields_combine_with_and() {
        let filter = CaseFilter {
            specialty: Some("cardiology".to_string()),
            difficulty_level: Some(2),
            ..Default::default()
        };
        assert_eq!(ids(catalog().find(&filter)), vec!["c1"]);
    }

    #[test]
    fn tags_match_on_intersection() {
        let filter = CaseFilter {
            tags: vec!["acs".to_string(), "rash".to_string()],
            ..Default::default()
        };
        assert_eq!(ids(catalog().find(&filter)), vec!["c3"]);
    }

    #[test]
    fn exclusion_and_band() {
        let filter = CaseFilter {
            difficulty_band: Some(DifficultyBand::around(3, 1)),
            exclude_case_ids: vec!["c1".to_string()],
            ..Default::default()
        };
        assert_eq!(ids(catalog().find(&filter)), vec!["c2", "c3"]);
    }

    #[test]
    fn inactive_only_when_requested() {
        let filter = CaseFilter {
            include_inactive: true,
            specialty: Some("cardiology".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(catalog().find(&filter)), vec!["c1", "c3", "c4"]);
    }

    #[test]
    fn no_match_is_empty_not_error() {
        let filter = CaseFilter {
            subspecialty: Some("neonatal".to_string()),
            ..Default::default()
        };
        assert!(catalog().find(&filter).is_empty());
    }

    #[test]
    fn band_is_clamped() {
        assert_eq!(DifficultyBand::around(1, 2), DifficultyBand { min: 1, max: 3 });
        assert_eq!(DifficultyBand::around(5, 1), DifficultyBand { min: 4, max: 5 });
    }

    #[test]
    fn get_by_id() {
        let catalog = catalog();
        assert_eq!(catalog.get("c2").map(|c| c.specialty.as_str()), Some("dermatology"));
        assert!(catalog.get("missing").is_none());
    }
}
