//! Encounter classifier.
//!
//! First matching rule wins. Table order is the priority: conversational cues
//! (family meeting, goals of care, code status) beat procedure cues, which
//! beat structural ones (admission note, H&P), then handoff and pre-rounds.

use super::rules::{ClassificationRule, ENCOUNTER_RULES};
use crate::models::EncounterType;

/// Rule-based encounter classifier.
#[derive(Debug, Clone)]
pub struct EncounterClassifier {
    rules: Vec<ClassificationRule>,
}

impl Default for EncounterClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl EncounterClassifier {
    /// Create a classifier with the default rule table.
    pub fn new() -> Self {
        Self {
            rules: ENCOUNTER_RULES.clone(),
        }
    }

    /// Create a classifier with an explicit rule table.
    pub fn with_rules(rules: Vec<ClassificationRule>) -> Self {
        Self { rules }
    }

    /// Classify a transcript. Falls back to `BedsideAssessment`.
    pub fn classify(&self, text: &str) -> EncounterType {
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(text))
            .map(|rule| rule.encounter_type)
            .unwrap_or_default()
    }
}
