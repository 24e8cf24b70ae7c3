//! ICU vocabulary normalizer.
//!
//! Handles:
//! - Drug names (brand and misheard spellings → generic)
//! - Scoring systems (sofa → SOFA, apache two → APACHE II)
//! - Devices and modalities (a-line → arterial line, bipap → BiPAP)
//! - Diagnosis acronyms (ards → ARDS)

use tracing::debug;

use super::rules::{CorrectionRule, ICU_CORRECTIONS};

/// Output of a normalization run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalization {
    /// Corrected text
    pub text: String,
    /// Canonical forms of the rules that fired, in rule order
    pub applied: Vec<String>,
}

/// Sequential rule-based vocabulary normalizer.
#[derive(Debug, Clone)]
pub struct VocabularyNormalizer {
    rules: Vec<CorrectionRule>,
}

impl Default for VocabularyNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl VocabularyNormalizer {
    /// Create a normalizer with the default ICU rule table.
    pub fn new() -> Self {
        Self {
            rules: ICU_CORRECTIONS.clone(),
        }
    }

    /// Create a normalizer with an explicit rule table.
    pub fn with_rules(rules: Vec<CorrectionRule>) -> Self {
        Self { rules }
    }

    /// Apply every rule in order. Each rule sees the previous rules' output.
    pub fn normalize(&self, text: &str) -> Normalization {
        let mut current = text.to_string();
        let mut applied = Vec::new();

        for rule in &self.rules {
            if !rule.pattern.is_match(&current) {
                continue;
            }
            current = rule
                .pattern
                .replace_all(&current, rule.replacement.as_str())
                .into_owned();
            debug!(canonical = %rule.canonical, "vocabulary rule applied");
            applied.push(rule.canonical.clone());
        }

        Normalization {
            text: current,
            applied,
        }
    }

    /// Append a custom rule after the existing ones.
    pub fn add_rule(&mut self, pattern: &str, canonical: &str) -> Result<(), regex::Error> {
        self.rules.push(CorrectionRule::new(pattern, canonical)?);
        Ok(())
    }

    /// Rules in application order.
    pub fn rules(&self) -> &[CorrectionRule] {
        &self.rules
    }
}
