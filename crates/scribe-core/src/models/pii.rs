//! PII detection and anonymization records exchanged with the PII engine.

use serde::{Deserialize, Serialize};

/// Entity categories the PII engine is asked to detect.
pub const DEFAULT_ENTITIES: &[&str] = &[
    "PERSON",
    "PHONE_NUMBER",
    "US_SSN",
    "DATE_TIME",
    "MEDICAL_RECORD_NUMBER",
    "US_DRIVER_LICENSE",
    "EMAIL_ADDRESS",
    "LOCATION",
    "AGE",
];

/// Minimum detection confidence for a span to be scrubbed.
pub const DEFAULT_MIN_SCORE: f64 = 0.7;

/// A detected PII span. Offsets are byte offsets into the analyzed text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntitySpan {
    pub start: usize,
    pub end: usize,
    pub category: String,
    pub score: f64,
}

/// One token emitted by the anonymizer.
///
/// `start..end` are byte offsets into the *original* text that the token replaced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Replacement {
    pub token: String,
    pub start: usize,
    pub end: usize,
}

/// Anonymizer output: rewritten text plus one record per replaced span.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AnonymizedText {
    pub text: String,
    pub replacements: Vec<Replacement>,
}

/// Token format used for scrubbed spans: `[CATEGORY_N]`.
///
/// The anonymizer is handed one placeholder per category and appends the
/// per-occurrence index itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTemplate {
    open: String,
    close: String,
}

impl Default for TokenTemplate {
    fn default() -> Self {
        Self {
            open: "[".into(),
            close: "]".into(),
        }
    }
}

impl TokenTemplate {
    /// Template with custom delimiters.
    pub fn with_delimiters(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }

    /// Placeholder handed to the anonymizer for a category (index 0).
    pub fn placeholder(&self, category: &str) -> String {
        self.render(category, 0)
    }

    /// Token for the `index`-th distinct value of a category.
    pub fn render(&self, category: &str, index: usize) -> String {
        format!("{}{}_{}{}", self.open, category, index, self.close)
    }

    /// Split a token back into (category, index).
    pub fn parse<'t>(&self, token: &'t str) -> Option<(&'t str, usize)> {
        let inner = token.strip_prefix(self.open.as_str())?;
        let inner = inner.strip_suffix(self.close.as_str())?;
        let (category, index) = inner.rsplit_once('_')?;
        if category.is_empty() {
            return None;
        }
        Some((category, index.parse().ok()?))
    }
}
