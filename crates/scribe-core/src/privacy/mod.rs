//! Reversible PHI tokenization.
//!
//! Flow: scrub → (language model sees tokens only) → reinject
//!
//! Detection and anonymization are delegated to a [`PiiEngine`]. Every failure
//! of the engine is surfaced: text that could not be scrubbed must not be
//! sent onward.

mod mapping;
mod session;

pub use mapping::*;
pub use session::*;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::fingerprint::fingerprint;
use crate::models::{AnonymizedText, EntitySpan, Replacement, TokenTemplate, DEFAULT_ENTITIES, DEFAULT_MIN_SCORE};

/// Default bound on each PII engine call.
pub const DEFAULT_SCRUB_TIMEOUT: Duration = Duration::from_millis(5000);

/// Which PII engine call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrubStage {
    Detection,
    Anonymization,
}

impl fmt::Display for ScrubStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrubStage::Detection => f.write_str("detection"),
            ScrubStage::Anonymization => f.write_str("anonymization"),
        }
    }
}

/// Scrub errors. Each variant means the text is not safe to send onward.
#[derive(Error, Debug)]
pub enum PrivacyError {
    #[error("PII {stage} unavailable: {reason}")]
    ScrubUnavailable { stage: ScrubStage, reason: String },

    #[error("Anonymizer reused token {token} for different values")]
    TokenCollision { token: String },
}

impl PrivacyError {
    pub fn unavailable(stage: ScrubStage, reason: impl fmt::Display) -> Self {
        PrivacyError::ScrubUnavailable {
            stage,
            reason: reason.to_string(),
        }
    }
}

pub type PrivacyResult<T> = Result<T, PrivacyError>;

/// PII detection and anonymization capability.
#[async_trait]
pub trait PiiEngine: Send + Sync {
    /// Detect spans of the given categories scoring at least `min_score`.
    ///
    /// Returns an empty list, not an error, when nothing is found.
    async fn detect_entities(
        &self,
        text: &str,
        categories: &[String],
        min_score: f64,
    ) -> PrivacyResult<Vec<EntitySpan>>;

    /// Replace `spans` with tokens built from `template`.
    async fn anonymize(
        &self,
        text: &str,
        template: &TokenTemplate,
        spans: &[EntitySpan],
    ) -> PrivacyResult<AnonymizedText>;
}

/// Scrub parameters.
#[derive(Debug, Clone)]
pub struct ScrubPolicy {
    pub entities: Vec<String>,
    pub min_score: f64,
    pub template: TokenTemplate,
    pub timeout: Duration,
}

impl Default for ScrubPolicy {
    fn default() -> Self {
        Self {
            entities: DEFAULT_ENTITIES.iter().map(|e| e.to_string()).collect(),
            min_score: DEFAULT_MIN_SCORE,
            template: TokenTemplate::default(),
            timeout: DEFAULT_SCRUB_TIMEOUT,
        }
    }
}

/// Scrubbed text plus the mapping needed to restore it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scrubbed {
    pub text: String,
    pub mapping: SubstitutionMap,
}

impl Scrubbed {
    fn unchanged(text: &str) -> Self {
        Self {
            text: text.to_string(),
            mapping: SubstitutionMap::new(),
        }
    }

    /// Restore the original text.
    pub fn restore(&self) -> String {
        self.mapping.reinject(&self.text)
    }
}

/// Scrubs text through a [`PiiEngine`].
#[derive(Clone)]
pub struct Scrubber {
    engine: Arc<dyn PiiEngine>,
    policy: ScrubPolicy,
}

impl Scrubber {
    /// Create a scrubber with the default policy.
    pub fn new(engine: Arc<dyn PiiEngine>) -> Self {
        Self::with_policy(engine, ScrubPolicy::default())
    }

    pub fn with_policy(engine: Arc<dyn PiiEngine>, policy: ScrubPolicy) -> Self {
        Self { engine, policy }
    }

    pub fn policy(&self) -> &ScrubPolicy {
        &self.policy
    }

    /// Start a session that merges mappings for one logical request.
    pub fn session(&self) -> ScrubSession<'_> {
        ScrubSession::new(self)
    }

    /// Replace PII in `text` with tokens.
    ///
    /// Blank input returns immediately without calling the engine. Each
    /// engine call is made at most once and bounded by the policy timeout.
    pub async fn scrub(&self, text: &str) -> PrivacyResult<Scrubbed> {
        if text.trim().is_empty() {
            return Ok(Scrubbed::unchanged(text));
        }

        let spans = self
            .bounded(
                ScrubStage::Detection,
                self.engine
                    .detect_entities(text, &self.policy.entities, self.policy.min_score),
            )
            .await?;

        if spans.is_empty() {
            debug!(text = %fingerprint(text), "no PII detected");
            return Ok(Scrubbed::unchanged(text));
        }

        let anonymized = self
            .bounded(
                ScrubStage::Anonymization,
                self.engine.anonymize(text, &self.policy.template, &spans),
            )
            .await?;

        let mut mapping = SubstitutionMap::new();
        for replacement in &anonymized.replacements {
            let Some(original) = recover_span(text, replacement) else {
                warn!(
                    token = %replacement.token,
                    start = replacement.start,
                    end = replacement.end,
                    "dropping replacement with unusable offsets; token will not be restored"
                );
                continue;
            };

            match mapping.get(&replacement.token) {
                Some(existing) if existing == original => {}
                Some(_) => {
                    return Err(PrivacyError::TokenCollision {
                        token: replacement.token.clone(),
                    })
                }
                None => {
                    mapping.insert(replacement.token.as_str(), original);
                }
            }
        }

        info!(
            text = %fingerprint(text),
            spans = spans.len(),
            tokens = mapping.len(),
            "text scrubbed"
        );

        Ok(Scrubbed {
            text: anonymized.text,
            mapping,
        })
    }

    async fn bounded<T, F>(&self, stage: ScrubStage, call: F) -> PrivacyResult<T>
    where
        F: Future<Output = PrivacyResult<T>>,
    {
        match tokio::time::timeout(self.policy.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(PrivacyError::unavailable(
                stage,
                format_args!("timed out after {}ms", self.policy.timeout.as_millis()),
            )),
        }
    }
}

/// Slice the original span a replacement record points at.
///
/// `None` for inverted or out-of-range offsets, offsets off a char boundary,
/// empty spans, or an empty token.
fn recover_span<'t>(text: &'t str, replacement: &Replacement) -> Option<&'t str> {
    if replacement.token.is_empty() || replacement.start >= replacement.end || replacement.end > text.len() {
        return None;
    }
    text.get(replacement.start..replacement.end)
        .filter(|span| !span.is_empty())
}
