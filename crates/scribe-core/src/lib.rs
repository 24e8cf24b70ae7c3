//! Scribe Core Library
//!
//! Post-processing of ICU dictation transcripts and reversible PHI tokenization
//! for text that leaves the trust boundary.
//!
//! # Architecture
//!
//! ```text
//! Audio → Transcription → Hallucination Gate ──(noise)──→ flagged result
//!                                 │
//!                       Vocabulary Normalization
//!                                 │
//!                       Encounter Classification
//!                                 │
//!                          TranscriptResult
//!
//! Any text bound for the language model:
//!
//!   text ──scrub──→ tokens + SubstitutionMap ──→ LLM ──→ reply ──reinject──→ restored reply
//! ```
//!
//! # Core Principle
//!
//! **Unscrubbed text never leaves.** A PII engine failure is an error, never a
//! silent pass-through.
//!
//! # Modules
//!
//! - [`models`]: Domain types (EncounterType, TranscriptResult, PII records)
//! - [`vocab`]: Rule tables, hallucination gate, normalizer, classifier, pipeline
//! - [`privacy`]: Scrubber, substitution mapping, per-request scrub sessions
//! - [`fingerprint`]: Log-safe transcript identifiers

pub mod fingerprint;
pub mod models;
pub mod privacy;
pub mod vocab;

// Re-export commonly used types
pub use models::{
    AnonymizedText, EncounterType, EntitySpan, Replacement, TokenTemplate, TranscriptResult,
};
pub use privacy::{
    PiiEngine, PrivacyError, PrivacyResult, ScrubPolicy, ScrubSession, ScrubStage, Scrubbed,
    Scrubber, SubstitutionMap,
};
pub use vocab::{
    EncounterClassifier, HallucinationDetector, Normalization, TranscriptPipeline,
    VocabularyNormalizer,
};
