//! Post-processed transcript result.

use serde::{Deserialize, Serialize};

use super::encounter::EncounterType;

/// Result of running a raw transcript through the post-processing pipeline.
///
/// Built once per transcription request and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptResult {
    /// Corrected transcript (or the raw text when flagged as a hallucination)
    pub transcript: String,
    /// Encounter type used for routing
    pub encounter_type: EncounterType,
    /// Canonical forms substituted, in rule order
    pub corrections_applied: Vec<String>,
    /// True when the audio looked like noise rather than dictation
    pub is_hallucination: bool,
    /// True iff `encounter_type` is a family meeting
    pub family_meeting_flag: bool,
}

impl TranscriptResult {
    /// Result for a transcript that passed the hallucination gate.
    pub fn clinical(
        transcript: String,
        encounter_type: EncounterType,
        corrections_applied: Vec<String>,
    ) -> Self {
        Self {
            transcript,
            encounter_type,
            corrections_applied,
            is_hallucination: false,
            family_meeting_flag: encounter_type.is_family_meeting(),
        }
    }

    /// Result for a transcript flagged as speech-model hallucination.
    ///
    /// The raw text is kept verbatim; no corrections are applied.
    pub fn hallucination(raw: String) -> Self {
        Self {
            transcript: raw,
            encounter_type: EncounterType::BedsideAssessment,
            corrections_applied: Vec::new(),
            is_hallucination: true,
            family_meeting_flag: false,
        }
    }
}
