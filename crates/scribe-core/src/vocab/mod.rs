//! Transcript post-processing.
//!
//! Pipeline: Hallucination Gate → Vocabulary Normalization → Encounter Classification

mod classifier;
mod hallucination;
mod normalizer;
pub mod rules;

pub use classifier::*;
pub use hallucination::*;
pub use normalizer::*;

use tracing::info;

use crate::fingerprint::fingerprint;
use crate::models::TranscriptResult;

/// Coordinates the full post-processing pipeline.
///
/// Stateless: one instance can serve concurrent requests.
#[derive(Debug, Clone, Default)]
pub struct TranscriptPipeline {
    detector: HallucinationDetector,
    normalizer: VocabularyNormalizer,
    classifier: EncounterClassifier,
}

impl TranscriptPipeline {
    /// Create a pipeline with the default rule tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pipeline from explicit components.
    pub fn with_components(normalizer: VocabularyNormalizer, classifier: EncounterClassifier) -> Self {
        Self {
            detector: HallucinationDetector::new(),
            normalizer,
            classifier,
        }
    }

    /// Post-process a raw transcript.
    pub fn process(&self, raw: &str) -> TranscriptResult {
        // Step 1: Noise never reaches normalization
        if self.detector.detect(raw) {
            info!(transcript = %fingerprint(raw), "hallucination detected");
            return TranscriptResult::hallucination(raw.to_string());
        }

        // Step 2: Normalize vocabulary
        let normalized = self.normalizer.normalize(raw);

        // Step 3: Classify the corrected text
        let encounter_type = self.classifier.classify(&normalized.text);

        info!(
            transcript = %fingerprint(raw),
            encounter_type = %encounter_type,
            corrections = normalized.applied.len(),
            "transcript post-processed"
        );

        TranscriptResult::clinical(normalized.text, encounter_type, normalized.applied)
    }

    /// Get the normalizer for direct access.
    pub fn normalizer(&self) -> &VocabularyNormalizer {
        &self.normalizer
    }

    /// Get the classifier for direct access.
    pub fn classifier(&self) -> &EncounterClassifier {
        &self.classifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EncounterType;

    #[test]
    fn test_process_clinical() {
        let pipeline = TranscriptPipeline::new();
        let result = pipeline.process("Pre rounds. Bed 7 on norepi, sofa 9, on crrt.");

        assert!(!result.is_hallucination);
        assert_eq!(
            result.transcript,
            "Pre rounds. Bed 7 on norepinephrine, SOFA 9, on CRRT."
        );
        assert_eq!(result.encounter_type, EncounterType::PreRoundsDictation);
        assert_eq!(result.corrections_applied, vec!["norepinephrine", "SOFA", "CRRT"]);
        assert!(!result.family_meeting_flag);
    }

    #[test]
    fn test_hallucination_short_circuit() {
        let pipeline = TranscriptPipeline::new();
        let raw = "goals of care lasix lasix lasix lasix";
        let result = pipeline.process(raw);

        assert!(result.is_hallucination);
        assert_eq!(result.transcript, raw);
        assert_eq!(result.encounter_type, EncounterType::BedsideAssessment);
        assert!(result.corrections_applied.is_empty());
        assert!(!result.family_meeting_flag);
    }

    #[test]
    fn test_family_meeting_flag() {
        let pipeline = TranscriptPipeline::new();
        let result = pipeline.process("Code status discussion with the son, now DNR.");
        assert_eq!(result.encounter_type, EncounterType::FamilyMeeting);
        assert!(result.family_meeting_flag);
    }

    #[test]
    fn test_classifies_corrected_text() {
        let mut normalizer = VocabularyNormalizer::new();
        normalizer.add_rule(r"\bgoc\b", "goals of care").unwrap();
        let pipeline = TranscriptPipeline::with_components(normalizer, EncounterClassifier::new());

        let result = pipeline.process("GOC talk with family after admission note");
        assert_eq!(result.transcript, "goals of care talk with family after admission note");
        assert_eq!(result.encounter_type, EncounterType::FamilyMeeting);
    }

    #[test]
    fn test_empty_transcript() {
        let pipeline = TranscriptPipeline::new();
        let result = pipeline.process("");
        assert!(!result.is_hallucination);
        assert_eq!(result.encounter_type, EncounterType::BedsideAssessment);
        assert!(result.corrections_applied.is_empty());
    }
}
