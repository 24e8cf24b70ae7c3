//! Golden test cases for transcript post-processing.
//!
//! These tables pin the exact behavior of the ICU rule tables: corrected
//! text, canonical forms recorded, encounter routing, and the noise gate.

use scribe_core::vocab::{EncounterClassifier, HallucinationDetector, TranscriptPipeline, VocabularyNormalizer};
use scribe_core::EncounterType;

/// A vocabulary correction case.
struct CorrectionCase {
    id: &'static str,
    input: &'static str,
    expected_text: &'static str,
    expected_applied: &'static [&'static str],
}

fn get_correction_cases() -> Vec<CorrectionCase> {
    vec![
        CorrectionCase {
            id: "norepi-shorthand",
            input: "Pt on norepi and vasopressin",
            expected_text: "Pt on norepinephrine and vasopressin",
            expected_applied: &["norepinephrine", "vasopressin"],
        },
        CorrectionCase {
            id: "vanc-dropped-syllable",
            input: "trough pending on vancomcin",
            expected_text: "trough pending on vancomycin",
            expected_applied: &["vancomycin"],
        },
        CorrectionCase {
            id: "pip-tazo",
            input: "pip-tazo started at noon",
            expected_text: "piperacillin-tazobactam started at noon",
            expected_applied: &["piperacillin-tazobactam"],
        },
        CorrectionCase {
            // The corrected form is then seen by the generic rule as well
            id: "misheard-lorazepam",
            input: "give locabivenol 2 mg",
            expected_text: "give lorazepam 2 mg",
            expected_applied: &["lorazepam", "lorazepam"],
        },
        CorrectionCase {
            id: "apache-numeral",
            input: "APACHE 2 score 18",
            expected_text: "APACHE II score 18",
            expected_applied: &["APACHE II"],
        },
        CorrectionCase {
            id: "cam-icu-run-together",
            input: "camicu positive this morning",
            expected_text: "CAM-ICU positive this morning",
            expected_applied: &["CAM-ICU"],
        },
        CorrectionCase {
            id: "devices-in-rule-order",
            input: "on crrt, considering ecmo",
            expected_text: "on CRRT, considering ECMO",
            expected_applied: &["CRRT", "ECMO"],
        },
        CorrectionCase {
            id: "ng-tube-spacing",
            input: "ng  tube placed",
            expected_text: "NG tube placed",
            expected_applied: &["NG tube"],
        },
        CorrectionCase {
            id: "bipap-not-cpap",
            input: "bipap overnight",
            expected_text: "BiPAP overnight",
            expected_applied: &["BiPAP"],
        },
        CorrectionCase {
            id: "arterial-line-spelled-out",
            input: "arterial line clotted",
            expected_text: "arterial line clotted",
            expected_applied: &["arterial line"],
        },
        CorrectionCase {
            id: "hap-after-drug",
            input: "hap pneumonia on cefepime",
            expected_text: "HAP pneumonia on cefepime",
            expected_applied: &["cefepime", "HAP"],
        },
        CorrectionCase {
            id: "diagnosis-acronyms",
            input: "ards with dic",
            expected_text: "ARDS with DIC",
            expected_applied: &["ARDS", "DIC"],
        },
        CorrectionCase {
            id: "nothing-to-correct",
            input: "patient resting comfortably",
            expected_text: "patient resting comfortably",
            expected_applied: &[],
        },
    ]
}

#[test]
fn test_correction_cases() {
    let normalizer = VocabularyNormalizer::new();

    for case in get_correction_cases() {
        let out = normalizer.normalize(case.input);

        assert_eq!(
            out.text, case.expected_text,
            "Case {}: text mismatch", case.id
        );
        assert_eq!(
            out.applied, case.expected_applied,
            "Case {}: applied mismatch", case.id
        );
    }
}

#[test]
fn test_all_brand_names() {
    let normalizer = VocabularyNormalizer::new();

    let brands = [
        ("precedex", "dexmedetomidine"),
        ("lasix", "furosemide"),
        ("norepi", "norepinephrine"),
    ];

    for (brand, generic) in brands {
        let out = normalizer.normalize(brand);
        assert_eq!(
            out.text, generic,
            "Brand {} should map to {}, got {}",
            brand, generic, out.text
        );
    }
}

/// An encounter classification case.
struct ClassificationCase {
    id: &'static str,
    input: &'static str,
    expected: EncounterType,
}

fn get_classification_cases() -> Vec<ClassificationCase> {
    vec![
        ClassificationCase {
            id: "family-meeting",
            input: "Family meeting with daughter regarding goals of care",
            expected: EncounterType::FamilyMeeting,
        },
        ClassificationCase {
            id: "code-status",
            input: "Code status discussed, now DNR",
            expected: EncounterType::FamilyMeeting,
        },
        ClassificationCase {
            id: "palliative-beats-rounds",
            input: "palliative care consult during morning rounds",
            expected: EncounterType::FamilyMeeting,
        },
        ClassificationCase {
            id: "procedure-note",
            input: "Procedure note: bronchoscopy performed",
            expected: EncounterType::ProcedureNote,
        },
        ClassificationCase {
            id: "procedure-beats-handoff",
            input: "Patient was intubated overnight, handoff to night team",
            expected: EncounterType::ProcedureNote,
        },
        ClassificationCase {
            id: "admission-note",
            input: "Admission note for 67 year old with septic shock",
            expected: EncounterType::AdmissionNote,
        },
        ClassificationCase {
            id: "h-and-p",
            input: "H&P for new patient in bed 3",
            expected: EncounterType::AdmissionNote,
        },
        ClassificationCase {
            id: "sbar",
            input: "SBAR for bed 12",
            expected: EncounterType::Handoff,
        },
        ClassificationCase {
            id: "sign-out",
            input: "Sign-out to overnight resident",
            expected: EncounterType::Handoff,
        },
        ClassificationCase {
            id: "pre-rounds",
            input: "Pre-rounds on bed 4",
            expected: EncounterType::PreRoundsDictation,
        },
        ClassificationCase {
            id: "morning-rounds",
            input: "morning rounds update",
            expected: EncounterType::PreRoundsDictation,
        },
        ClassificationCase {
            id: "default-bedside",
            input: "Patient comfortable, MAP 70",
            expected: EncounterType::BedsideAssessment,
        },
    ]
}

#[test]
fn test_classification_cases() {
    let classifier = EncounterClassifier::new();

    for case in get_classification_cases() {
        let actual = classifier.classify(case.input);
        assert_eq!(
            actual, case.expected,
            "Case {}: expected {}, got {}",
            case.id, case.expected, actual
        );
    }
}

#[test]
fn test_hallucination_cases() {
    let detector = HallucinationDetector::new();

    let noise = [
        "Thanks for watching!",
        "please like and subscribe",
        "Subscribe to our channel for more",
        "Subtitles by the community",
        "[Music]",
        "[APPLAUSE]",
        "[laughter] okay",
        "the the the the",
        "Okay okay okay okay okay.",
    ];
    for text in noise {
        assert!(detector.detect(text), "{:?} should be flagged", text);
    }

    let dictation = [
        "Thank you for watching the monitor overnight",
        "the the the patient",
        "no no, no no",
        "Bed 7 on norepi, MAP 65",
        "",
    ];
    for text in dictation {
        assert!(!detector.detect(text), "{:?} should not be flagged", text);
    }
}

#[test]
fn test_pipeline_end_to_end() {
    let pipeline = TranscriptPipeline::new();

    let result = pipeline.process("Family meeting: discussed sofa of 12, on crrt and precedex");
    assert_eq!(
        result.transcript,
        "Family meeting: discussed SOFA of 12, on CRRT and dexmedetomidine"
    );
    assert_eq!(result.encounter_type, EncounterType::FamilyMeeting);
    assert!(result.family_meeting_flag);
    assert!(!result.is_hallucination);
    assert_eq!(
        result.corrections_applied,
        vec!["dexmedetomidine", "SOFA", "CRRT"]
    );
}

#[test]
fn test_pipeline_noise_is_untouched() {
    let pipeline = TranscriptPipeline::new();

    let raw = "norepi norepi norepi norepi";
    let result = pipeline.process(raw);
    assert!(result.is_hallucination);
    assert_eq!(result.transcript, raw);
    assert!(result.corrections_applied.is_empty());
    assert_eq!(result.encounter_type, EncounterType::BedsideAssessment);
    assert!(!result.family_meeting_flag);
}

#[test]
fn test_result_json_shape() {
    let pipeline = TranscriptPipeline::new();
    let result = pipeline.process("Handoff: on bipap");

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["transcript"], "Handoff: on BiPAP");
    assert_eq!(json["encounter_type"], "handoff");
    assert_eq!(json["corrections_applied"][0], "BiPAP");
    assert_eq!(json["is_hallucination"], false);
    assert_eq!(json["family_meeting_flag"], false);
}
