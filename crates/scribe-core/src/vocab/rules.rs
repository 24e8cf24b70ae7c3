//! Static rule tables for the transcript post-processor.
//!
//! Tables are ordered; evaluation order is part of their meaning. Every
//! pattern is matched case-insensitively.

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};

use crate::models::EncounterType;

/// A vocabulary correction: every match of `pattern` is rewritten with
/// `replacement` and reported as `canonical`.
#[derive(Debug, Clone)]
pub struct CorrectionRule {
    pub pattern: Regex,
    /// Replacement template (`$1`-style group references allowed)
    pub replacement: String,
    /// Canonical form recorded when the rule fires
    pub canonical: String,
}

impl CorrectionRule {
    /// Build a rule whose replacement is its canonical form, taken literally.
    pub fn new(pattern: &str, canonical: &str) -> Result<Self, regex::Error> {
        Self::with_replacement(pattern, &canonical.replace('$', "$$"), canonical)
    }

    /// Build a rule with a replacement template distinct from its canonical label.
    pub fn with_replacement(
        pattern: &str,
        replacement: &str,
        canonical: &str,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: case_insensitive(pattern)?,
            replacement: replacement.to_string(),
            canonical: canonical.to_string(),
        })
    }
}

/// An encounter classification cue.
#[derive(Debug, Clone)]
pub struct ClassificationRule {
    pub pattern: Regex,
    pub encounter_type: EncounterType,
}

impl ClassificationRule {
    pub fn new(pattern: &str, encounter_type: EncounterType) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: case_insensitive(pattern)?,
            encounter_type,
        })
    }
}

fn case_insensitive(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

fn correction(pattern: &str, canonical: &str) -> CorrectionRule {
    CorrectionRule::new(pattern, canonical).expect("static correction pattern")
}

fn classification(pattern: &str, encounter_type: EncounterType) -> ClassificationRule {
    ClassificationRule::new(pattern, encounter_type).expect("static classification pattern")
}

lazy_static! {
    /// Speech-model artifacts: credit lines, engagement phrases, non-speech tags.
    pub static ref HALLUCINATION_PATTERNS: Vec<Regex> = [
        r"\[music\]",
        r"\[applause\]",
        r"\[laughter\]",
        r"thanks? for watching",
        r"subscribe to (?:our|my|the) channel",
        r"like and subscribe",
        r"subtitles? by",
    ]
    .iter()
    .map(|p| case_insensitive(p).expect("static hallucination pattern"))
    .collect();

    /// Runs of word characters, used by the repetition check.
    pub static ref WORD: Regex = Regex::new(r"\w+").expect("static word pattern");

    /// ICU vocabulary corrections, in application order.
    pub static ref ICU_CORRECTIONS: Vec<CorrectionRule> = vec![
        // Drugs
        correction(r"\bnorepinephrine?\b", "norepinephrine"),
        correction(r"\bnorepi\b", "norepinephrine"),
        correction(r"\bvasopressin\b", "vasopressin"),
        correction(r"\bvancomy?cin\b", "vancomycin"),
        correction(r"\bpiperacillin.?tazobactam\b", "piperacillin-tazobactam"),
        correction(r"\bpip.?tazo?\b", "piperacillin-tazobactam"),
        correction(r"\bmeropenem\b", "meropenem"),
        correction(r"\bcefepime\b", "cefepime"),
        correction(r"\bpropofol\b", "propofol"),
        correction(r"\bfentanyl\b", "fentanyl"),
        correction(r"\bdexmedetomidine\b", "dexmedetomidine"),
        correction(r"\bprecedex\b", "dexmedetomidine"),
        correction(r"\bmidazolam\b", "midazolam"),
        correction(r"\blocabivenol\b", "lorazepam"),
        correction(r"\blorazepam\b", "lorazepam"),
        correction(r"\bhydrocortisone\b", "hydrocortisone"),
        correction(r"\binsulin\b", "insulin"),
        correction(r"\bheparin\b", "heparin"),
        correction(r"\bfurosemide\b", "furosemide"),
        correction(r"\blasix\b", "furosemide"),

        // Scoring systems
        correction(r"\bapache\s*(?:two|2|ii)\b", "APACHE II"),
        correction(r"\bsofa\b", "SOFA"),
        correction(r"\bcam.?icu\b", "CAM-ICU"),
        correction(r"\bbis\b", "BIS"),
        correction(r"\brass\b", "RASS"),
        correction(r"\bcpis\b", "CPIS"),

        // Devices and modalities
        correction(r"\bcrrt\b", "CRRT"),
        correction(r"\bcvvhd\b", "CVVHD"),
        correction(r"\becmo\b", "ECMO"),
        correction(r"\biabp\b", "IABP"),
        correction(r"\bimpella\b", "Impella"),
        correction(r"\bpicc\b", "PICC"),
        correction(r"\bcvl\b", "CVL"),
        correction(r"\bart(?:erial)?\s+line\b", "arterial line"),
        correction(r"\ba.?line\b", "arterial line"),
        correction(r"\bpac\b", "PAC"),
        correction(r"\bnippv\b", "NIPPV"),
        correction(r"\bcpap\b", "CPAP"),
        correction(r"\bbipap\b", "BiPAP"),
        correction(r"\bnasogastric\b", "nasogastric"),
        correction(r"\bng\s+tube\b", "NG tube"),

        // Diagnoses
        correction(r"\bards\b", "ARDS"),
        correction(r"\bdic\b", "DIC"),
        correction(r"\buti\b", "UTI"),
        // CAP/HAP only when followed by "pneumonia"; the trailing word is kept as spoken.
        CorrectionRule::with_replacement(r"\bcap\s+(pneumonia)", "CAP ${1}", "CAP")
            .expect("static correction pattern"),
        CorrectionRule::with_replacement(r"\bhap\s+(pneumonia)", "HAP ${1}", "HAP")
            .expect("static correction pattern"),
        correction(r"\bvap\b", "VAP"),
    ];

    /// Encounter classification cues, highest priority first.
    pub static ref ENCOUNTER_RULES: Vec<ClassificationRule> = vec![
        classification(r"\bfamily\s+(?:meeting|conference|discussion)\b", EncounterType::FamilyMeeting),
        classification(r"\bgoals?\s+of\s+care\b", EncounterType::FamilyMeeting),
        classification(r"\bcode\s+status\b", EncounterType::FamilyMeeting),
        classification(r"\bpalliative\b", EncounterType::FamilyMeeting),
        classification(r"\bprocedure\s+note\b", EncounterType::ProcedureNote),
        classification(r"\bcatheter(?:isation|ization)?\b", EncounterType::ProcedureNote),
        classification(r"\bintubat(?:ed|ion)\b", EncounterType::ProcedureNote),
        classification(r"\bbronchoscop(?:y|ic)\b", EncounterType::ProcedureNote),
        classification(r"\bthoracentesis\b", EncounterType::ProcedureNote),
        classification(r"\bparacentesis\b", EncounterType::ProcedureNote),
        classification(r"\badmission\s+note\b", EncounterType::AdmissionNote),
        classification(r"\bhistory\s+(?:and|&)\s+physical\b", EncounterType::AdmissionNote),
        classification(r"\bh\s*(?:and|&)\s*p\b", EncounterType::AdmissionNote),
        classification(r"\bhandoff\b", EncounterType::Handoff),
        classification(r"\bsign.?out\b", EncounterType::Handoff),
        classification(r"\bsbar\b", EncounterType::Handoff),
        classification(r"\bpre.?rounds?\b", EncounterType::PreRoundsDictation),
        classification(r"\bmorning\s+rounds?\b", EncounterType::PreRoundsDictation),
    ];
}
