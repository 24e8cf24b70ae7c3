//! Encounter types used for downstream routing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Encounter type assigned to a dictation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum EncounterType {
    /// Dictation recorded before morning rounds
    PreRoundsDictation,
    /// Family meeting, goals-of-care or code-status discussion
    FamilyMeeting,
    /// Bedside procedure (lines, intubation, bronchoscopy, taps)
    ProcedureNote,
    /// Admission history and physical
    AdmissionNote,
    /// Shift handoff / sign-out
    Handoff,
    /// Fallback when nothing more specific matches
    #[default]
    BedsideAssessment,
}

impl EncounterType {
    /// All encounter types, in declaration order.
    pub const ALL: [EncounterType; 6] = [
        EncounterType::PreRoundsDictation,
        EncounterType::FamilyMeeting,
        EncounterType::ProcedureNote,
        EncounterType::AdmissionNote,
        EncounterType::Handoff,
        EncounterType::BedsideAssessment,
    ];

    /// Wire name of the encounter type.
    pub fn as_str(&self) -> &'static str {
        match self {
            EncounterType::PreRoundsDictation => "pre_rounds_dictation",
            EncounterType::FamilyMeeting => "family_meeting",
            EncounterType::ProcedureNote => "procedure_note",
            EncounterType::AdmissionNote => "admission_note",
            EncounterType::Handoff => "handoff",
            EncounterType::BedsideAssessment => "bedside_assessment",
        }
    }

    pub fn is_family_meeting(&self) -> bool {
        matches!(self, EncounterType::FamilyMeeting)
    }
}

impl fmt::Display for EncounterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown encounter type name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown encounter type: {0}")]
pub struct UnknownEncounterType(pub String);

impl FromStr for EncounterType {
    type Err = UnknownEncounterType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EncounterType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownEncounterType(s.to_string()))
    }
}
