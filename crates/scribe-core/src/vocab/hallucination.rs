//! Speech-model hallucination gate.
//!
//! Flags transcripts that look like noise decoded as text: training-data
//! credit lines, bracketed non-speech tags, and looping output.

use super::rules::{HALLUCINATION_PATTERNS, WORD};

/// Consecutive identical words that signal runaway decoding.
pub const REPEAT_RUN_THRESHOLD: usize = 4;

/// Detector for speech-model hallucination artifacts.
#[derive(Debug, Clone, Copy, Default)]
pub struct HallucinationDetector;

impl HallucinationDetector {
    pub fn new() -> Self {
        Self
    }

    /// True if any artifact check matches.
    pub fn detect(&self, text: &str) -> bool {
        HALLUCINATION_PATTERNS.iter().any(|p| p.is_match(text)) || has_repeated_run(text)
    }
}

/// True if the same word occurs `REPEAT_RUN_THRESHOLD` or more times in a row,
/// compared case-insensitively, with only whitespace between occurrences.
fn has_repeated_run(text: &str) -> bool {
    let mut previous: Option<(String, usize)> = None;
    let mut run = 0;

    for word in WORD.find_iter(text) {
        let lower = word.as_str().to_lowercase();
        let continues = match &previous {
            Some((prev, prev_end)) => {
                let gap = &text[*prev_end..word.start()];
                *prev == lower && !gap.is_empty() && gap.chars().all(char::is_whitespace)
            }
            None => false,
        };

        run = if continues { run + 1 } else { 1 };
        if run >= REPEAT_RUN_THRESHOLD {
            return true;
        }
        previous = Some((lower, word.end()));
    }

    false
}
