//! Presidio analyzer/anonymizer sidecars as a [`PiiEngine`].
//!
//! Presidio reports offsets in characters and describes anonymizer output
//! items in terms of the *output* text. This adapter translates both back to
//! byte offsets in the original text and then assigns its own disambiguated
//! tokens, so two different people never share `[PERSON_0]`. Any response it
//! cannot reconcile is an error; nothing is passed through unscrubbed.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use scribe_core::models::DEFAULT_MIN_SCORE;
use scribe_core::{
    AnonymizedText, EntitySpan, PiiEngine, PrivacyError, PrivacyResult, Replacement, ScrubStage, TokenTemplate,
};

use crate::error::ClientResult;
use crate::http;

const LANGUAGE: &str = "en";

/// Sidecar endpoints and thresholds.
#[derive(Debug, Clone)]
pub struct PresidioConfig {
    pub analyzer_url: String,
    pub anonymizer_url: String,
    pub min_score: f64,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for PresidioConfig {
    fn default() -> Self {
        Self {
            analyzer_url: crate::config::DEFAULT_ANALYZER_URL.to_string(),
            anonymizer_url: crate::config::DEFAULT_ANONYMIZER_URL.to_string(),
            min_score: DEFAULT_MIN_SCORE,
            timeout: Duration::from_millis(crate::config::DEFAULT_PRESIDIO_TIMEOUT_MS),
        }
    }
}

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    text: &'a str,
    language: &'static str,
    entities: &'a [String],
    score_threshold: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct RecognizerResult {
    entity_type: String,
    start: usize,
    end: usize,
    score: f64,
}

#[derive(Serialize)]
struct Operator {
    #[serde(rename = "type")]
    kind: &'static str,
    new_value: String,
}

#[derive(Serialize)]
struct AnonymizeRequest<'a> {
    text: &'a str,
    anonymizers: BTreeMap<&'a str, Operator>,
    analyzer_results: Vec<RecognizerResult>,
}

#[derive(Debug, Deserialize)]
struct AnonymizeResponse {
    text: String,
    #[serde(default)]
    items: Vec<OperatorItem>,
}

/// One replacement, located in the anonymizer's output text.
#[derive(Debug, Clone, Deserialize)]
struct OperatorItem {
    start: usize,
    end: usize,
    entity_type: String,
}

/// HTTP client for the Presidio sidecars.
#[derive(Clone)]
pub struct PresidioClient {
    config: PresidioConfig,
    client: Client,
}

impl PresidioClient {
    pub fn new(config: PresidioConfig) -> ClientResult<Self> {
        let client = http::client(config.timeout)?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &PresidioConfig {
        &self.config
    }

    async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        stage: ScrubStage,
        url: &str,
        body: &B,
    ) -> PrivacyResult<R> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| PrivacyError::unavailable(stage, format!("{} unreachable: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PrivacyError::unavailable(stage, format!("HTTP {}", status)));
        }

        response
            .json()
            .await
            .map_err(|e| PrivacyError::unavailable(stage, format!("unreadable response: {}", e)))
    }
}

#[async_trait]
impl PiiEngine for PresidioClient {
    async fn detect_entities(
        &self,
        text: &str,
        categories: &[String],
        min_score: f64,
    ) -> PrivacyResult<Vec<EntitySpan>> {
        let url = format!("{}/analyze", self.config.analyzer_url.trim_end_matches('/'));
        let request = AnalyzeRequest {
            text,
            language: LANGUAGE,
            entities: categories,
            score_threshold: min_score,
        };
        let results: Vec<RecognizerResult> = self.post(ScrubStage::Detection, &url, &request).await?;

        let offsets = CharOffsets::new(text);
        let mut spans = Vec::with_capacity(results.len());
        for result in results {
            if result.score < min_score || !categories.contains(&result.entity_type) {
                continue;
            }
            let (start, end) = offsets.byte_range(result.start, result.end).ok_or_else(|| {
                PrivacyError::unavailable(
                    ScrubStage::Detection,
                    format!("span {}..{} outside text", result.start, result.end),
                )
            })?;
            spans.push(EntitySpan {
                start,
                end,
                category: result.entity_type,
                score: result.score,
            });
        }
        spans.sort_by_key(|s| (s.start, s.end));

        debug!(spans = spans.len(), "analyzer results");
        Ok(spans)
    }

    async fn anonymize(
        &self,
        text: &str,
        template: &TokenTemplate,
        spans: &[EntitySpan],
    ) -> PrivacyResult<AnonymizedText> {
        if spans.is_empty() {
            return Ok(AnonymizedText {
                text: text.to_string(),
                replacements: Vec::new(),
            });
        }

        let fail = |reason: String| PrivacyError::unavailable(ScrubStage::Anonymization, reason);
        let offsets = CharOffsets::new(text);

        let mut analyzer_results = Vec::with_capacity(spans.len());
        for span in spans {
            let (start, end) = offsets
                .char_range(span.start, span.end)
                .ok_or_else(|| fail(format!("span {}..{} not on char boundaries", span.start, span.end)))?;
            analyzer_results.push(RecognizerResult {
                entity_type: span.category.clone(),
                start,
                end,
                score: span.score,
            });
        }

        let anonymizers = spans
            .iter()
            .map(|s| {
                (
                    s.category.as_str(),
                    Operator {
                        kind: "replace",
                        new_value: template.placeholder(&s.category),
                    },
                )
            })
            .collect();

        let url = format!("{}/anonymize", self.config.anonymizer_url.trim_end_matches('/'));
        let request = AnonymizeRequest {
            text,
            anonymizers,
            analyzer_results,
        };
        let response: AnonymizeResponse = self.post(ScrubStage::Anonymization, &url, &request).await?;

        let original: Vec<char> = text.chars().collect();
        let output: Vec<char> = response.text.chars().collect();
        let replaced = align(&original, &output, response.items, &request.analyzer_results).map_err(fail)?;

        Ok(tokenize(text, &offsets, template, &replaced))
    }
}

/// Char index → byte offset table.
struct CharOffsets {
    bytes: Vec<usize>,
}

impl CharOffsets {
    fn new(text: &str) -> Self {
        let bytes = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        Self { bytes }
    }

    fn byte_range(&self, start: usize, end: usize) -> Option<(usize, usize)> {
        if start >= end {
            return None;
        }
        Some((*self.bytes.get(start)?, *self.bytes.get(end)?))
    }

    fn char_range(&self, start: usize, end: usize) -> Option<(usize, usize)> {
        if start >= end {
            return None;
        }
        let start = self.bytes.binary_search(&start).ok()?;
        let end = self.bytes.binary_search(&end).ok()?;
        Some((start, end))
    }
}

/// A replaced span of the original text, in chars.
#[derive(Debug, PartialEq)]
struct Replaced {
    start: usize,
    end: usize,
    category: String,
}

/// Locate each anonymizer item in the original text.
///
/// Text between items is copied verbatim by the anonymizer, so each item's
/// original start follows from the preceding literal text, and its end is
/// the analyzer span end whose following text matches the output.
fn align(
    original: &[char],
    output: &[char],
    mut items: Vec<OperatorItem>,
    spans: &[RecognizerResult],
) -> Result<Vec<Replaced>, String> {
    items.sort_by_key(|i| i.start);

    let mut replaced = Vec::with_capacity(items.len());
    let mut in_cursor = 0;
    let mut out_cursor = 0;

    for (k, item) in items.iter().enumerate() {
        if item.start < out_cursor || item.end < item.start || item.end > output.len() {
            return Err(format!("item {}..{} overlaps or exceeds output", item.start, item.end));
        }

        let literal = &output[out_cursor..item.start];
        let start = in_cursor + literal.len();
        if original.get(in_cursor..start) != Some(literal) {
            return Err("output text outside replacements differs from input".into());
        }

        let next = items.get(k + 1).map_or(output.len(), |n| n.start);
        if next < item.end {
            return Err(format!("item {}..{} overlaps the next item", item.start, item.end));
        }
        let following = &output[item.end..next];
        let is_last = k + 1 == items.len();

        let candidates = merged_chain(spans, &item.entity_type, start);
        if candidates.is_empty() {
            return Err(format!("no {} span starts at {}", item.entity_type, start));
        }
        let end = candidates
            .iter()
            .map(|s| s.end)
            .filter(|&end| end > start)
            .filter(|&end| original.get(end..end + following.len()) == Some(following))
            .filter(|&end| !is_last || end + following.len() == original.len())
            .max()
            .ok_or_else(|| format!("cannot recover original extent of {} at {}", item.entity_type, start))?;

        replaced.push(Replaced {
            start,
            end,
            category: item.entity_type.clone(),
        });
        in_cursor = end;
        out_cursor = item.end;
    }

    if original.get(in_cursor..) != output.get(out_cursor..) {
        return Err("output text outside replacements differs from input".into());
    }
    Ok(replaced)
}

/// Spans of `category` the anonymizer may have merged into one item at `start`:
/// those starting at `start`, then any span overlapping the extent so far.
/// Spans after a gap belong to later items.
fn merged_chain<'s>(spans: &'s [RecognizerResult], category: &str, start: usize) -> Vec<&'s RecognizerResult> {
    let mut chain: Vec<&RecognizerResult> = spans
        .iter()
        .filter(|s| s.entity_type == category && s.start == start)
        .collect();
    let mut extent = match chain.iter().map(|s| s.end).max() {
        Some(end) => end,
        None => return chain,
    };

    loop {
        let overlapping: Vec<&RecognizerResult> = spans
            .iter()
            .filter(|s| s.entity_type == category && s.start > start && s.start < extent)
            .filter(|s| !chain.iter().any(|c| std::ptr::eq(*c, *s)))
            .collect();
        if overlapping.is_empty() {
            return chain;
        }
        extent = overlapping.iter().map(|s| s.end).fold(extent, usize::max);
        chain.extend(overlapping);
    }
}

/// Rebuild the text with one token per distinct (category, original) value.
fn tokenize(text: &str, offsets: &CharOffsets, template: &TokenTemplate, replaced: &[Replaced]) -> AnonymizedText {
    let mut assigned: HashMap<(&str, &str), String> = HashMap::new();
    let mut next_index: HashMap<&str, usize> = HashMap::new();
    let mut out = String::with_capacity(text.len());
    let mut replacements = Vec::with_capacity(replaced.len());
    let mut cursor = 0;

    for r in replaced {
        // Offsets come from `align`, which only yields in-range char indices.
        let (start, end) = match offsets.byte_range(r.start, r.end) {
            Some(range) => range,
            None => continue,
        };
        let original = &text[start..end];
        let token = assigned
            .entry((r.category.as_str(), original))
            .or_insert_with(|| {
                let index = next_index.entry(r.category.as_str()).or_insert(0);
                let token = template.render(&r.category, *index);
                *index += 1;
                token
            })
            .clone();

        out.push_str(&text[cursor..start]);
        out.push_str(&token);
        cursor = end;
        replacements.push(Replacement { token, start, end });
    }
    out.push_str(&text[cursor..]);

    AnonymizedText {
        text: out,
        replacements,
    }
}
