//! Structured replies from the language model.
//!
//! Models wrap JSON in code fences or chatter around it; the parsers here
//! locate the object and map it into typed results. Callers recover from
//! every [`ResponseError`] with a plain-text fallback.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Reply could not be read as the expected structure.
#[derive(Error, Debug)]
pub enum ResponseError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Malformed language model output: {0}")]
    MalformedOutput(String),
}

pub type ResponseResult<T> = Result<T, ResponseError>;

/// One generated note section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteSection {
    pub name: String,
    #[serde(default)]
    pub content: String,
    /// 1.0 = fully supported by the transcript, 0.0 = not present
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Citation {
    #[serde(default)]
    pub guideline: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub year: String,
    #[serde(default)]
    pub recommendation: String,
}

/// Expert analysis of one note section.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FocusedAnalysis {
    #[serde(default)]
    pub analysis: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub confidence_breakdown: String,
}

impl FocusedAnalysis {
    /// Fallback when the reply is not the expected JSON.
    pub fn from_text(analysis: String) -> Self {
        Self {
            analysis,
            ..Self::default()
        }
    }
}

/// Outcome of resolving a documentation suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SuggestionResolution {
    /// Paste-ready note text
    Ready { note_text: String },
    /// A critical detail is missing; ask the clinician
    NeedsInput { question: String, options: Vec<String> },
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(de::Error::custom(format!("expected string or number, got {}", other))),
    }
}

/// Extract the JSON object from a model reply.
pub fn parse_reply(raw: &str) -> ResponseResult<Value> {
    let body = strip_code_fence(raw.trim());

    let value = match serde_json::from_str::<Value>(body) {
        Ok(value) => value,
        Err(_) => {
            // Try to find JSON in the response (in case the model adds extra text)
            let start = body
                .find('{')
                .ok_or_else(|| ResponseError::MalformedOutput("no JSON object found in reply".into()))?;
            let end = body
                .rfind('}')
                .filter(|&end| end > start)
                .ok_or_else(|| ResponseError::MalformedOutput("no closing brace found in reply".into()))?;
            serde_json::from_str(&body[start..=end])?
        }
    };

    if !value.is_object() {
        return Err(ResponseError::MalformedOutput("reply is not a JSON object".into()));
    }
    Ok(value)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the language tag line
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// `{"sections": [...]}` → sections. A missing list is empty.
pub fn parse_sections(value: Value) -> ResponseResult<Vec<NoteSection>> {
    match value {
        Value::Object(mut fields) => match fields.remove("sections") {
            Some(sections) => Ok(serde_json::from_value(sections)?),
            None => Ok(Vec::new()),
        },
        _ => Err(ResponseError::MalformedOutput("expected an object with sections".into())),
    }
}

pub fn parse_focused(value: Value) -> ResponseResult<FocusedAnalysis> {
    Ok(serde_json::from_value(value)?)
}

/// `{"ready": true, "noteText": ..}` or `{"ready": false, "question": .., "options": [..]}`.
pub fn parse_resolution(value: Value) -> ResponseResult<SuggestionResolution> {
    let ready = value
        .get("ready")
        .and_then(Value::as_bool)
        .ok_or_else(|| ResponseError::MalformedOutput("missing boolean 'ready'".into()))?;

    let text = |key: &str| value.get(key).and_then(Value::as_str).unwrap_or_default().to_string();

    if ready {
        return Ok(SuggestionResolution::Ready {
            note_text: text("noteText"),
        });
    }

    let options = value
        .get("options")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();

    Ok(SuggestionResolution::NeedsInput {
        question: text("question"),
        options,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_plain_json() {
        let value = parse_reply(r#"{"sections": []}"#).unwrap();
        assert_eq!(value, json!({"sections": []}));
    }

    #[test]
    fn test_code_fence_stripped() {
        let raw = "```json\n{\"analysis\": \"ok\"}\n```";
        assert_eq!(parse_reply(raw).unwrap(), json!({"analysis": "ok"}));

        let raw = "```\n{\"a\": 1}\n```\n";
        assert_eq!(parse_reply(raw).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_surrounding_chatter() {
        let raw = "Here is the JSON you asked for:\n{\"ready\": true, \"noteText\": \"x\"}\nLet me know!";
        assert_eq!(parse_reply(raw).unwrap()["ready"], true);
    }

    #[test]
    fn test_malformed_replies() {
        assert!(matches!(parse_reply("Patient is stable."), Err(ResponseError::MalformedOutput(_))));
        assert!(matches!(parse_reply("} backwards {"), Err(ResponseError::MalformedOutput(_))));
        assert!(matches!(parse_reply("[1, 2]"), Err(ResponseError::MalformedOutput(_))));
        assert!(matches!(parse_reply("{\"a\": }"), Err(ResponseError::JsonParse(_))));
    }

    #[test]
    fn test_parse_sections() {
        let sections = parse_sections(json!({
            "sections": [
                {"name": "HPI", "content": "Patient presents...", "confidence": 0.9},
                {"name": "Plan"}
            ]
        }))
        .unwrap();

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].confidence, 0.9);
        assert_eq!(sections[1].content, "");
        assert!(parse_sections(json!({})).unwrap().is_empty());
        assert!(parse_sections(json!({"sections": "HPI"})).is_err());
    }

    #[test]
    fn test_parse_focused() {
        let analysis = parse_focused(json!({
            "analysis": "Septic shock on one pressor",
            "citations": [{"guideline": "Surviving Sepsis Campaign", "year": 2021, "recommendation": "MAP >= 65"}],
            "suggestions": ["Document lactate trend"]
        }))
        .unwrap();

        assert_eq!(analysis.citations[0].year, "2021");
        assert_eq!(analysis.suggestions, vec!["Document lactate trend"]);
        assert_eq!(analysis.confidence_breakdown, "");
    }

    #[test]
    fn test_parse_resolution() {
        assert_eq!(
            parse_resolution(json!({"ready": true, "noteText": "Left MCA stroke."})).unwrap(),
            SuggestionResolution::Ready {
                note_text: "Left MCA stroke.".into()
            }
        );

        assert_eq!(
            parse_resolution(json!({"ready": false, "question": "Which territory?", "options": ["Left MCA", "Right MCA", 3]}))
                .unwrap(),
            SuggestionResolution::NeedsInput {
                question: "Which territory?".into(),
                options: vec!["Left MCA".into(), "Right MCA".into()],
            }
        );

        assert!(parse_resolution(json!({"ready": "yes"})).is_err());
        assert!(parse_resolution(json!({"noteText": "x"})).is_err());
    }

    #[test]
    fn test_resolution_json_shape() {
        let json = serde_json::to_value(SuggestionResolution::NeedsInput {
            question: "q".into(),
            options: vec![],
        })
        .unwrap();
        assert_eq!(json, json!({"status": "needs_input", "question": "q", "options": []}));
    }

    proptest! {
        #[test]
        fn prop_wrapped_object_is_recovered(
            content in "[A-Za-z0-9 .,\\[\\]_]{0,40}",
            confidence in 0.0f64..=1.0,
            prefix in "[A-Za-z .:]{0,20}",
            suffix in "[A-Za-z .!]{0,20}",
            fenced in any::<bool>(),
        ) {
            let object = json!({"sections": [{"name": "HPI", "content": &content, "confidence": confidence}]});
            let raw = if fenced {
                format!("```json\n{}\n```", object)
            } else {
                format!("{}\n{}\n{}", prefix, object, suffix)
            };

            let value = parse_reply(&raw).unwrap();
            prop_assert_eq!(&value, &object);
            let sections = parse_sections(value).unwrap();
            prop_assert_eq!(&sections[0].content, &content);
        }
    }
}
