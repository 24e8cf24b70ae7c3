//! Token → original-span mapping and detokenization.

use std::collections::BTreeMap;
use std::fmt;

use aho_corasick::{AhoCorasick, MatchKind};
use serde_json::Value;
use tracing::error;

/// Mapping from scrub tokens to the original text they replaced.
///
/// Lives for one protected exchange. It is deliberately not serializable and
/// its `Debug` output never shows original values.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SubstitutionMap {
    entries: BTreeMap<String, String>,
}

impl fmt::Debug for SubstitutionMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubstitutionMap")
            .field("tokens", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SubstitutionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `token` to `original`. Empty tokens or values are ignored.
    ///
    /// Returns the value previously bound to `token`, if any.
    pub fn insert(&mut self, token: impl Into<String>, original: impl Into<String>) -> Option<String> {
        let token = token.into();
        let original = original.into();
        if token.is_empty() || original.is_empty() {
            return None;
        }
        self.entries.insert(token, original)
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries.get(token).map(String::as_str)
    }

    pub fn contains_token(&self, token: &str) -> bool {
        self.entries.contains_key(token)
    }

    /// First token bound to `original`, if any.
    pub fn token_for(&self, original: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, v)| v.as_str() == original)
            .map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tokens in sorted order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// (token, original) pairs in token order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Restore every known token in `text`.
    ///
    /// Single left-to-right pass keyed by token: a restored value is never
    /// scanned again, so it cannot be mistaken for another token. Unknown
    /// tokens stay as literal text.
    pub fn reinject(&self, text: &str) -> String {
        match self.restorer() {
            Some(restorer) => restorer.apply(text),
            None => text.to_string(),
        }
    }

    /// Restore tokens in every string leaf of a JSON value.
    ///
    /// Object keys, numbers, booleans and nulls are left untouched.
    pub fn reinject_value(&self, value: Value) -> Value {
        match self.restorer() {
            Some(restorer) => restorer.apply_value(value),
            None => value,
        }
    }

    fn restorer(&self) -> Option<Restorer<'_>> {
        if self.entries.is_empty() {
            return None;
        }
        let automaton = AhoCorasick::builder()
            .match_kind(MatchKind::LeftmostLongest)
            .build(self.entries.keys());
        match automaton {
            Ok(automaton) => Some(Restorer {
                automaton,
                originals: self.entries.values().map(String::as_str).collect(),
            }),
            Err(err) => {
                error!(error = %err, tokens = self.entries.len(), "cannot build token matcher, leaving text tokenized");
                None
            }
        }
    }
}

impl Extend<(String, String)> for SubstitutionMap {
    fn extend<I: IntoIterator<Item = (String, String)>>(&mut self, iter: I) {
        for (token, original) in iter {
            self.insert(token, original);
        }
    }
}

impl FromIterator<(String, String)> for SubstitutionMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut map = SubstitutionMap::new();
        map.extend(iter);
        map
    }
}

struct Restorer<'a> {
    automaton: AhoCorasick,
    originals: Vec<&'a str>,
}

impl Restorer<'_> {
    fn apply(&self, text: &str) -> String {
        self.automaton.replace_all(text, &self.originals)
    }

    fn apply_value(&self, value: Value) -> Value {
        match value {
            Value::String(s) => Value::String(self.apply(&s)),
            Value::Array(items) => Value::Array(items.into_iter().map(|v| self.apply_value(v)).collect()),
            Value::Object(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, self.apply_value(v)))
                    .collect(),
            ),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(pairs: &[(&str, &str)]) -> SubstitutionMap {
        pairs
            .iter()
            .map(|(t, o)| (t.to_string(), o.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_map_is_noop() {
        let mapping = SubstitutionMap::new();
        assert_eq!(mapping.reinject("Patient [PERSON_0]"), "Patient [PERSON_0]");
        assert_eq!(mapping.reinject_value(json!({"a": 1})), json!({"a": 1}));
    }

    #[test]
    fn test_replaces_every_occurrence() {
        let mapping = map(&[("[PERSON_0]", "Jane Doe"), ("[DATE_TIME_0]", "March 3")]);
        assert_eq!(
            mapping.reinject("[PERSON_0] seen [DATE_TIME_0]; [PERSON_0] stable"),
            "Jane Doe seen March 3; Jane Doe stable"
        );
    }

    #[test]
    fn test_unknown_token_left_literal() {
        // Fail-open: a token the model invented, or one whose record was
        // dropped during scrub, survives as literal text.
        let mapping = map(&[("[PERSON_0]", "Jane Doe")]);
        assert_eq!(
            mapping.reinject("[PERSON_0] and [PERSON_1]"),
            "Jane Doe and [PERSON_1]"
        );
    }

    #[test]
    fn test_single_pass_does_not_chain() {
        // The original behind [PERSON_0] literally contains another token.
        let mapping = map(&[("[PERSON_0]", "see [PERSON_1]"), ("[PERSON_1]", "John Roe")]);
        assert_eq!(
            mapping.reinject("[PERSON_0] / [PERSON_1]"),
            "see [PERSON_1] / John Roe"
        );
    }

    #[test]
    fn test_longest_token_wins() {
        let mapping = map(&[("[PERSON_1]", "Ann"), ("[PERSON_10]", "Bea")]);
        assert_eq!(mapping.reinject("[PERSON_10] [PERSON_1]"), "Bea Ann");
    }

    #[test]
    fn test_nested_sections() {
        let mapping = map(&[("[PERSON_0]", "Jane Doe")]);
        let reply = json!({
            "sections": [
                {"name": "HPI", "content": "Patient [PERSON_0] presents...", "confidence": 0.9}
            ]
        });

        let restored = mapping.reinject_value(reply);
        assert_eq!(restored["sections"][0]["content"], "Patient Jane Doe presents...");
        assert_eq!(restored["sections"][0]["name"], "HPI");
        assert_eq!(restored["sections"][0]["confidence"], 0.9);
    }

    #[test]
    fn test_non_string_leaves_untouched() {
        let mapping = map(&[("[AGE_0]", "87")]);
        let value = json!({
            "[AGE_0]": "[AGE_0] years",
            "n": 3,
            "ok": true,
            "none": null,
            "list": ["[AGE_0]", 1.5, ["[AGE_0]"]]
        });

        let restored = mapping.reinject_value(value);
        assert_eq!(
            restored,
            json!({
                "[AGE_0]": "87 years",
                "n": 3,
                "ok": true,
                "none": null,
                "list": ["87", 1.5, ["87"]]
            })
        );
    }

    #[test]
    fn test_ignores_empty_entries() {
        let mut mapping = SubstitutionMap::new();
        assert_eq!(mapping.insert("", "x"), None);
        assert_eq!(mapping.insert("[PERSON_0]", ""), None);
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_debug_hides_originals() {
        let mapping = map(&[("[PERSON_0]", "Jane Doe")]);
        let debug = format!("{:?}", mapping);
        assert!(debug.contains("[PERSON_0]"));
        assert!(!debug.contains("Jane"));
    }
}
