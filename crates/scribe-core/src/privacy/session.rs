//! Per-request scrub session.
//!
//! One logical request often scrubs several fields separately (transcript,
//! section content, chat turns). Each scrub numbers its tokens from zero, so
//! the session renumbers colliding tokens before merging mappings.

use std::collections::HashMap;

use aho_corasick::{AhoCorasick, MatchKind};
use tracing::debug;

use super::{PrivacyResult, Scrubbed, Scrubber, SubstitutionMap};
use crate::models::TokenTemplate;

/// Category used when a colliding token does not follow the template.
const FALLBACK_CATEGORY: &str = "PII";

/// Merged mapping for one request. Drop it with the request.
pub struct ScrubSession<'a> {
    scrubber: &'a Scrubber,
    mapping: SubstitutionMap,
}

impl<'a> ScrubSession<'a> {
    pub fn new(scrubber: &'a Scrubber) -> Self {
        Self {
            scrubber,
            mapping: SubstitutionMap::new(),
        }
    }

    /// Scrub one field and merge its mapping into the session.
    pub async fn scrub(&mut self, text: &str) -> PrivacyResult<String> {
        let scrubbed = self.scrubber.scrub(text).await?;
        Ok(self.absorb(scrubbed))
    }

    /// Scrub an optional field; blank fields come back empty.
    pub async fn scrub_optional(&mut self, text: Option<&str>) -> PrivacyResult<String> {
        match text {
            Some(t) if !t.trim().is_empty() => self.scrub(t).await,
            _ => Ok(String::new()),
        }
    }

    /// Merge a scrub result, renumbering tokens already bound to other values.
    ///
    /// Returns the scrubbed text with any renumbered tokens rewritten.
    pub fn absorb(&mut self, scrubbed: Scrubbed) -> String {
        let template = &self.scrubber.policy().template;
        let mut renames: Vec<(String, String)> = Vec::new();
        let mut next_index: HashMap<String, usize> = HashMap::new();

        for (token, original) in scrubbed.mapping.iter() {
            match self.mapping.get(token) {
                None => {}
                Some(bound) if bound == original => {}
                Some(_) => {
                    let replacement = match self.mapping.token_for(original) {
                        Some(existing) => existing.to_string(),
                        None => allocate(
                            template,
                            token,
                            &self.mapping,
                            &scrubbed.mapping,
                            &mut next_index,
                        ),
                    };
                    renames.push((token.to_string(), replacement));
                }
            }
        }

        let text = rewrite(&scrubbed.text, &renames);

        for (token, original) in scrubbed.mapping.iter() {
            let target = renames
                .iter()
                .find(|(from, _)| from == token)
                .map(|(_, to)| to.as_str())
                .unwrap_or(token);
            self.mapping.insert(target, original);
        }

        if !renames.is_empty() {
            debug!(renamed = renames.len(), "renumbered colliding scrub tokens");
        }
        text
    }

    /// Merged mapping for every field scrubbed so far.
    pub fn mapping(&self) -> &SubstitutionMap {
        &self.mapping
    }

    /// Take the merged mapping, ending the session.
    pub fn into_mapping(self) -> SubstitutionMap {
        self.mapping
    }
}

/// Next unused token of the colliding token's category.
fn allocate(
    template: &TokenTemplate,
    token: &str,
    session: &SubstitutionMap,
    incoming: &SubstitutionMap,
    next_index: &mut HashMap<String, usize>,
) -> String {
    let category = template
        .parse(token)
        .map(|(category, _)| category)
        .unwrap_or(FALLBACK_CATEGORY)
        .to_string();

    let index = next_index.entry(category.clone()).or_insert_with(|| {
        session
            .tokens()
            .chain(incoming.tokens())
            .filter_map(|t| template.parse(t))
            .filter(|(c, _)| *c == category)
            .map(|(_, i)| i + 1)
            .max()
            .unwrap_or(0)
    });

    let token = template.render(&category, *index);
    *index += 1;
    token
}

/// Rewrite tokens in one pass so swapped names cannot cascade.
fn rewrite(text: &str, renames: &[(String, String)]) -> String {
    if renames.is_empty() {
        return text.to_string();
    }
    let automaton = AhoCorasick::builder()
        .match_kind(MatchKind::LeftmostLongest)
        .build(renames.iter().map(|(from, _)| from.as_str()));
    match automaton {
        Ok(automaton) => {
            let targets: Vec<&str> = renames.iter().map(|(_, to)| to.as_str()).collect();
            automaton.replace_all(text, &targets)
        }
        // Sequential fallback; renamed targets never collide with sources here.
        Err(_) => renames
            .iter()
            .fold(text.to_string(), |acc, (from, to)| acc.replace(from.as_str(), to)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::testing::FakeEngine;
    use super::*;

    fn fake() -> Scrubber {
        Scrubber::new(Arc::new(FakeEngine::with_names(&[
            ("Jane Doe", "PERSON"),
            ("John Roe", "PERSON"),
            ("Ann Poe", "PERSON"),
            ("Boston", "LOCATION"),
        ])))
    }

    #[tokio::test]
    async fn test_distinct_values_get_distinct_tokens() {
        let scrubber = fake();
        let mut session = scrubber.session();

        let first = session.scrub("Jane Doe in Boston").await.unwrap();
        let second = session.scrub("John Roe called").await.unwrap();
        let third = session.scrub("Ann Poe and John Roe").await.unwrap();

        assert_eq!(first, "[PERSON_0] in [LOCATION_0]");
        assert_eq!(second, "[PERSON_1] called");
        // Ann Poe was [PERSON_0] in its own scrub; John Roe reuses [PERSON_1]
        assert_eq!(third, "[PERSON_2] and [PERSON_1]");

        let mapping = session.mapping();
        assert_eq!(mapping.get("[PERSON_0]"), Some("Jane Doe"));
        assert_eq!(mapping.get("[PERSON_1]"), Some("John Roe"));
        assert_eq!(mapping.get("[PERSON_2]"), Some("Ann Poe"));

        let combined = format!("{} / {} / {}", first, second, third);
        assert_eq!(
            mapping.reinject(&combined),
            "Jane Doe in Boston / John Roe called / Ann Poe and John Roe"
        );
    }

    #[tokio::test]
    async fn test_same_value_shares_token() {
        let scrubber = fake();
        let mut session = scrubber.session();

        let a = session.scrub("Jane Doe").await.unwrap();
        let b = session.scrub("again Jane Doe").await.unwrap();
        assert_eq!(a, "[PERSON_0]");
        assert_eq!(b, "again [PERSON_0]");
        assert_eq!(session.mapping().len(), 1);
    }

    #[tokio::test]
    async fn test_optional_fields() {
        let scrubber = fake();
        let mut session = scrubber.session();
        assert_eq!(session.scrub_optional(None).await.unwrap(), "");
        assert_eq!(session.scrub_optional(Some("  ")).await.unwrap(), "");
        assert_eq!(session.scrub_optional(Some("Boston")).await.unwrap(), "[LOCATION_0]");
    }

    #[test]
    fn test_absorb_swaps_in_one_pass() {
        let scrubber = fake();
        let mut session = scrubber.session();
        session.absorb(Scrubbed {
            text: "[PERSON_0] [PERSON_1]".into(),
            mapping: [("[PERSON_0]", "Ann"), ("[PERSON_1]", "Bea")]
                .iter()
                .map(|(t, o)| (t.to_string(), o.to_string()))
                .collect(),
        });

        // Incoming binds the session's tokens the other way round.
        let text = session.absorb(Scrubbed {
            text: "[PERSON_0] then [PERSON_1]".into(),
            mapping: [("[PERSON_0]", "Bea"), ("[PERSON_1]", "Ann")]
                .iter()
                .map(|(t, o)| (t.to_string(), o.to_string()))
                .collect(),
        });

        assert_eq!(text, "[PERSON_1] then [PERSON_0]");
        assert_eq!(session.mapping().reinject(&text), "Bea then Ann");
        assert_eq!(session.mapping().len(), 2);
    }

    #[test]
    fn test_unparsable_token_falls_back() {
        let scrubber = fake();
        let mut session = scrubber.session();
        session.absorb(Scrubbed {
            text: "<name>".into(),
            mapping: [("<name>".to_string(), "Ann".to_string())].into_iter().collect(),
        });
        let text = session.absorb(Scrubbed {
            text: "<name>".into(),
            mapping: [("<name>".to_string(), "Bea".to_string())].into_iter().collect(),
        });

        assert_eq!(text, "[PII_0]");
        assert_eq!(session.mapping().reinject("<name> [PII_0]"), "Ann Bea");
    }
}
