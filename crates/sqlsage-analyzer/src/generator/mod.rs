//! Natural-language query generation
//!
//! [`QueryGenerator`] turns a plain-English intent into a single SELECT over
//! the parsed schema. It never invents identifiers: every table and column in
//! the output comes from the schema, and intent fragments it cannot express
//! are reported as notes instead.

mod draft;
mod intent;
mod matcher;
mod patterns;

pub use draft::{AMBIGUITY_RULE_ID, IGNORED_RULE_ID};
pub use intent::{Intent, IntentToken, tokenize_intent};

use sqlsage_core::{Finding, IntentVocabulary, Severity, UnsupportedIntentError};
use sqlsage_schema::{SchemaModel, Table};
use tracing::{debug, trace};

use draft::{Draft, ambiguity_note};
use matcher::{MatchPass, SchemaMatcher};
use patterns::PATTERNS;

/// SQL built from an intent, with notes on what could not be honored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedQuery {
    pub sql: String,
    /// Table the query reads from
    pub table: String,
    /// INFO findings about ambiguous or ignored intent words
    pub notes: Vec<Finding>,
}

#[derive(Debug, Clone, Default)]
pub struct QueryGenerator {
    vocabulary: IntentVocabulary,
}

impl QueryGenerator {
    pub fn new(vocabulary: IntentVocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn vocabulary(&self) -> &IntentVocabulary {
        &self.vocabulary
    }

    /// Builds a query for `intent`.
    ///
    /// Fails only when no table can be inferred, either from a word naming a
    /// table or from a word naming one of its columns.
    pub fn generate(
        &self,
        intent_text: &str,
        schema: &SchemaModel,
    ) -> Result<GeneratedQuery, UnsupportedIntentError> {
        let intent = Intent::parse(intent_text);
        let matcher = SchemaMatcher::new(schema, &self.vocabulary);
        let mut notes = Vec::new();

        let mentions = matcher.table_mentions(&intent.words);
        let target = match mentions.iter().min_by_key(|m| (m.pass, m.word)) {
            Some(mention) => mention.table,
            None => self
                .infer_table(&intent, &matcher, &mut notes)
                .ok_or_else(|| UnsupportedIntentError::new(intent_text.trim()))?,
        };

        let mut join = None;
        let second = mentions
            .iter()
            .find(|m| m.pass != MatchPass::Substring && m.table.name != target.name);
        if let Some(mention) = second {
            match schema.foreign_key_between(&target.name, &mention.table.name) {
                Some(link) => join = Some((mention.table, link)),
                None => notes.push(
                    Finding::new(
                        IGNORED_RULE_ID,
                        Severity::Info,
                        format!(
                            "Table {} is mentioned but has no foreign key to {}; it was not joined",
                            mention.table.name, target.name
                        ),
                    )
                    .with_table(&mention.table.name),
                ),
            }
        }

        debug!(
            table = %target.name,
            joined = join.as_ref().map(|(t, _)| t.name.as_str()),
            "generating query from intent"
        );

        let mut draft = Draft::new(&intent, matcher, target, join);
        for finding in notes {
            draft.note(finding);
        }
        for pattern in PATTERNS.iter() {
            for caps in pattern.regex.captures_iter(&intent.text) {
                let Some(whole) = caps.get(0) else {
                    continue;
                };
                if !draft.is_free(&whole.range()) {
                    continue;
                }
                if let Some(end) = (pattern.build)(&caps, &mut draft) {
                    trace!(
                        pattern = pattern.name,
                        matched = whole.as_str(),
                        "intent pattern applied"
                    );
                    draft.consume(whole.start()..end);
                }
            }
        }
        draft.infer_metric();

        let sql = draft.to_sql();
        debug!(sql = %sql, notes = draft.notes.len(), "generated query");
        Ok(GeneratedQuery {
            sql,
            table: target.name.clone(),
            notes: draft.notes,
        })
    }

    /// Picks the table owning the first column-like word when no table is
    /// named. Ties go to the first table in declaration order.
    fn infer_table<'s>(
        &self,
        intent: &Intent,
        matcher: &SchemaMatcher<'s>,
        notes: &mut Vec<Finding>,
    ) -> Option<&'s Table> {
        let tables: Vec<&Table> = matcher.schema.tables().collect();
        intent.words.iter().find_map(|word| {
            let text = word.text.as_str();
            if self.vocabulary.direction(text).is_some()
                && self.vocabulary.canonical(text) == text
            {
                return None;
            }
            let hit = matcher.column(text, &tables)?;
            if !hit.also_in.is_empty() {
                notes.push(ambiguity_note(text, &hit));
            }
            Some(hit.table)
        })
    }
}

#[cfg(test)]
mod tests;
