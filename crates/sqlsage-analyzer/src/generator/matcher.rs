//! Matching intent words against schema identifiers

use sqlsage_core::IntentVocabulary;
use sqlsage_schema::{Column, SchemaModel, Table};

use super::intent::IntentWord;

/// How loosely a word matched an identifier. Earlier passes win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchPass {
    Exact,
    /// Singular/plural folding
    Inflection,
    Substring,
}

impl MatchPass {
    const ALL: [MatchPass; 3] = [Self::Exact, Self::Inflection, Self::Substring];

    fn matches(self, identifier: &str, word: &str) -> bool {
        let identifier = identifier.to_lowercase();
        match self {
            Self::Exact => identifier == word,
            Self::Inflection => singular(&identifier) == singular(word),
            Self::Substring => {
                word.len() >= 4
                    && identifier.len() >= 3
                    && (identifier.contains(word) || word.contains(identifier.as_str()))
            }
        }
    }
}

/// Crude English singular form
pub fn singular(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies").filter(|s| s.len() > 1) {
        format!("{stem}y")
    } else if ["sses", "uses", "xes", "ches", "shes", "zes"]
        .iter()
        .any(|suffix| word.ends_with(suffix))
    {
        word[..word.len() - 2].to_string()
    } else if word.len() > 3
        && word.ends_with('s')
        && !word.ends_with("ss")
        && !word.ends_with("us")
    {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    }
}

/// A table named by a word of the intent
#[derive(Debug, Clone, Copy)]
pub struct TableMention<'s> {
    /// Index into the intent words
    pub word: usize,
    pub table: &'s Table,
    pub pass: MatchPass,
}

/// A column matched by an intent phrase
#[derive(Debug, Clone)]
pub struct ColumnMatch<'s> {
    pub table: &'s Table,
    pub column: &'s Column,
    /// Other candidate tables declaring a matching column
    pub also_in: Vec<&'s Table>,
}

#[derive(Debug, Clone, Copy)]
pub struct SchemaMatcher<'s> {
    pub schema: &'s SchemaModel,
    pub vocabulary: &'s IntentVocabulary,
}

impl<'s> SchemaMatcher<'s> {
    pub fn new(schema: &'s SchemaModel, vocabulary: &'s IntentVocabulary) -> Self {
        Self { schema, vocabulary }
    }

    /// Two-word phrases never match by substring
    fn passes(phrase: &str, loosest: MatchPass) -> impl Iterator<Item = MatchPass> {
        let loosest = if phrase.contains(' ') {
            loosest.min(MatchPass::Inflection)
        } else {
            loosest
        };
        MatchPass::ALL.into_iter().filter(move |pass| *pass <= loosest)
    }

    /// The phrase and its synonym, spaces folded to underscores
    fn forms(&self, phrase: &str) -> Vec<String> {
        let joined = phrase.split_whitespace().collect::<Vec<_>>().join("_");
        let canonical = self.vocabulary.canonical(&joined).to_string();
        if canonical == joined {
            vec![joined]
        } else {
            vec![joined, canonical]
        }
    }

    /// Best match of one phrase against the schema's tables
    pub fn table(&self, phrase: &str, loosest: MatchPass) -> Option<(&'s Table, MatchPass)> {
        if self.vocabulary.is_stop_word(phrase) {
            return None;
        }
        let forms = self.forms(phrase);
        Self::passes(phrase, loosest).find_map(|pass| {
            self.schema
                .tables()
                .find(|t| forms.iter().any(|f| pass.matches(&t.name, f)))
                .map(|t| (t, pass))
        })
    }

    /// Every table mention, in word order. Two-word phrases such as
    /// `order items` also match `order_items`.
    pub fn table_mentions(&self, words: &[IntentWord]) -> Vec<TableMention<'s>> {
        let mut mentions = Vec::new();
        let mut i = 0;
        while i < words.len() {
            if let Some(next) = words.get(i + 1) {
                let bigram = format!("{} {}", words[i].text, next.text);
                if let Some((table, pass)) = self.table(&bigram, MatchPass::Inflection) {
                    mentions.push(TableMention { word: i, table, pass });
                    i += 2;
                    continue;
                }
            }
            if let Some((table, pass)) = self.table(&words[i].text, MatchPass::Substring) {
                mentions.push(TableMention { word: i, table, pass });
            }
            i += 1;
        }
        mentions
    }

    /// Matches a phrase against the columns of `tables`.
    ///
    /// `tables` must be in declaration order: when several tables declare a
    /// matching column, the first one wins and the rest land in `also_in`.
    pub fn column(&self, phrase: &str, tables: &[&'s Table]) -> Option<ColumnMatch<'s>> {
        if self.vocabulary.is_stop_word(phrase) {
            return None;
        }
        let forms = self.forms(phrase);
        Self::passes(phrase, MatchPass::Substring).find_map(|pass| {
            let mut hits = tables.iter().filter_map(|table| {
                table
                    .columns
                    .iter()
                    .find(|c| forms.iter().any(|f| pass.matches(&c.name, f)))
                    .map(|column| (*table, column))
            });
            let (table, column) = hits.next()?;
            Some(ColumnMatch {
                table,
                column,
                also_in: hits.map(|(t, _)| t).collect(),
            })
        })
    }
}
