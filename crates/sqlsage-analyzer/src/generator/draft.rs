//! Query under construction while intent patterns are applied

use std::fmt::Write;
use std::ops::Range;

use sqlsage_core::{Finding, Severity, quote_ident};
use sqlsage_schema::{ForeignKeyLink, Table};

use super::intent::Intent;
use super::matcher::{ColumnMatch, MatchPass, SchemaMatcher};

/// Rule id of notes about intent words matching several tables
pub const AMBIGUITY_RULE_ID: &str = "intent-ambiguity";
/// Rule id of notes about intent parts that could not be expressed
pub const IGNORED_RULE_ID: &str = "intent-ignored";

/// INFO finding for a word matching columns in several tables
pub fn ambiguity_note(word: &str, hit: &ColumnMatch<'_>) -> Finding {
    let others: Vec<&str> = hit.also_in.iter().map(|t| t.name.as_str()).collect();
    let message = format!(
        "\"{word}\" also matches columns in {}; using {}.{}",
        others.join(", "),
        hit.table.name,
        hit.column.name
    );
    Finding::new(AMBIGUITY_RULE_ID, Severity::Info, message)
        .with_table(&hit.table.name)
        .with_columns(vec![hit.column.name.clone()])
}

#[derive(Debug)]
pub struct Draft<'a> {
    pub intent: &'a Intent,
    pub matcher: SchemaMatcher<'a>,
    target: &'a Table,
    join: Option<(&'a Table, ForeignKeyLink)>,
    pub distinct: Option<String>,
    pub aggregates: Vec<String>,
    pub conditions: Vec<String>,
    pub group_by: Vec<String>,
    pub order_by: Option<String>,
    /// Direction stated next to the sort column
    pub order_descending: Option<bool>,
    pub limit: Option<u64>,
    /// Direction implied by the limit phrase (`bottom 3`, `5 lowest`)
    pub limit_descending: Option<bool>,
    pub notes: Vec<Finding>,
    consumed: Vec<Range<usize>>,
}

impl<'a> Draft<'a> {
    pub fn new(
        intent: &'a Intent,
        matcher: SchemaMatcher<'a>,
        target: &'a Table,
        join: Option<(&'a Table, ForeignKeyLink)>,
    ) -> Self {
        Self {
            intent,
            matcher,
            target,
            join,
            distinct: None,
            aggregates: Vec::new(),
            conditions: Vec::new(),
            group_by: Vec::new(),
            order_by: None,
            order_descending: None,
            limit: None,
            limit_descending: None,
            notes: Vec::new(),
            consumed: Vec::new(),
        }
    }

    /// Tables columns may come from, in declaration order
    fn candidates(&self) -> Vec<&'a Table> {
        let joined = self.join.as_ref().map(|(table, _)| table.name.as_str());
        self.matcher
            .schema
            .tables()
            .filter(|t| t.name == self.target.name || Some(t.name.as_str()) == joined)
            .collect()
    }

    fn render(&self, table: &Table, column: &str) -> String {
        if self.join.is_some() {
            format!("{}.{}", quote_ident(&table.name), quote_ident(column))
        } else {
            quote_ident(column)
        }
    }

    /// Resolves a one- or two-word phrase to a rendered column.
    ///
    /// Returns the column and how many bytes of `phrase` it used: a two-word
    /// phrase falls back to its first word.
    pub fn resolve(&mut self, phrase: &str) -> Option<(String, usize)> {
        let candidates = self.candidates();
        let (hit, used) = match self.matcher.column(phrase, &candidates) {
            Some(hit) => (hit, phrase.len()),
            None => {
                let first = phrase.split_whitespace().next()?;
                if first.len() == phrase.len() {
                    return None;
                }
                (self.matcher.column(first, &candidates)?, first.len())
            }
        };
        if !hit.also_in.is_empty() {
            self.note_ambiguity(&phrase[..used], &hit);
        }
        Some((self.render(hit.table, &hit.column.name), used))
    }

    pub fn note_ambiguity(&mut self, word: &str, hit: &ColumnMatch<'_>) {
        self.note(ambiguity_note(word, hit));
    }

    pub fn note_ignored(&mut self, message: impl Into<String>) {
        self.note(Finding::new(IGNORED_RULE_ID, Severity::Info, message));
    }

    pub fn note(&mut self, finding: Finding) {
        if !self.notes.contains(&finding) {
            self.notes.push(finding);
        }
    }

    pub fn is_free(&self, range: &Range<usize>) -> bool {
        !self
            .consumed
            .iter()
            .any(|c| c.start < range.end && range.start < c.end)
    }

    pub fn consume(&mut self, range: Range<usize>) {
        self.consumed.push(range);
    }

    /// With a limit but no sort column, orders by the first unclaimed word
    /// naming a column (`top 5 users who spent the most` sorts by `spend`).
    pub fn infer_metric(&mut self) {
        if self.order_by.is_some() || self.limit.is_none() || !self.aggregates.is_empty() {
            return;
        }
        let intent = self.intent;
        let vocabulary = self.matcher.vocabulary;
        for word in &intent.words {
            let text = word.text.as_str();
            if !self.is_free(&(word.start..word.end))
                || vocabulary.is_stop_word(text)
                || (vocabulary.direction(text).is_some() && vocabulary.canonical(text) == text)
                || self.matcher.table(text, MatchPass::Inflection).is_some()
            {
                continue;
            }
            if let Some((column, _)) = self.resolve(text) {
                self.order_by = Some(column);
                return;
            }
        }
    }

    /// Sort direction: stated next to the column, else the first direction
    /// word of the intent, else implied by the limit phrase. A bare limit
    /// (`top 5`) sorts descending.
    fn descending(&self) -> bool {
        if let Some(stated) = self.order_descending {
            return stated;
        }
        let vocabulary = self.matcher.vocabulary;
        self.intent
            .words
            .iter()
            .filter(|w| w.text != "top")
            .find_map(|w| vocabulary.direction(&w.text))
            .or(self.limit_descending)
            .unwrap_or(self.limit.is_some())
    }

    pub fn to_sql(&self) -> String {
        let mut aggregates = self.aggregates.clone();
        if let Some(column) = &self.distinct {
            if let Some(count) = aggregates.iter_mut().find(|a| *a == "COUNT(*)") {
                *count = format!("COUNT(DISTINCT {column})");
            }
        }
        if !self.group_by.is_empty() && aggregates.is_empty() {
            aggregates.push("COUNT(*)".to_string());
        }

        let projection = if self.group_by.is_empty() && aggregates.is_empty() {
            match &self.distinct {
                Some(column) => format!("DISTINCT {column}"),
                None => "*".to_string(),
            }
        } else {
            let items: Vec<&str> = self
                .group_by
                .iter()
                .chain(&aggregates)
                .map(String::as_str)
                .collect();
            items.join(", ")
        };

        let mut sql = format!("SELECT {projection} FROM {}", quote_ident(&self.target.name));
        if let Some((table, link)) = &self.join {
            let _ = write!(
                sql,
                " JOIN {} ON {}.{} = {}.{}",
                quote_ident(&table.name),
                quote_ident(&link.from_table),
                quote_ident(&link.from_column),
                quote_ident(&link.to_table),
                quote_ident(&link.to_column)
            );
        }
        if !self.conditions.is_empty() {
            let _ = write!(sql, " WHERE {}", self.conditions.join(" AND "));
        }
        if !self.group_by.is_empty() {
            let _ = write!(sql, " GROUP BY {}", self.group_by.join(", "));
        }

        let order = self.order_by.clone().or_else(|| {
            if self.limit.is_some() && !self.group_by.is_empty() {
                aggregates.first().cloned()
            } else {
                None
            }
        });
        if let Some(order) = order {
            let _ = write!(sql, " ORDER BY {order}");
            if self.descending() {
                sql.push_str(" DESC");
            }
        }
        if let Some(limit) = self.limit {
            let _ = write!(sql, " LIMIT {limit}");
        }
        sql
    }
}
