//! Analyzer configuration
//!
//! Everything the engine treats as tunable lives here: score weights, the
//! large-table heuristic, join limits, disabled rules and the English
//! vocabulary used by query generation. All fields have defaults so a
//! partial TOML file is enough.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::{AssistError, Result, Severity};

/// Points deducted from the score per finding, by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub critical: u8,
    pub warning: u8,
    pub info: u8,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            critical: 25,
            warning: 10,
            info: 2,
        }
    }
}

impl ScoreWeights {
    /// Returns the deduction for a finding of the given severity
    pub fn weight_for(&self, severity: Severity) -> u8 {
        match severity {
            Severity::Critical => self.critical,
            Severity::Warning => self.warning,
            Severity::Info => self.info,
        }
    }
}

/// Words the query generator recognizes in plain-English intents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentVocabulary {
    /// Words implying a descending order (`most`, `highest`, ...)
    pub descending: Vec<String>,
    /// Words implying an ascending order (`least`, `lowest`, ...)
    pub ascending: Vec<String>,
    /// Word rewrites applied before matching against schema identifiers
    pub synonyms: BTreeMap<String, String>,
    /// Words never matched against schema identifiers
    pub stop_words: BTreeSet<String>,
}

fn strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

impl Default for IntentVocabulary {
    fn default() -> Self {
        let synonyms = [
            ("spent", "spend"),
            ("spending", "spend"),
            ("spends", "spend"),
            ("paid", "amount"),
            ("cost", "price"),
            ("costs", "price"),
            ("earned", "salary"),
            ("earn", "salary"),
            ("customer", "user"),
            ("customers", "users"),
            ("people", "users"),
            ("made", "created_at"),
            ("newest", "created_at"),
            ("oldest", "created_at"),
            ("latest", "created_at"),
            ("recent", "created_at"),
        ]
        .into_iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect();

        let stop_words = [
            "a", "an", "the", "all", "me", "show", "list", "get", "find", "give", "return",
            "select", "display", "who", "which", "that", "have", "has", "had", "of", "in", "on",
            "and", "or", "is", "are", "was", "were", "to", "from", "their", "its", "what", "with",
            "where", "whose", "than", "money", "records", "rows", "entries",
        ]
        .into_iter()
        .map(str::to_string)
        .collect();

        Self {
            descending: strings(&[
                "most", "highest", "largest", "biggest", "top", "max", "maximum", "best",
                "greatest", "latest", "newest", "recent", "desc", "descending",
            ]),
            ascending: strings(&[
                "least", "lowest", "smallest", "fewest", "min", "minimum", "worst", "oldest",
                "earliest", "bottom", "asc", "ascending",
            ]),
            synonyms,
            stop_words,
        }
    }
}

impl IntentVocabulary {
    /// Returns `Some(true)` for descending words, `Some(false)` for ascending ones
    pub fn direction(&self, word: &str) -> Option<bool> {
        if self.descending.iter().any(|w| w == word) {
            Some(true)
        } else if self.ascending.iter().any(|w| w == word) {
            Some(false)
        } else {
            None
        }
    }

    /// Applies the synonym table to a lowercase word
    pub fn canonical<'a>(&'a self, word: &'a str) -> &'a str {
        self.synonyms.get(word).map(String::as_str).unwrap_or(word)
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }
}

/// Configuration for the rule engine, scorer and query generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Score deductions per severity
    pub weights: ScoreWeights,
    /// Tables with more estimated rows than this are considered large
    pub large_table_threshold: u64,
    /// Known row counts, keyed by lowercase table name
    pub row_estimates: BTreeMap<String, u64>,
    /// Join count above which `too-many-joins` fires
    pub max_joins: usize,
    /// Rule ids that are never evaluated
    pub disabled_rules: BTreeSet<String>,
    /// Whether to attach `CREATE INDEX` suggestions to findings
    pub suggest_indexes: bool,
    /// Vocabulary used by query generation
    pub vocabulary: IntentVocabulary,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            large_table_threshold: 1_000,
            row_estimates: BTreeMap::new(),
            max_joins: 3,
            disabled_rules: BTreeSet::new(),
            suggest_indexes: true,
            vocabulary: IntentVocabulary::default(),
        }
    }
}

impl AnalyzerConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| AssistError::Configuration(e.message().to_string()))?;
        tracing::debug!(
            disabled_rules = config.disabled_rules.len(),
            row_estimates = config.row_estimates.len(),
            "loaded analyzer configuration"
        );
        Ok(config)
    }

    /// Returns true when the table is known to exceed the large-table
    /// threshold, or when its size is unknown.
    pub fn is_large_table(&self, table: &str) -> bool {
        match self.row_estimates.get(&table.to_lowercase()) {
            Some(rows) => *rows > self.large_table_threshold,
            None => true,
        }
    }

    pub fn is_rule_enabled(&self, rule_id: &str) -> bool {
        !self.disabled_rules.contains(rule_id)
    }

    /// Sets the score weights
    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Sets the large table threshold
    pub fn with_large_table_threshold(mut self, threshold: u64) -> Self {
        self.large_table_threshold = threshold;
        self
    }

    /// Records a row estimate for a table
    pub fn with_row_estimate(mut self, table: impl AsRef<str>, rows: u64) -> Self {
        self.row_estimates.insert(table.as_ref().to_lowercase(), rows);
        self
    }

    /// Sets the maximum join count before a finding is raised
    pub fn with_max_joins(mut self, max_joins: usize) -> Self {
        self.max_joins = max_joins;
        self
    }

    /// Disables a rule by id
    pub fn with_disabled_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.disabled_rules.insert(rule_id.into());
        self
    }

    /// Sets whether to suggest indexes
    pub fn with_suggest_indexes(mut self, suggest: bool) -> Self {
        self.suggest_indexes = suggest;
        self
    }

    /// Replaces the generation vocabulary
    pub fn with_vocabulary(mut self, vocabulary: IntentVocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }
}

#[cfg(test)]
mod tests;
