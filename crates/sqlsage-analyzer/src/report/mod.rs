//! Analysis Report
//!
//! [`AnalysisReport`] is the value handed back to the shell: the score, the
//! ordered findings, the generated query in generation mode, and a
//! structural complexity summary of the analyzed statement.

mod markdown;

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlsage_core::{Finding, Severity, Token, split_top_level, tokenize};
use sqlsage_query::TokenizedQuery;

use crate::Scorer;

/// Which path produced the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Score and improve a user-supplied query
    Optimize,
    /// Build a query from a plain-English intent
    Generate,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Optimize => "optimize",
            Self::Generate => "generate",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural size of a query, summed over its compound branches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Complexity {
    pub table_count: usize,
    pub join_count: usize,
    /// Parenthesized SELECTs anywhere in the statement, WITH bodies included
    pub subquery_count: usize,
    /// WHERE conditions, counting each top-level OR alternative
    pub where_conditions: usize,
    /// UNION/INTERSECT/EXCEPT operators
    pub set_operations: usize,
    pub has_order_by: bool,
    pub has_group_by: bool,
    pub has_having: bool,
}

impl Complexity {
    pub fn of(query: &TokenizedQuery) -> Self {
        let mut complexity = Self {
            set_operations: query.compound.len(),
            ..Self::default()
        };
        for branch in query.branches() {
            complexity.table_count += branch.table_count();
            complexity.join_count += branch.joins.len();
            complexity.where_conditions += branch
                .predicates
                .iter()
                .map(|p| split_top_level(&tokenize(p), |t| t.is_keyword("OR")).len())
                .sum::<usize>();
            complexity.has_order_by |= !branch.order_by.is_empty();
            complexity.has_group_by |= !branch.group_by.is_empty();
            complexity.has_having |= branch.having.is_some();
        }
        let tokens = tokenize(&query.to_sql());
        complexity.subquery_count = tokens
            .windows(2)
            .filter(|pair| {
                matches!(pair[0], Token::LParen) && pair[1].is_any_keyword(&["SELECT", "WITH"])
            })
            .count();
        complexity
    }
}

/// Result of one optimize or generate call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub mode: Mode,
    /// Overall performance score (0-100, higher = better)
    pub score: u8,
    /// Findings ordered by severity (critical first), then rule id
    pub findings: Vec<Finding>,
    /// Query produced from the intent, in generation mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_query: Option<String>,
    /// First rewrite offered by any finding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimized_query: Option<String>,
    pub complexity: Complexity,
    pub summary: String,
}

impl AnalysisReport {
    /// Orders the findings, scores them and writes the summary
    pub fn build(
        mode: Mode,
        mut findings: Vec<Finding>,
        scorer: &Scorer,
        generated_query: Option<String>,
        complexity: Complexity,
    ) -> Self {
        findings.sort_by(|a, b| {
            a.severity
                .cmp(&b.severity)
                .then_with(|| a.rule_id.cmp(&b.rule_id))
        });
        let score = scorer.score(&findings);
        let optimized_query = findings.iter().find_map(|f| f.rewritten_query.clone());
        let summary = summarize(&findings, score);
        Self {
            mode,
            score,
            findings,
            generated_query,
            optimized_query,
            complexity,
            summary,
        }
    }

    /// Returns true if there are critical issues
    pub fn has_critical_issues(&self) -> bool {
        self.findings.iter().any(|f| f.severity.is_critical())
    }

    /// Returns true if there are warnings or critical issues
    pub fn has_warnings(&self) -> bool {
        self.findings.iter().any(|f| f.severity.is_warning_or_above())
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }

    /// Findings emitted by one rule
    pub fn findings_for<'a>(&'a self, rule_id: &'a str) -> impl Iterator<Item = &'a Finding> {
        self.findings.iter().filter(move |f| f.rule_id == rule_id)
    }
}

fn summarize(findings: &[Finding], score: u8) -> String {
    let count = |severity: Severity| findings.iter().filter(|f| f.severity == severity).count();
    let (critical, warnings, info) = (
        count(Severity::Critical),
        count(Severity::Warning),
        count(Severity::Info),
    );

    if findings.is_empty() {
        "Query looks optimal - no issues detected.".to_string()
    } else if critical > 0 {
        format!(
            "Query has {} critical issue(s), {} warning(s), and {} suggestion(s). Performance score: {}/100",
            critical, warnings, info, score
        )
    } else if warnings > 0 {
        format!(
            "Query has {} warning(s) and {} suggestion(s). Performance score: {}/100",
            warnings, info, score
        )
    } else {
        format!(
            "Query has {} minor suggestion(s). Performance score: {}/100",
            info, score
        )
    }
}

#[cfg(test)]
mod tests;
