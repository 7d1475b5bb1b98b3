//! Index usage rules
//!
//! These rules look at the columns used to filter and join rows (WHERE
//! predicates and ON conditions) and check whether an index can serve them.

use std::collections::BTreeSet;

use sqlsage_core::{Finding, Severity, Token, render_tokens, tokenize};
use sqlsage_query::TokenizedQuery;
use sqlsage_schema::{Table, index_ddl};

use super::predicate::{column_refs, leading_wildcards, quoted_number_comparisons};
use super::{ResolvedColumn, Rule, RuleContext};

/// WHERE predicates followed by ON conditions
fn filter_expressions(branch: &TokenizedQuery) -> impl Iterator<Item = &str> {
    branch
        .predicates
        .iter()
        .map(String::as_str)
        .chain(branch.joins.iter().filter_map(|j| j.condition.as_deref()))
}

fn has_expression_index(table: &Table, call: &str) -> bool {
    table.expression_index(call).is_some()
        || table.expression_index(&format!("({call})")).is_some()
}

/// Filtered or joined column with no index led by it
pub struct MissingIndexRule;

impl Rule for MissingIndexRule {
    fn id(&self) -> &'static str {
        "missing-index"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn description(&self) -> &'static str {
        "Predicate column without an index that starts with it"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let mut seen = BTreeSet::new();
        let mut findings = Vec::new();
        for branch in ctx.branches() {
            for expression in filter_expressions(branch) {
                let tokens = tokenize(expression);
                for column in column_refs(&tokens).iter().filter(|c| c.is_bare()) {
                    let Some(table) = ctx.resolve(branch, column).and_then(|r| r.table) else {
                        continue;
                    };
                    let Some(declared) = table.column(&column.column) else {
                        continue;
                    };
                    if table.leading_index_for(&declared.name).is_some()
                        || !seen.insert((table.name.to_lowercase(), declared.name.to_lowercase()))
                    {
                        continue;
                    }
                    tracing::trace!(table = %table.name, column = %declared.name, "unindexed predicate column");
                    let mut finding = Finding::new(
                        self.id(),
                        self.severity(),
                        format!(
                            "{}.{} is used to filter or join rows but no index starts with it",
                            table.name, declared.name
                        ),
                    )
                    .with_fix(format!("Create an index on {} ({})", table.name, declared.name))
                    .with_table(&table.name)
                    .with_columns(vec![declared.name.clone()]);
                    if ctx.config.suggest_indexes {
                        finding = finding.with_index(index_ddl(&table.name, &[declared.name.as_str()]));
                    }
                    findings.push(finding);
                }
            }
        }
        findings
    }
}

/// Function call wrapping an indexed column in a predicate
pub struct FunctionOnIndexedColumnRule;

impl Rule for FunctionOnIndexedColumnRule {
    fn id(&self) -> &'static str {
        "function-on-indexed-column"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn description(&self) -> &'static str {
        "Function applied to an indexed column, which defeats the index"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        // nothing is known to be indexed
        if ctx.schema.is_empty() {
            return Vec::new();
        }
        let mut seen = BTreeSet::new();
        let mut findings = Vec::new();
        for branch in ctx.branches() {
            for expression in filter_expressions(branch) {
                let tokens = tokenize(expression);
                for column in column_refs(&tokens) {
                    let Some(call) = &column.function else {
                        continue;
                    };
                    if !seen.insert(call.sql.to_lowercase()) {
                        continue;
                    }
                    match ctx.resolve(branch, &column) {
                        Some(ResolvedColumn {
                            table: Some(table),
                            ..
                        }) => {
                            if !table.has_column(&column.column)
                                || !table.is_indexed(&column.column)
                                || has_expression_index(table, &call.sql)
                            {
                                continue;
                            }
                            findings.push(
                                Finding::new(
                                    self.id(),
                                    self.severity(),
                                    format!(
                                        "{} wraps indexed column {}.{}, so the index cannot be used",
                                        call.sql, table.name, column.column
                                    ),
                                )
                                .with_fix(format!(
                                    "Compare the bare column instead, or create an expression index on {} ({})",
                                    table.name, call.sql
                                ))
                                .with_table(&table.name)
                                .with_columns(vec![column.column.clone()]),
                            );
                        }
                        _ => {
                            findings.push(
                                Finding::new(
                                    self.id(),
                                    Severity::Info,
                                    format!(
                                        "{} wraps column {} of a table missing from the schema; index use cannot be verified",
                                        call.sql,
                                        column.display()
                                    ),
                                )
                                .with_fix("Keep filtered columns outside function calls so indexes stay usable")
                                .with_columns(vec![column.column.clone()]),
                            );
                        }
                    }
                }
            }
        }
        findings
    }
}

/// `LIKE '%...'`
pub struct LeadingWildcardRule;

impl Rule for LeadingWildcardRule {
    fn id(&self) -> &'static str {
        "leading-wildcard"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn description(&self) -> &'static str {
        "LIKE pattern with a leading wildcard cannot use an index"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let mut seen = BTreeSet::new();
        let mut findings = Vec::new();
        for branch in ctx.branches() {
            for predicate in &branch.predicates {
                let tokens = tokenize(predicate);
                let refs = column_refs(&tokens);
                for found in leading_wildcards(&tokens, &refs) {
                    let target = found.column.as_ref().map(|c| c.display());
                    if !seen.insert((target.clone(), found.pattern.clone())) {
                        continue;
                    }
                    let message = match &target {
                        Some(column) => format!(
                            "LIKE '{}' starts with a wildcard, so an index on {column} cannot be used",
                            found.pattern
                        ),
                        None => format!("LIKE '{}' starts with a wildcard, so no index can be used", found.pattern),
                    };
                    let mut finding = Finding::new(self.id(), self.severity(), message)
                        .with_fix("Anchor the pattern at the start, or use full-text search for substring matches");
                    if let Some(column) = &found.column {
                        if let Some(table) = ctx.resolve(branch, column).and_then(|r| r.table) {
                            finding = finding.with_table(&table.name);
                        }
                        finding = finding.with_columns(vec![column.column.clone()]);
                    }
                    findings.push(finding);
                }
            }
        }
        findings
    }
}

/// Numeric column compared with a quoted number
pub struct ImplicitConversionRule;

impl Rule for ImplicitConversionRule {
    fn id(&self) -> &'static str {
        "implicit-conversion"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn description(&self) -> &'static str {
        "Numeric column compared with a string literal"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for (index, branch) in ctx.branches().enumerate() {
            for (position, predicate) in branch.predicates.iter().enumerate() {
                let tokens = tokenize(predicate);
                let refs = column_refs(&tokens);
                for comparison in quoted_number_comparisons(&tokens, &refs) {
                    let Some(table) = ctx.resolve(branch, &comparison.column).and_then(|r| r.table) else {
                        continue;
                    };
                    let Some(column) = table.column(&comparison.column.column) else {
                        continue;
                    };
                    if !column.is_numeric() {
                        continue;
                    }
                    let mut fixed = tokens.clone();
                    fixed[comparison.literal] = Token::Number(comparison.value.clone());
                    let fixed_sql = render_tokens(&fixed);
                    findings.push(
                        Finding::new(
                            self.id(),
                            self.severity(),
                            format!(
                                "{}.{} is {} but is compared with the string '{}', forcing an implicit conversion",
                                table.name, column.name, column.data_type, comparison.value
                            ),
                        )
                        .with_fix(format!("Compare with a numeric literal: {fixed_sql}"))
                        .with_rewrite(ctx.rewrite(index, |q| {
                            if let Some(slot) = q.predicates.get_mut(position) {
                                *slot = fixed_sql;
                            }
                        }))
                        .with_table(&table.name)
                        .with_columns(vec![column.name.clone()]),
                    );
                }
            }
        }
        findings
    }
}
