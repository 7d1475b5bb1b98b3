//! Rules about the overall shape of a query

use sqlsage_core::{Finding, Severity, quote_ident, render_tokens, tokenize};
use sqlsage_query::{QueryTokenizer, SetOperator, TableRef, TokenizedQuery};

use super::predicate::{InSubquery, column_refs, in_subqueries};
use super::{Rule, RuleContext, and_predicate};

/// `*` or `t.*` in the select list
pub struct SelectStarRule;

impl SelectStarRule {
    fn table_columns(ctx: &RuleContext<'_>, table_ref: &TableRef, qualify: bool) -> Option<Vec<String>> {
        let table = ctx.table(table_ref)?;
        if table.columns.is_empty() {
            return None;
        }
        let columns = table
            .columns
            .iter()
            .map(|column| {
                if qualify {
                    format!("{}.{}", quote_ident(table_ref.identifier()), quote_ident(&column.name))
                } else {
                    quote_ident(&column.name)
                }
            })
            .collect();
        Some(columns)
    }

    /// Select list with every star replaced by declared columns, or `None`
    /// when some starred table is not declared.
    fn expand(ctx: &RuleContext<'_>, branch: &TokenizedQuery) -> Option<Vec<String>> {
        let refs: Vec<&TableRef> = branch.table_refs().collect();
        let qualify = refs.len() > 1;
        let mut expanded = Vec::new();
        for item in &branch.select {
            if item == "*" {
                for table_ref in &refs {
                    expanded.extend(Self::table_columns(ctx, table_ref, qualify)?);
                }
            } else if let Some(qualifier) = item.strip_suffix(".*") {
                let name = qualifier.rsplit('.').next().unwrap_or(qualifier).trim_matches('"');
                let table_ref = branch.resolve_qualifier(name)?;
                expanded.extend(Self::table_columns(ctx, table_ref, true)?);
            } else {
                expanded.push(item.clone());
            }
        }
        Some(expanded)
    }
}

impl Rule for SelectStarRule {
    fn id(&self) -> &'static str {
        "select-star"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn description(&self) -> &'static str {
        "SELECT * fetches columns the caller may not need"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for (index, branch) in ctx.branches().enumerate() {
            if !branch.selects_star() {
                continue;
            }
            let mut finding = Finding::new(
                self.id(),
                self.severity(),
                "SELECT * retrieves every column, which wastes I/O and breaks when the table changes",
            );
            match Self::expand(ctx, branch) {
                Some(columns) => {
                    finding = finding
                        .with_fix(format!("List the needed columns explicitly: {}", columns.join(", ")))
                        .with_rewrite(ctx.rewrite(index, |q| q.select = columns.clone()))
                        .with_columns(columns);
                }
                None => {
                    finding = finding.with_fix("List the needed columns explicitly instead of *");
                }
            }
            if let Some(table) = ctx.base_tables(branch).first() {
                finding = finding.with_table(&table.name);
            }
            findings.push(finding);
        }
        findings
    }
}

/// Unfiltered, unbounded read of a large table
pub struct MissingWhereRule;

impl Rule for MissingWhereRule {
    fn id(&self) -> &'static str {
        "missing-where"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn description(&self) -> &'static str {
        "No WHERE and no LIMIT on a large or unknown-size table"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for branch in ctx.branches() {
            if branch.has_where() || branch.has_limit() {
                continue;
            }
            let large: Vec<&str> = ctx
                .base_tables(branch)
                .into_iter()
                .filter(|t| ctx.config.is_large_table(&t.name))
                .map(|t| t.name.as_str())
                .collect();
            let Some(first) = large.first() else {
                continue;
            };
            findings.push(
                Finding::new(
                    self.id(),
                    self.severity(),
                    format!(
                        "Query has no WHERE clause or LIMIT and reads every row of {}",
                        large.join(", ")
                    ),
                )
                .with_fix("Add a WHERE clause to filter rows, or a LIMIT to bound the result")
                .with_table(*first),
            );
        }
        findings
    }
}

/// Sorting a multi-table result that is never truncated
pub struct OrderWithoutLimitRule;

impl Rule for OrderWithoutLimitRule {
    fn id(&self) -> &'static str {
        "order-without-limit"
    }

    fn severity(&self) -> Severity {
        Severity::Info
    }

    fn description(&self) -> &'static str {
        "ORDER BY without LIMIT on a multi-table query"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        ctx.branches()
            .filter(|b| !b.order_by.is_empty() && !b.has_limit() && b.table_count() >= 2)
            .map(|branch| {
                Finding::new(
                    self.id(),
                    self.severity(),
                    format!(
                        "ORDER BY {} sorts the full joined result of {} tables",
                        branch.order_by.join(", "),
                        branch.table_count()
                    ),
                )
                .with_fix("Add a LIMIT if only the first rows are needed")
            })
            .collect()
    }
}

/// `UNION` where `UNION ALL` may do
pub struct UnionWithoutAllRule;

impl Rule for UnionWithoutAllRule {
    fn id(&self) -> &'static str {
        "union-without-all"
    }

    fn severity(&self) -> Severity {
        Severity::Info
    }

    fn description(&self) -> &'static str {
        "UNION deduplicates rows; UNION ALL avoids the extra work"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let unions = ctx
            .query
            .compound
            .iter()
            .filter(|b| b.operator == SetOperator::Union)
            .count();
        if unions == 0 {
            return Vec::new();
        }
        let rewrite = ctx.rewrite(0, |q| {
            for branch in &mut q.compound {
                if branch.operator == SetOperator::Union {
                    branch.operator = SetOperator::UnionAll;
                }
            }
        });
        vec![
            Finding::new(
                self.id(),
                self.severity(),
                "UNION removes duplicates, which requires sorting or hashing the combined rows",
            )
            .with_fix("Use UNION ALL if duplicates are acceptable or cannot occur")
            .with_rewrite(rewrite),
        ]
    }
}

/// More joins than the configured limit
pub struct TooManyJoinsRule;

impl Rule for TooManyJoinsRule {
    fn id(&self) -> &'static str {
        "too-many-joins"
    }

    fn severity(&self) -> Severity {
        Severity::Info
    }

    fn description(&self) -> &'static str {
        "Join count above the configured maximum"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let max_joins = ctx.config.max_joins;
        ctx.branches()
            .filter_map(|branch| {
                let joins = branch.table_count().saturating_sub(1);
                (joins > max_joins).then(|| {
                    Finding::new(
                        self.id(),
                        self.severity(),
                        format!("Query performs {joins} joins, more than the configured maximum of {max_joins}"),
                    )
                    .with_fix("Check that every joined table is needed, or pre-aggregate part of the data in a CTE")
                })
            })
            .collect()
    }
}

/// `col [NOT] IN (SELECT ...)`
pub struct InSubqueryRule;

impl InSubqueryRule {
    /// Correlated `[NOT] EXISTS` equivalent, when the subquery is a simple
    /// single-column select.
    fn exists_rewrite(ctx: &RuleContext<'_>, branch: &TokenizedQuery, found: &InSubquery) -> Option<String> {
        let inner = QueryTokenizer::parse(&render_tokens(&found.subquery)).ok()?;
        let simple = inner.select.len() == 1
            && inner.ctes.is_empty()
            && inner.compound.is_empty()
            && inner.group_by.is_empty()
            && inner.having.is_none()
            && !inner.has_limit();
        if !simple {
            return None;
        }
        let inner_table = inner.table_refs().next()?;
        if branch
            .table_refs()
            .any(|t| t.identifier().eq_ignore_ascii_case(inner_table.identifier()))
        {
            return None;
        }

        let select_tokens = tokenize(&inner.select[0]);
        let select_refs = column_refs(&select_tokens);
        let [inner_column] = select_refs.as_slice() else {
            return None;
        };
        if inner_column.start != 0 || inner_column.end != select_tokens.len() {
            return None;
        }
        let inner_sql = match &inner_column.qualifier {
            Some(_) => inner.select[0].clone(),
            None => format!(
                "{}.{}",
                quote_ident(inner_table.identifier()),
                quote_ident(&inner_column.column)
            ),
        };
        let outer_qualifier = match &found.column.qualifier {
            Some(qualifier) => qualifier.clone(),
            None => ctx.resolve(branch, &found.column)?.table_ref.identifier().to_string(),
        };
        let outer_sql = format!("{}.{}", quote_ident(&outer_qualifier), quote_ident(&found.column.column));

        let mut correlated = inner.clone();
        correlated.distinct = false;
        correlated.select = vec!["1".to_string()];
        and_predicate(&mut correlated, format!("{inner_sql} = {outer_sql}"));
        let not = if found.negated { "NOT " } else { "" };
        Some(format!("{not}EXISTS ({})", correlated.to_sql()))
    }
}

impl Rule for InSubqueryRule {
    fn id(&self) -> &'static str {
        "in-subquery"
    }

    fn severity(&self) -> Severity {
        Severity::Info
    }

    fn description(&self) -> &'static str {
        "IN (SELECT ...) that may be better expressed as EXISTS or a JOIN"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for (index, branch) in ctx.branches().enumerate() {
            for (position, predicate) in branch.predicates.iter().enumerate() {
                let tokens = tokenize(predicate);
                let refs = column_refs(&tokens);
                for found in in_subqueries(&tokens, &refs) {
                    let operator = if found.negated { "NOT IN" } else { "IN" };
                    let mut finding = Finding::new(
                        self.id(),
                        self.severity(),
                        format!(
                            "{} {operator} (SELECT ...) can force the subquery result to be materialized and probed per row",
                            found.column.display()
                        ),
                    )
                    .with_columns(vec![found.column.column.clone()]);

                    match Self::exists_rewrite(ctx, branch, &found) {
                        Some(exists) => {
                            let mut fix = format!("Rewrite as a correlated subquery: {exists}");
                            if found.negated {
                                fix.push_str(" (unlike NOT IN, NOT EXISTS still returns rows when the subquery yields NULL)");
                            }
                            finding = finding.with_fix(fix);
                            if found.start == 0 && found.end == tokens.len() {
                                finding = finding.with_rewrite(ctx.rewrite(index, |q| {
                                    if let Some(slot) = q.predicates.get_mut(position) {
                                        *slot = exists;
                                    }
                                }));
                            }
                        }
                        None => {
                            finding = finding.with_fix("Rewrite as a JOIN or a correlated EXISTS subquery");
                        }
                    }
                    findings.push(finding);
                }
            }
        }
        findings
    }
}
