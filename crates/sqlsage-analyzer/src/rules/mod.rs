//! Heuristic Rule Engine
//!
//! Every check is a stateless type implementing [`Rule`]. The engine runs the
//! enabled rules in registration order against one tokenized query and
//! concatenates their findings. Rules never fail: when the schema lacks the
//! data a rule needs, the rule simply reports nothing.

mod indexes;
mod joins;
pub(crate) mod predicate;
mod schema_aware;
mod structure;

pub use indexes::{
    FunctionOnIndexedColumnRule, ImplicitConversionRule, LeadingWildcardRule, MissingIndexRule,
};
pub use joins::{CartesianJoinRule, JoinConditionRule};
pub use schema_aware::UnknownTableRule;
pub use structure::{
    InSubqueryRule, MissingWhereRule, OrderWithoutLimitRule, SelectStarRule, TooManyJoinsRule,
    UnionWithoutAllRule,
};

use std::fmt;

use sqlsage_core::{AnalyzerConfig, Finding, Severity, quote_ident, tokenize};
use sqlsage_query::{TableRef, TokenizedQuery};
use sqlsage_schema::{ForeignKeyLink, ParseWarning, SchemaModel, Table};

use predicate::ColumnRef;

/// Rule id used for schema parse warnings surfaced as findings
pub const SCHEMA_PARSE_RULE_ID: &str = "schema-parse";

/// A single heuristic check.
///
/// Rules are pure: the same context always yields the same findings, and a
/// rule never depends on what another rule reported.
pub trait Rule: Send + Sync {
    /// Stable identifier, used in findings and in `disabled_rules`
    fn id(&self) -> &'static str;

    /// Severity of the findings this rule normally emits
    fn severity(&self) -> Severity;

    /// One-line description of what the rule detects
    fn description(&self) -> &'static str;

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<Finding>;
}

/// Everything a rule may inspect
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub schema: &'a SchemaModel,
    pub query: &'a TokenizedQuery,
    pub config: &'a AnalyzerConfig,
}

/// A column reference resolved to one of the branch's table references
#[derive(Debug, Clone, Copy)]
pub(crate) struct ResolvedColumn<'a> {
    /// Position in `TokenizedQuery::table_refs`
    pub node: usize,
    pub table_ref: &'a TableRef,
    /// Schema entry, when the table is declared
    pub table: Option<&'a Table>,
}

impl<'a> RuleContext<'a> {
    pub fn new(
        schema: &'a SchemaModel,
        query: &'a TokenizedQuery,
        config: &'a AnalyzerConfig,
    ) -> Self {
        Self {
            schema,
            query,
            config,
        }
    }

    /// The query itself followed by its compound branches
    pub fn branches(&self) -> impl Iterator<Item = &'a TokenizedQuery> {
        self.query.branches()
    }

    /// Schema entry for a table reference. Derived tables and WITH names
    /// have none.
    pub fn table(&self, table_ref: &TableRef) -> Option<&'a Table> {
        if table_ref.derived || self.query.is_cte(&table_ref.name) {
            return None;
        }
        self.schema.table(&table_ref.name)
    }

    /// Named tables of a branch that are real relations rather than WITH names
    pub fn base_tables(&self, branch: &'a TokenizedQuery) -> Vec<&'a TableRef> {
        branch
            .tables()
            .into_iter()
            .filter(|t| !self.query.is_cte(&t.name))
            .collect()
    }

    /// Resolves a column to the table reference it belongs to.
    ///
    /// A qualifier is matched against aliases and table names. An unqualified
    /// column belongs to the only table of the branch, or to the single
    /// declared table that has a column of that name.
    pub(crate) fn resolve(
        &self,
        branch: &'a TokenizedQuery,
        column: &ColumnRef,
    ) -> Option<ResolvedColumn<'a>> {
        let refs: Vec<&'a TableRef> = branch.table_refs().collect();
        let node = match &column.qualifier {
            Some(qualifier) => refs.iter().position(|t| t.matches(qualifier))?,
            None if refs.len() == 1 => 0,
            None => {
                let mut owners = refs.iter().enumerate().filter(|(_, t)| {
                    self.table(t)
                        .is_some_and(|table| table.has_column(&column.column))
                });
                let (node, _) = owners.next()?;
                if owners.next().is_some() {
                    return None;
                }
                node
            }
        };
        let table_ref = refs[node];
        Some(ResolvedColumn {
            node,
            table_ref,
            table: self.table(table_ref),
        })
    }

    /// Declared foreign keys linking two table references
    pub(crate) fn foreign_keys(&self, a: &TableRef, b: &TableRef) -> Vec<ForeignKeyLink> {
        match (self.table(a), self.table(b)) {
            (Some(a), Some(b)) => self.schema.foreign_keys_between(&a.name, &b.name),
            _ => Vec::new(),
        }
    }

    /// Applies `edit` to a copy of branch `index` and serializes the whole query
    pub fn rewrite(&self, index: usize, edit: impl FnOnce(&mut TokenizedQuery)) -> String {
        let mut query = self.query.clone();
        if index == 0 {
            edit(&mut query);
        } else if let Some(branch) = query.compound.get_mut(index - 1) {
            edit(&mut branch.query);
        }
        query.to_sql()
    }
}

/// Renders a foreign key as a join condition between two table references
pub(crate) fn link_condition(link: &ForeignKeyLink, a: &TableRef, b: &TableRef) -> String {
    let (from, to) = if a.name.eq_ignore_ascii_case(&link.from_table) {
        (a, b)
    } else {
        (b, a)
    };
    format!(
        "{}.{} = {}.{}",
        quote_ident(from.identifier()),
        quote_ident(&link.from_column),
        quote_ident(to.identifier()),
        quote_ident(&link.to_column)
    )
}

/// Appends a WHERE predicate. Existing predicates with a top-level OR are
/// parenthesized so the new condition applies to all of them.
pub(crate) fn and_predicate(query: &mut TokenizedQuery, condition: String) {
    for predicate in &mut query.predicates {
        if predicate::has_top_level_or(&tokenize(predicate)) {
            *predicate = format!("({predicate})");
        }
    }
    query.predicates.push(condition);
}

/// The default rule set, in evaluation order
pub fn default_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(SelectStarRule),
        Box::new(MissingWhereRule),
        Box::new(JoinConditionRule),
        Box::new(MissingIndexRule),
        Box::new(FunctionOnIndexedColumnRule),
        Box::new(OrderWithoutLimitRule),
        Box::new(CartesianJoinRule),
        Box::new(InSubqueryRule),
        Box::new(LeadingWildcardRule),
        Box::new(UnionWithoutAllRule),
        Box::new(ImplicitConversionRule),
        Box::new(TooManyJoinsRule),
        Box::new(UnknownTableRule),
    ]
}

/// Runs registered rules against a query
pub struct RuleEngine {
    rules: Vec<Box<dyn Rule>>,
    config: AnalyzerConfig,
}

impl fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleEngine")
            .field("rules", &self.rules.iter().map(|r| r.id()).collect::<Vec<_>>())
            .field("config", &self.config)
            .finish()
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

impl RuleEngine {
    /// Creates an engine with the default rule set
    pub fn new(config: AnalyzerConfig) -> Self {
        Self::with_rules(config, default_rules())
    }

    /// Creates an engine with a custom rule set
    pub fn with_rules(config: AnalyzerConfig, rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules, config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Registered rules, including disabled ones
    pub fn rules(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    /// Evaluates every enabled rule and concatenates the findings
    pub fn evaluate(&self, schema: &SchemaModel, query: &TokenizedQuery) -> Vec<Finding> {
        let ctx = RuleContext::new(schema, query, &self.config);
        let mut findings = Vec::new();
        for rule in &self.rules {
            if !self.config.is_rule_enabled(rule.id()) {
                tracing::trace!(rule = rule.id(), "rule disabled");
                continue;
            }
            let found = rule.check(&ctx);
            tracing::trace!(rule = rule.id(), findings = found.len(), "rule evaluated");
            findings.extend(found);
        }
        tracing::debug!(
            tables = query.table_count(),
            findings = findings.len(),
            "rule evaluation complete"
        );
        findings
    }
}

/// Surfaces schema parse warnings as INFO findings
pub fn parse_warning_findings(warnings: &[ParseWarning]) -> Vec<Finding> {
    warnings
        .iter()
        .map(|warning| {
            tracing::warn!(
                kind = %warning.kind,
                statement = %warning.statement,
                "schema parse warning"
            );
            let mut finding = Finding::new(SCHEMA_PARSE_RULE_ID, Severity::Info, warning.to_string());
            if !warning.statement.is_empty() {
                finding = finding.with_fix(format!("Review the statement: {}", warning.statement));
            }
            finding
        })
        .collect()
}

#[cfg(test)]
mod tests;
