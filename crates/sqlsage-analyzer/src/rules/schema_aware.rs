//! Rules that compare the query against the declared schema

use std::collections::BTreeSet;

use sqlsage_core::{Finding, Severity};

use super::{Rule, RuleContext};

/// Table referenced by the query but never declared.
///
/// Silent for an empty schema, where nothing is declared at all.
pub struct UnknownTableRule;

impl Rule for UnknownTableRule {
    fn id(&self) -> &'static str {
        "unknown-table"
    }

    fn severity(&self) -> Severity {
        Severity::Info
    }

    fn description(&self) -> &'static str {
        "Table missing from the supplied schema"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        if ctx.schema.is_empty() {
            return Vec::new();
        }
        let mut seen = BTreeSet::new();
        let mut findings = Vec::new();
        for branch in ctx.branches() {
            for table in ctx.base_tables(branch) {
                if ctx.schema.contains_table(&table.name) || !seen.insert(table.name.to_lowercase()) {
                    continue;
                }
                findings.push(
                    Finding::new(
                        self.id(),
                        self.severity(),
                        format!(
                            "Table {} is not declared in the schema; schema-based checks skip it",
                            table.name
                        ),
                    )
                    .with_fix("Add its CREATE TABLE statement to the schema, or check the table name")
                    .with_table(&table.name),
                );
            }
        }
        findings
    }
}
