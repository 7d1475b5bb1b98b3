//! Join rules: missing or misdirected join conditions and cartesian products

use std::collections::BTreeSet;

use sqlsage_core::{Finding, Severity, tokenize};
use sqlsage_query::{JoinKind, TableRef, TokenizedQuery};
use sqlsage_schema::ForeignKeyLink;

use super::predicate::{ColumnRef, column_refs};
use super::{Rule, RuleContext, and_predicate, link_condition};

/// JOIN without ON/USING, or an ON condition that ignores a declared foreign key
pub struct JoinConditionRule;

impl JoinConditionRule {
    /// Returns true if the condition compares both columns of the link
    fn uses_link(
        ctx: &RuleContext<'_>,
        branch: &TokenizedQuery,
        refs: &[ColumnRef],
        link: &ForeignKeyLink,
    ) -> bool {
        let mentioned: BTreeSet<(String, String)> = refs
            .iter()
            .filter_map(|column| {
                let resolved = ctx.resolve(branch, column)?;
                let table = resolved.table?;
                Some((table.name.to_lowercase(), column.column.to_lowercase()))
            })
            .collect();
        mentioned.contains(&(link.from_table.to_lowercase(), link.from_column.to_lowercase()))
            && mentioned.contains(&(link.to_table.to_lowercase(), link.to_column.to_lowercase()))
    }
}

impl Rule for JoinConditionRule {
    fn id(&self) -> &'static str {
        "join-condition"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn description(&self) -> &'static str {
        "JOIN without a condition, or with one that ignores the foreign key"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for (index, branch) in ctx.branches().enumerate() {
            let refs: Vec<&TableRef> = branch.table_refs().collect();
            let offset = branch.from.len();
            for (position, join) in branch.joins.iter().enumerate() {
                if !join.kind.takes_condition() || !join.using.is_empty() {
                    continue;
                }
                let node = offset + position;
                let links: Vec<(ForeignKeyLink, &TableRef)> = refs[..node]
                    .iter()
                    .flat_map(|earlier| {
                        ctx.foreign_keys(&join.table, earlier)
                            .into_iter()
                            .map(move |link| (link, *earlier))
                    })
                    .collect();
                let suggestion = links
                    .first()
                    .map(|(link, earlier)| link_condition(link, &join.table, earlier));

                match &join.condition {
                    None => {
                        let mut finding = Finding::new(
                            self.id(),
                            self.severity(),
                            format!(
                                "{} {} has no ON or USING condition",
                                join.kind.as_sql(),
                                join.table.to_sql()
                            ),
                        )
                        .with_table(&join.table.name);
                        finding = match suggestion {
                            Some(condition) => finding
                                .with_fix(format!("Join on the foreign key: ON {condition}"))
                                .with_rewrite(ctx.rewrite(index, |q| {
                                    if let Some(spec) = q.joins.get_mut(position) {
                                        spec.condition = Some(condition);
                                    }
                                })),
                            None => finding.with_fix(
                                "Add an ON condition relating the joined table to the rest of the query",
                            ),
                        };
                        findings.push(finding);
                    }
                    Some(condition) => {
                        let Some((link, _)) = links.first() else {
                            continue;
                        };
                        let tokens = tokenize(condition);
                        let condition_refs = column_refs(&tokens);
                        if links
                            .iter()
                            .any(|(link, _)| Self::uses_link(ctx, branch, &condition_refs, link))
                        {
                            continue;
                        }
                        let mut finding = Finding::new(
                            self.id(),
                            self.severity(),
                            format!(
                                "ON {condition} does not use the foreign key {}.{} -> {}.{}",
                                link.from_table, link.from_column, link.to_table, link.to_column
                            ),
                        )
                        .with_table(&join.table.name)
                        .with_columns(vec![link.from_column.clone()]);
                        if let Some(suggested) = suggestion {
                            finding = finding.with_fix(format!(
                                "Check the join columns; the declared relationship is ON {suggested}"
                            ));
                        }
                        findings.push(finding);
                    }
                }
            }
        }
        findings
    }
}

/// Union-find over the table references of one branch
#[derive(Debug)]
struct Components {
    parent: Vec<usize>,
}

impl Components {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut node: usize) -> usize {
        while self.parent[node] != node {
            self.parent[node] = self.parent[self.parent[node]];
            node = self.parent[node];
        }
        node
    }

    fn union(&mut self, a: usize, b: usize) {
        let (a, b) = (self.find(a), self.find(b));
        if a != b {
            self.parent[b] = a;
        }
    }

    fn union_all(&mut self) {
        for node in 1..self.parent.len() {
            self.union(0, node);
        }
    }

    fn connected(&mut self, a: usize, b: usize) -> bool {
        self.find(a) == self.find(b)
    }
}

/// Two or more tables combined without predicates linking all of them
pub struct CartesianJoinRule;

impl CartesianJoinRule {
    /// Links every table the expression mentions. An expression comparing
    /// columns that cannot be attributed to a table links everything.
    fn link_expression(
        ctx: &RuleContext<'_>,
        branch: &TokenizedQuery,
        expression: &str,
        components: &mut Components,
    ) {
        let tokens = tokenize(expression);
        let refs = column_refs(&tokens);
        let mut nodes = Vec::new();
        let mut unresolved = false;
        for column in &refs {
            match ctx.resolve(branch, column) {
                Some(resolved) => nodes.push(resolved.node),
                None => unresolved = true,
            }
        }
        if unresolved && refs.len() >= 2 {
            components.union_all();
            return;
        }
        for pair in nodes.windows(2) {
            components.union(pair[0], pair[1]);
        }
    }

    fn components(ctx: &RuleContext<'_>, branch: &TokenizedQuery, len: usize) -> Components {
        let mut components = Components::new(len);
        let offset = branch.from.len();
        for (position, join) in branch.joins.iter().enumerate() {
            let node = offset + position;
            if join.kind == JoinKind::Natural || !join.using.is_empty() {
                components.union(node.saturating_sub(1), node);
            } else if let Some(condition) = &join.condition {
                Self::link_expression(ctx, branch, condition, &mut components);
            }
        }
        for predicate in &branch.predicates {
            Self::link_expression(ctx, branch, predicate, &mut components);
        }
        components
    }
}

impl Rule for CartesianJoinRule {
    fn id(&self) -> &'static str {
        "cartesian-join"
    }

    fn severity(&self) -> Severity {
        Severity::Critical
    }

    fn description(&self) -> &'static str {
        "Tables combined without a linking predicate"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        for (index, branch) in ctx.branches().enumerate() {
            let refs: Vec<&TableRef> = branch.table_refs().collect();
            if refs.len() < 2 {
                continue;
            }
            let mut components = Self::components(ctx, branch, refs.len());
            let (anchored, detached): (Vec<usize>, Vec<usize>) =
                (0..refs.len()).partition(|&node| components.connected(0, node));
            let Some(&first_detached) = detached.first() else {
                continue;
            };

            let names = |nodes: &[usize]| {
                nodes
                    .iter()
                    .map(|&n| refs[n].identifier().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            let mut finding = Finding::new(
                self.id(),
                self.severity(),
                format!(
                    "{} is not linked to {} by any join condition or predicate, producing a cartesian product",
                    names(&detached),
                    names(&anchored)
                ),
            )
            .with_table(&refs[first_detached].name);

            let suggestion = detached.iter().find_map(|&d| {
                anchored.iter().find_map(|&a| {
                    let link = ctx.foreign_keys(refs[d], refs[a]).into_iter().next()?;
                    Some((d, link_condition(&link, refs[d], refs[a])))
                })
            });
            finding = match suggestion {
                Some((node, condition)) => {
                    let offset = branch.from.len();
                    let rewrite = ctx.rewrite(index, |q| {
                        let open_join = node
                            .checked_sub(offset)
                            .and_then(|position| q.joins.get_mut(position))
                            .filter(|join| join.kind.takes_condition() && !join.has_condition());
                        match open_join {
                            Some(join) => join.condition = Some(condition.clone()),
                            None => and_predicate(q, condition.clone()),
                        }
                    });
                    finding
                        .with_fix(format!("Add a join condition such as {condition}"))
                        .with_rewrite(rewrite)
                }
                None => finding.with_fix(format!(
                    "Add a join condition relating {} to {}",
                    names(&detached),
                    names(&anchored)
                )),
            };
            // one finding per query, however many branches are affected
            return vec![finding];
        }
        Vec::new()
    }
}
