//! Clause-level query representation

use serde::{Deserialize, Serialize};
use sqlsage_core::quote_ident;
use std::collections::BTreeMap;
use std::fmt;

/// Table reference with optional alias
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    /// Table name without schema qualifier. For derived tables this is the
    /// parenthesized subquery text.
    pub name: String,
    /// Schema qualifier, if written (`public.users`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Subquery or table function rather than a named table
    pub derived: bool,
}

impl TableRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            alias: None,
            derived: false,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Get the identifier to use when referencing this table
    pub fn identifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Check if a column qualifier refers to this table (alias or name)
    pub fn matches(&self, qualifier: &str) -> bool {
        match &self.alias {
            Some(alias) => alias.eq_ignore_ascii_case(qualifier),
            None => !self.derived && self.name.eq_ignore_ascii_case(qualifier),
        }
    }

    pub fn to_sql(&self) -> String {
        let mut sql = if self.derived {
            self.name.clone()
        } else {
            match &self.schema {
                Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(&self.name)),
                None => quote_ident(&self.name),
            }
        };
        if let Some(alias) = &self.alias {
            sql.push(' ');
            sql.push_str(&quote_ident(alias));
        }
        sql
    }
}

/// Join flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
    Natural,
}

impl JoinKind {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Inner => "JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Full => "FULL JOIN",
            Self::Cross => "CROSS JOIN",
            Self::Natural => "NATURAL JOIN",
        }
    }

    /// Cross and natural joins never carry an explicit condition
    pub fn takes_condition(&self) -> bool {
        !matches!(self, Self::Cross | Self::Natural)
    }
}

/// A `JOIN` in the FROM clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinSpec {
    pub kind: JoinKind,
    pub table: TableRef,
    /// Normalized `ON` condition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// `USING (...)` columns
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub using: Vec<String>,
}

impl JoinSpec {
    pub fn has_condition(&self) -> bool {
        self.condition.is_some() || !self.using.is_empty()
    }

    pub fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", self.kind.as_sql(), self.table.to_sql());
        if let Some(condition) = &self.condition {
            sql.push_str(" ON ");
            sql.push_str(condition);
        } else if !self.using.is_empty() {
            let columns: Vec<String> = self.using.iter().map(|c| quote_ident(c)).collect();
            sql.push_str(&format!(" USING ({})", columns.join(", ")));
        }
        sql
    }
}

/// Named subquery from a `WITH` prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonTableExpr {
    pub name: String,
    /// Normalized body, without the surrounding parentheses
    pub body: String,
}

/// Set operator joining compound query branches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetOperator {
    Union,
    UnionAll,
    Intersect,
    Except,
}

impl SetOperator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Union => "UNION",
            Self::UnionAll => "UNION ALL",
            Self::Intersect => "INTERSECT",
            Self::Except => "EXCEPT",
        }
    }
}

/// A branch appended with a set operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompoundBranch {
    pub operator: SetOperator,
    pub query: TokenizedQuery,
}

/// A SELECT statement segmented into normalized clauses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizedQuery {
    pub ctes: Vec<CommonTableExpr>,
    pub recursive: bool,
    pub distinct: bool,
    /// Selected expressions, in order
    pub select: Vec<String>,
    /// Comma-separated FROM entries
    pub from: Vec<TableRef>,
    /// Lowercase alias to table name
    pub aliases: BTreeMap<String, String>,
    pub joins: Vec<JoinSpec>,
    /// WHERE split on top-level AND
    pub predicates: Vec<String>,
    pub group_by: Vec<String>,
    pub having: Option<String>,
    pub order_by: Vec<String>,
    pub limit: Option<u64>,
    /// Non-numeric LIMIT operand such as a bind parameter
    pub limit_expr: Option<String>,
    pub offset: Option<u64>,
    pub compound: Vec<CompoundBranch>,
}

impl TokenizedQuery {
    /// Every table reference in FROM and JOIN, in order
    pub fn table_refs(&self) -> impl Iterator<Item = &TableRef> {
        self.from.iter().chain(self.joins.iter().map(|j| &j.table))
    }

    /// Named (non-derived) tables in FROM and JOIN
    pub fn tables(&self) -> Vec<&TableRef> {
        self.table_refs().filter(|t| !t.derived).collect()
    }

    pub fn table_count(&self) -> usize {
        self.table_refs().count()
    }

    /// Resolve a column qualifier (alias or table name) to its table reference
    pub fn resolve_qualifier(&self, qualifier: &str) -> Option<&TableRef> {
        self.table_refs().find(|t| t.matches(qualifier))
    }

    pub fn has_where(&self) -> bool {
        !self.predicates.is_empty()
    }

    pub fn has_limit(&self) -> bool {
        self.limit.is_some() || self.limit_expr.is_some()
    }

    /// Returns true if the select list contains `*` or `t.*`
    pub fn selects_star(&self) -> bool {
        self.select.iter().any(|item| item == "*" || item.ends_with(".*"))
    }

    /// Returns true if `name` is declared by the WITH prefix
    pub fn is_cte(&self, name: &str) -> bool {
        self.ctes.iter().any(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// This query followed by its compound branches
    pub fn branches(&self) -> impl Iterator<Item = &TokenizedQuery> {
        std::iter::once(self).chain(self.compound.iter().map(|b| &b.query))
    }

    /// Re-serialize clause by clause. Tokenizing the result yields an equal
    /// `TokenizedQuery`.
    pub fn to_sql(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        if !self.ctes.is_empty() {
            let ctes: Vec<String> = self
                .ctes
                .iter()
                .map(|cte| format!("{} AS ({})", quote_ident(&cte.name), cte.body))
                .collect();
            let recursive = if self.recursive { "RECURSIVE " } else { "" };
            parts.push(format!("WITH {}{}", recursive, ctes.join(", ")));
        }

        let mut select = String::from("SELECT");
        if self.distinct {
            select.push_str(" DISTINCT");
        }
        if !self.select.is_empty() {
            select.push(' ');
            select.push_str(&self.select.join(", "));
        }
        parts.push(select);

        if !self.from.is_empty() {
            let from: Vec<String> = self.from.iter().map(TableRef::to_sql).collect();
            parts.push(format!("FROM {}", from.join(", ")));
        }
        parts.extend(self.joins.iter().map(JoinSpec::to_sql));

        if !self.predicates.is_empty() {
            parts.push(format!("WHERE {}", self.predicates.join(" AND ")));
        }
        if !self.group_by.is_empty() {
            parts.push(format!("GROUP BY {}", self.group_by.join(", ")));
        }
        if let Some(having) = &self.having {
            parts.push(format!("HAVING {having}"));
        }
        if !self.order_by.is_empty() {
            parts.push(format!("ORDER BY {}", self.order_by.join(", ")));
        }
        match (&self.limit, &self.limit_expr) {
            (Some(limit), _) => parts.push(format!("LIMIT {limit}")),
            (None, Some(expr)) => parts.push(format!("LIMIT {expr}")),
            (None, None) => {}
        }
        if let Some(offset) = self.offset {
            parts.push(format!("OFFSET {offset}"));
        }

        for branch in &self.compound {
            parts.push(branch.operator.as_sql().to_string());
            parts.push(branch.query.to_sql());
        }

        parts.join(" ")
    }
}

impl fmt::Display for TokenizedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}
