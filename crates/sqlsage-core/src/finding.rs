//! Findings - the output unit of every analysis rule

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level for findings.
///
/// Variants are declared most severe first, so the derived ordering sorts
/// critical findings ahead of warnings and informational notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Critical issue that should be addressed immediately
    Critical,
    /// Warning that may impact performance
    Warning,
    /// Informational suggestion for optimization
    Info,
}

impl Severity {
    /// Returns true if this is a critical issue
    pub fn is_critical(&self) -> bool {
        matches!(self, Self::Critical)
    }

    /// Returns true if this is at least a warning
    pub fn is_warning_or_above(&self) -> bool {
        matches!(self, Self::Critical | Self::Warning)
    }

    /// Returns the severity level as a display string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single issue detected by a rule, with optional remediation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Stable identifier of the rule that produced this finding
    pub rule_id: String,
    /// Severity level
    pub severity: Severity,
    /// Human-readable message explaining the issue
    pub message: String,
    /// Suggested action to improve the query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
    /// Suggested `CREATE INDEX` statement, if applicable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_index: Option<String>,
    /// Full rewritten query, when the rule can produce one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewritten_query: Option<String>,
    /// Related table name, if applicable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Related column names, if applicable
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
}

impl Finding {
    /// Creates a new finding
    pub fn new(rule_id: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            severity,
            message: message.into(),
            suggested_fix: None,
            suggested_index: None,
            rewritten_query: None,
            table: None,
            columns: Vec::new(),
        }
    }

    /// Sets the suggested fix
    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(fix.into());
        self
    }

    /// Sets the suggested index definition
    pub fn with_index(mut self, ddl: impl Into<String>) -> Self {
        self.suggested_index = Some(ddl.into());
        self
    }

    /// Sets the rewritten query
    pub fn with_rewrite(mut self, sql: impl Into<String>) -> Self {
        self.rewritten_query = Some(sql.into());
        self
    }

    /// Sets the related table
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Sets the related columns
    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }
}
