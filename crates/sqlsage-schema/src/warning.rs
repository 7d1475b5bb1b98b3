//! Non-fatal schema parse anomalies

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a schema parse warning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseWarningKind {
    /// Statement is not a table, index or alter-table definition
    UnrecognizedStatement,
    /// Column definition could not be understood
    MalformedColumn,
    /// Table or alter-table constraint could not be understood
    MalformedConstraint,
    /// Table declared more than once; the first definition wins
    DuplicateTable,
    /// Index or alter statement targets a table that was never declared
    UnknownTable,
    /// Foreign key points at a missing table or column
    UnresolvedReference,
}

impl ParseWarningKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnrecognizedStatement => "unrecognized statement",
            Self::MalformedColumn => "malformed column",
            Self::MalformedConstraint => "malformed constraint",
            Self::DuplicateTable => "duplicate table",
            Self::UnknownTable => "unknown table",
            Self::UnresolvedReference => "unresolved reference",
        }
    }
}

impl fmt::Display for ParseWarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recoverable problem found while parsing schema text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ParseWarning {
    pub kind: ParseWarningKind,
    pub message: String,
    /// The offending statement, normalized and shortened
    pub statement: String,
}

const STATEMENT_PREVIEW_CHARS: usize = 80;

impl ParseWarning {
    pub fn new(kind: ParseWarningKind, message: impl Into<String>, statement: &str) -> Self {
        let statement = if statement.chars().count() > STATEMENT_PREVIEW_CHARS {
            let preview: String = statement.chars().take(STATEMENT_PREVIEW_CHARS).collect();
            format!("{preview}...")
        } else {
            statement.to_string()
        };
        Self {
            kind,
            message: message.into(),
            statement,
        }
    }
}
