//! Schema catalog types

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sqlsage_core::{TokenCursor, tokenize};

/// Reference from a column to a column of another table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    /// Referenced table name, as declared
    pub table: String,
    /// Referenced column name
    pub column: String,
    /// Whether the referenced table and column exist in the schema
    pub resolved: bool,
}

/// Column definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// Declared type, normalized (`DECIMAL(10, 2)`); empty for typeless columns
    pub data_type: String,
    pub nullable: bool,
    pub is_primary_key: bool,
    pub is_unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ForeignKeyRef>,
}

impl Column {
    /// Create a nullable column with no constraints
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            is_primary_key: false,
            is_unique: false,
            default: None,
            foreign_key: None,
        }
    }

    /// Returns true if the declared type is numeric
    pub fn is_numeric(&self) -> bool {
        const NUMERIC: &[&str] = &[
            "INT", "INTEGER", "SMALLINT", "BIGINT", "TINYINT", "MEDIUMINT", "DECIMAL", "NUMERIC",
            "FLOAT", "DOUBLE", "REAL", "SERIAL", "BIGSERIAL", "SMALLSERIAL", "MONEY", "NUMBER",
            "INT2", "INT4", "INT8", "FLOAT4", "FLOAT8",
        ];
        let base = self
            .data_type
            .split(|c: char| c == '(' || c.is_whitespace())
            .next()
            .unwrap_or_default();
        NUMERIC.iter().any(|t| t.eq_ignore_ascii_case(base))
    }
}

/// Declared or implied index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Indexed columns in key order. Expression entries are kept as rendered text.
    pub columns: Vec<String>,
    pub unique: bool,
    pub primary: bool,
}

impl IndexDef {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            name: None,
            columns,
            unique: false,
            primary: false,
        }
    }

    /// Returns true if `column` is the first key of this index
    pub fn leads_with(&self, column: &str) -> bool {
        self.columns
            .first()
            .is_some_and(|c| c.eq_ignore_ascii_case(column))
    }
}

/// Resolved foreign-key link between two tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyLink {
    /// Table holding the foreign key
    pub from_table: String,
    pub from_column: String,
    /// Referenced table
    pub to_table: String,
    pub to_column: String,
}

/// Table definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub indexes: Vec<IndexDef>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Look up a column by name (case-insensitive)
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub(crate) fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Returns the first index whose leading key is `column`.
    ///
    /// Only the leading key counts: a composite index on `(a, b)` serves
    /// lookups on `a` but not on `b` alone.
    pub fn leading_index_for(&self, column: &str) -> Option<&IndexDef> {
        self.indexes.iter().find(|idx| idx.leads_with(column))
    }

    /// Returns true if any index key (leading or not) mentions `column`
    pub fn is_indexed(&self, column: &str) -> bool {
        self.indexes
            .iter()
            .any(|idx| idx.columns.iter().any(|c| c.eq_ignore_ascii_case(column)))
    }

    /// Returns an index whose single key is exactly the given expression text
    pub fn expression_index(&self, expression: &str) -> Option<&IndexDef> {
        self.indexes
            .iter()
            .find(|idx| idx.columns.len() == 1 && idx.columns[0].eq_ignore_ascii_case(expression))
    }

    /// Primary key column names in key order
    pub fn primary_key(&self) -> Vec<&str> {
        if let Some(pk) = self.indexes.iter().find(|idx| idx.primary) {
            return pk.columns.iter().map(String::as_str).collect();
        }
        self.columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Resolved foreign keys from this table to `other`, in column order
    pub fn foreign_keys_to(&self, other: &Table) -> Vec<ForeignKeyLink> {
        self.columns
            .iter()
            .filter_map(|column| {
                let fk = column.foreign_key.as_ref()?;
                (fk.resolved && fk.table.eq_ignore_ascii_case(&other.name)).then(|| {
                    ForeignKeyLink {
                        from_table: self.name.clone(),
                        from_column: column.name.clone(),
                        to_table: other.name.clone(),
                        to_column: fk.column.clone(),
                    }
                })
            })
            .collect()
    }

    /// Returns a resolved foreign key from this table to `other`
    pub fn foreign_key_to(&self, other: &Table) -> Option<ForeignKeyLink> {
        self.foreign_keys_to(other).into_iter().next()
    }

    /// Returns a resolved foreign key linking this table and `other`, in
    /// either direction.
    pub fn foreign_key_between(&self, other: &Table) -> Option<ForeignKeyLink> {
        self.foreign_key_to(other)
            .or_else(|| other.foreign_key_to(self))
    }

    /// Adds an index unless an identical one is already present
    pub(crate) fn add_index(&mut self, index: IndexDef) {
        let duplicate = self.indexes.iter().any(|existing| {
            existing.unique == index.unique
                && existing.primary == index.primary
                && existing.columns.len() == index.columns.len()
                && existing
                    .columns
                    .iter()
                    .zip(&index.columns)
                    .all(|(a, b)| a.eq_ignore_ascii_case(b))
        });
        if !duplicate {
            self.indexes.push(index);
        }
    }
}

/// Parsed schema: tables in declaration order, keyed case-insensitively
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaModel {
    tables: IndexMap<String, Table>,
}

/// Lookup key of a table identifier, as stored after unquoting
fn identifier_key(name: &str) -> String {
    name.to_lowercase()
}

impl SchemaModel {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a table by name. Case-insensitive; `schema.table` uses the last segment.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(&self.key_for(name)?)
    }

    pub(crate) fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        let key = self.key_for(name)?;
        self.tables.get_mut(&key)
    }

    /// Resolves `name` to a stored key: first as a whole identifier, then as
    /// SQL text whose last dotted part names the table. Quoted parts keep
    /// their dots, so `"app.users"` never falls back to `users`.
    fn key_for(&self, name: &str) -> Option<String> {
        let exact = identifier_key(name);
        if self.tables.contains_key(&exact) {
            return Some(exact);
        }
        let tokens = tokenize(name);
        let mut cur = TokenCursor::new(&tokens);
        let parts = cur.qualified_name()?;
        if !cur.is_done() {
            return None;
        }
        let key = identifier_key(parts.last()?);
        self.tables.contains_key(&key).then_some(key)
    }

    /// Tables in declaration order
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.key_for(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Inserts a table. Returns false, leaving the schema unchanged, if a
    /// table with the same name already exists.
    pub fn insert_table(&mut self, table: Table) -> bool {
        let key = identifier_key(&table.name);
        if self.tables.contains_key(&key) {
            return false;
        }
        self.tables.insert(key, table);
        true
    }

    /// Resolved foreign key linking the two named tables, in either direction
    pub fn foreign_key_between(&self, a: &str, b: &str) -> Option<ForeignKeyLink> {
        let (a, b) = (self.table(a)?, self.table(b)?);
        a.foreign_key_between(b)
    }

    /// Every resolved foreign key linking the two named tables. Links from
    /// `a` to `b` come first.
    pub fn foreign_keys_between(&self, a: &str, b: &str) -> Vec<ForeignKeyLink> {
        let (Some(a), Some(b)) = (self.table(a), self.table(b)) else {
            return Vec::new();
        };
        let mut links = a.foreign_keys_to(b);
        if !a.name.eq_ignore_ascii_case(&b.name) {
            links.extend(b.foreign_keys_to(a));
        }
        links
    }

    /// Tables declaring a column with this name, in declaration order
    pub fn tables_with_column(&self, column: &str) -> Vec<&Table> {
        self.tables().filter(|t| t.has_column(column)).collect()
    }
}
