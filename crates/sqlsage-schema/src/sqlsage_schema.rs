//! sqlsage Schema - catalog of tables, columns and indexes parsed from DDL
//!
//! This crate provides:
//! - `SchemaModel::parse` - forgiving `CREATE TABLE` / `CREATE INDEX` / `ALTER TABLE` parsing
//! - Catalog lookups used by the analysis rules (indexes, foreign keys)
//! - `index_ddl` - rendering of `CREATE INDEX` suggestions

mod ddl;
mod model;
mod parser;
mod warning;

pub use ddl::{index_ddl, index_name};
pub use model::{Column, ForeignKeyLink, ForeignKeyRef, IndexDef, SchemaModel, Table};
pub use warning::{ParseWarning, ParseWarningKind};
