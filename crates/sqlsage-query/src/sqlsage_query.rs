//! sqlsage Query - clause-level tokenization of SELECT statements
//!
//! `QueryTokenizer::parse` turns raw SQL into a `TokenizedQuery` whose
//! clauses are normalized strings. `TokenizedQuery::to_sql` writes it back
//! out; tokenizing that output again yields an equal value.

mod query;
mod tokenizer;

pub use query::{
    CommonTableExpr, CompoundBranch, JoinKind, JoinSpec, SetOperator, TableRef, TokenizedQuery,
};
pub use tokenizer::QueryTokenizer;
