//! sqlsage Core - shared building blocks for the query assistant
//!
//! This crate provides the pieces every other sqlsage crate depends on:
//!
//! - `SqlLexer` / `Token` - a forgiving SQL lexer used for both DDL and queries
//! - `TokenCursor` - a forward-only cursor the parsers walk statements with
//! - `Severity` / `Finding` - the unit of output produced by analysis rules
//! - `AnalyzerConfig` - scoring weights, heuristics thresholds and intent vocabulary
//! - Error types shared by the top-level entry points

mod config;
mod cursor;
mod error;
mod finding;
pub mod lexer;

pub use config::*;
pub use cursor::TokenCursor;
pub use error::*;
pub use finding::*;
pub use lexer::{
    SqlLexer, Token, is_keyword, quote_ident, render_tokens, split_top_level, tokenize,
};
