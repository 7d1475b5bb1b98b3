//! sqlsage Analyzer - heuristic query analysis and generation
//!
//! This crate provides functionality for:
//! - Evaluating a fixed set of heuristic rules against a tokenized query
//! - Scoring findings into a 0-100 performance score
//! - Generating SELECT statements from plain-English intents
//! - Assembling both paths into an [`AnalysisReport`] through [`SqlAssistant`]

mod assistant;
pub mod generator;
pub mod report;
pub mod rules;
mod scorer;

pub use assistant::*;
pub use generator::{GeneratedQuery, QueryGenerator};
pub use report::{AnalysisReport, Complexity, Mode};
pub use rules::{Rule, RuleContext, RuleEngine, default_rules, parse_warning_findings};
pub use scorer::Scorer;
