//! SQL assistant facade
//!
//! Parses the schema, then either analyzes a user query or generates one from
//! an intent. Both paths end in the same tokenize, evaluate, score pipeline,
//! so a generated query is judged exactly like a hand-written one.

use sqlsage_core::{AnalyzerConfig, Finding, Result};
use sqlsage_query::QueryTokenizer;
use sqlsage_schema::SchemaModel;
use tracing::debug;

use crate::rules::SCHEMA_PARSE_RULE_ID;
use crate::{
    AnalysisReport, Complexity, Mode, QueryGenerator, RuleEngine, Scorer, parse_warning_findings,
};

/// Optimizes or generates queries against a schema
#[derive(Debug)]
pub struct SqlAssistant {
    engine: RuleEngine,
    scorer: Scorer,
    generator: QueryGenerator,
}

impl Default for SqlAssistant {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

impl SqlAssistant {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            scorer: Scorer::new(config.weights),
            generator: QueryGenerator::new(config.vocabulary.clone()),
            engine: RuleEngine::new(config),
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        self.engine.config()
    }

    pub fn engine(&self) -> &RuleEngine {
        &self.engine
    }

    /// Dispatches on `mode`: `input` is a query to optimize or an intent
    pub fn run(&self, mode: Mode, schema_text: &str, input: &str) -> Result<AnalysisReport> {
        match mode {
            Mode::Optimize => self.optimize(schema_text, input),
            Mode::Generate => self.generate(schema_text, input),
        }
    }

    /// Scores a user-supplied query and suggests improvements
    pub fn optimize(&self, schema_text: &str, query_text: &str) -> Result<AnalysisReport> {
        let (schema, notes) = self.parse_schema(schema_text);
        self.analyze(Mode::Optimize, &schema, query_text, notes, None)
    }

    /// Builds a query from a plain-English intent, then analyzes it like
    /// any other query
    pub fn generate(&self, schema_text: &str, intent: &str) -> Result<AnalysisReport> {
        let (schema, mut notes) = self.parse_schema(schema_text);
        let generated = self.generator.generate(intent, &schema)?;
        debug!(sql = %generated.sql, table = %generated.table, "intent resolved");
        notes.extend(
            generated
                .notes
                .into_iter()
                .filter(|n| self.config().is_rule_enabled(&n.rule_id)),
        );
        self.analyze(Mode::Generate, &schema, &generated.sql, notes, Some(generated.sql.clone()))
    }

    fn parse_schema(&self, schema_text: &str) -> (SchemaModel, Vec<Finding>) {
        let (schema, warnings) = SchemaModel::parse(schema_text);
        debug!(tables = schema.len(), warnings = warnings.len(), "schema parsed");
        let notes = if self.config().is_rule_enabled(SCHEMA_PARSE_RULE_ID) {
            parse_warning_findings(&warnings)
        } else {
            Vec::new()
        };
        (schema, notes)
    }

    fn analyze(
        &self,
        mode: Mode,
        schema: &SchemaModel,
        query_text: &str,
        mut findings: Vec<Finding>,
        generated_query: Option<String>,
    ) -> Result<AnalysisReport> {
        let query = QueryTokenizer::parse(query_text)?;
        findings.extend(self.engine.evaluate(schema, &query));
        let report = AnalysisReport::build(
            mode,
            findings,
            &self.scorer,
            generated_query,
            Complexity::of(&query),
        );
        debug!(
            mode = %mode,
            score = report.score,
            findings = report.findings.len(),
            "analysis complete"
        );
        Ok(report)
    }
}
