//! Report rendering for the terminal

use std::fmt::Write;

use anyhow::Context;
use clap::ValueEnum;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use sqlsage_analyzer::{AnalysisReport, RuleEngine};

/// How reports are written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary with a findings table
    #[default]
    Text,
    /// The report as pretty-printed JSON
    Json,
    /// A Markdown document
    Markdown,
}

pub fn render(report: &AnalysisReport, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Text => render_text(report),
        OutputFormat::Json => {
            serde_json::to_string_pretty(report).context("failed to serialize report")?
        }
        OutputFormat::Markdown => report.to_markdown(),
    })
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn render_text(report: &AnalysisReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Mode:  {}", report.mode);
    let _ = writeln!(out, "Score: {}/100", report.score);
    let _ = writeln!(out, "{}", report.summary);

    if let Some(sql) = &report.generated_query {
        let _ = writeln!(out, "\nGenerated query:\n  {sql}");
    }

    if !report.findings.is_empty() {
        let mut table = new_table(vec!["Severity", "Rule", "Message", "Suggestion"]);
        for finding in &report.findings {
            table.add_row(vec![
                finding.severity.as_str().to_uppercase(),
                finding.rule_id.clone(),
                finding.message.clone(),
                finding.suggested_fix.clone().unwrap_or_default(),
            ]);
        }
        let _ = writeln!(out, "\n{table}");
    }

    let indexes: Vec<&str> = report
        .findings
        .iter()
        .filter_map(|f| f.suggested_index.as_deref())
        .collect();
    if !indexes.is_empty() {
        let _ = writeln!(out, "\nSuggested indexes:");
        for index in indexes {
            let _ = writeln!(out, "  {index}");
        }
    }

    if let Some(sql) = &report.optimized_query {
        let _ = writeln!(out, "\nOptimized query:\n  {sql}");
    }
    out
}

/// Table of the engine's rules and whether the configuration enables them
pub fn render_rules(engine: &RuleEngine) -> String {
    let mut table = new_table(vec!["Rule", "Severity", "Enabled", "Description"]);
    for rule in engine.rules() {
        let enabled = if engine.config().is_rule_enabled(rule.id()) {
            "yes"
        } else {
            "no"
        };
        table.add_row(vec![
            rule.id(),
            rule.severity().as_str(),
            enabled,
            rule.description(),
        ]);
    }
    format!("{table}\n")
}
