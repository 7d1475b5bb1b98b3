//! Markdown rendering of a report

use std::fmt::Write;

use sqlsage_core::Severity;

use super::AnalysisReport;

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

fn heading(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "Critical",
        Severity::Warning => "Warnings",
        Severity::Info => "Suggestions",
    }
}

fn sql_block(out: &mut String, label: &str, sql: &str) {
    let _ = write!(out, "**{label}:**\n```sql\n{sql}\n```\n\n");
}

impl AnalysisReport {
    /// Renders the report as a Markdown document
    pub fn to_markdown(&self) -> String {
        let mut out = String::from("# SQL Query Analysis Report\n\n");
        let _ = write!(
            out,
            "**Mode:** {}\n\n**Performance Score:** {}/100\n\n{}\n\n",
            self.mode, self.score, self.summary
        );

        if let Some(sql) = &self.generated_query {
            out.push_str("## Generated Query\n\n");
            let _ = write!(out, "```sql\n{sql}\n```\n\n");
        }

        if self.findings.is_empty() {
            out.push_str("## No Issues Found\n\nThe query looks well-optimized.\n\n");
        } else {
            out.push_str("## Findings\n\n");
            for severity in [Severity::Critical, Severity::Warning, Severity::Info] {
                let mut group = self.findings.iter().filter(|f| f.severity == severity).peekable();
                if group.peek().is_none() {
                    continue;
                }
                let _ = write!(out, "### {}\n\n", heading(severity));
                for finding in group {
                    let _ = write!(out, "**`{}`** {}\n\n", finding.rule_id, finding.message);
                    if let Some(fix) = &finding.suggested_fix {
                        let _ = write!(out, "**Recommendation:** {fix}\n\n");
                    }
                    if let Some(sql) = &finding.rewritten_query {
                        sql_block(&mut out, "Rewritten Query", sql);
                    }
                    if let Some(ddl) = &finding.suggested_index {
                        sql_block(&mut out, "Index Recommendation", ddl);
                    }
                    out.push_str("---\n\n");
                }
            }
        }

        let c = &self.complexity;
        out.push_str("## Complexity\n\n");
        let _ = writeln!(out, "- **Tables:** {}", c.table_count);
        let _ = writeln!(out, "- **Joins:** {}", c.join_count);
        let _ = writeln!(out, "- **Subqueries:** {}", c.subquery_count);
        let _ = writeln!(out, "- **WHERE Conditions:** {}", c.where_conditions);
        let _ = writeln!(out, "- **Set Operations:** {}", c.set_operations);
        let _ = writeln!(out, "- **Has ORDER BY:** {}", yes_no(c.has_order_by));
        let _ = writeln!(out, "- **Has GROUP BY:** {}", yes_no(c.has_group_by));
        let _ = writeln!(out, "- **Has HAVING:** {}", yes_no(c.has_having));
        out
    }
}
