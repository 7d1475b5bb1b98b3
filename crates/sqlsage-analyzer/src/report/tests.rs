//! Tests for report assembly and rendering

use super::*;
use pretty_assertions::assert_eq;
use sqlsage_query::QueryTokenizer;

fn finding(rule_id: &str, severity: Severity) -> Finding {
    Finding::new(rule_id, severity, format!("{rule_id} message"))
}

fn complexity(sql: &str) -> Complexity {
    Complexity::of(&QueryTokenizer::parse(sql).unwrap())
}

mod build_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_findings_are_ordered_by_severity_then_rule() {
        let findings = vec![
            finding("b-info", Severity::Info),
            finding("z-warning", Severity::Warning),
            finding("cartesian-join", Severity::Critical),
            finding("a-warning", Severity::Warning),
            finding("a-info", Severity::Info),
        ];
        let report = AnalysisReport::build(
            Mode::Optimize,
            findings,
            &Scorer::default(),
            None,
            Complexity::default(),
        );
        let order: Vec<&str> = report.findings.iter().map(|f| f.rule_id.as_str()).collect();
        assert_eq!(
            order,
            vec!["cartesian-join", "a-warning", "z-warning", "a-info", "b-info"]
        );
        assert_eq!(report.score, 100 - 25 - 20 - 4);
        assert!(report.has_critical_issues());
        assert_eq!(report.count(Severity::Warning), 2);
    }

    #[test]
    fn test_same_rule_keeps_emission_order() {
        let findings = vec![
            Finding::new("missing-index", Severity::Warning, "first"),
            Finding::new("missing-index", Severity::Warning, "second"),
        ];
        let report =
            AnalysisReport::build(Mode::Optimize, findings, &Scorer::default(), None, Complexity::default());
        let messages: Vec<&str> = report.findings_for("missing-index").map(|f| f.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }

    #[test]
    fn test_optimized_query_is_first_rewrite() {
        let findings = vec![
            finding("union-without-all", Severity::Info).with_rewrite("SELECT 2"),
            finding("select-star", Severity::Warning).with_rewrite("SELECT 1"),
        ];
        let report =
            AnalysisReport::build(Mode::Optimize, findings, &Scorer::default(), None, Complexity::default());
        assert_eq!(report.optimized_query.as_deref(), Some("SELECT 1"));
    }

    #[test]
    fn test_summary_wording() {
        let build = |findings: Vec<Finding>| {
            AnalysisReport::build(Mode::Optimize, findings, &Scorer::default(), None, Complexity::default())
                .summary
        };
        assert_eq!(build(vec![]), "Query looks optimal - no issues detected.");
        assert_eq!(
            build(vec![finding("a", Severity::Warning), finding("b", Severity::Info)]),
            "Query has 1 warning(s) and 1 suggestion(s). Performance score: 88/100"
        );
        assert_eq!(
            build(vec![finding("a", Severity::Info)]),
            "Query has 1 minor suggestion(s). Performance score: 98/100"
        );
        assert!(build(vec![finding("a", Severity::Critical)]).starts_with("Query has 1 critical issue(s)"));
    }

    #[test]
    fn test_serialization() {
        let report = AnalysisReport::build(
            Mode::Generate,
            vec![finding("select-star", Severity::Warning)],
            &Scorer::default(),
            Some("SELECT * FROM users".to_string()),
            Complexity::default(),
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["mode"], "generate");
        assert_eq!(json["score"], 90);
        assert_eq!(json["findings"][0]["severity"], "warning");
        assert_eq!(json["generated_query"], "SELECT * FROM users");
        assert!(json.get("optimized_query").is_none());

        let parsed: AnalysisReport = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, report);
    }
}

mod complexity_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_simple_query() {
        assert_eq!(
            complexity("SELECT * FROM users"),
            Complexity {
                table_count: 1,
                ..Complexity::default()
            }
        );
    }

    #[test]
    fn test_joined_query_with_subquery() {
        let c = complexity(
            "SELECT u.name, count(*) FROM users u JOIN orders o ON o.user_id = u.id \
             WHERE (u.active = 1 OR u.vip = 1) AND o.id IN (SELECT order_id FROM refunds) \
             GROUP BY u.name HAVING count(*) > 1 ORDER BY 2 DESC",
        );
        assert_eq!(c.table_count, 2);
        assert_eq!(c.join_count, 1);
        assert_eq!(c.subquery_count, 1);
        assert_eq!(c.where_conditions, 2);
        assert!(c.has_order_by && c.has_group_by && c.has_having);
    }

    #[test]
    fn test_top_level_or_counts_alternatives() {
        assert_eq!(complexity("SELECT 1 FROM t WHERE a = 1 OR b = 2 OR c = 3").where_conditions, 3);
    }

    #[test]
    fn test_compound_branches_are_summed() {
        let c = complexity("WITH x AS (SELECT 1 AS n) SELECT n FROM x UNION SELECT id FROM y WHERE id > 1");
        assert_eq!(c.set_operations, 1);
        assert_eq!(c.table_count, 2);
        assert_eq!(c.subquery_count, 1);
        assert_eq!(c.where_conditions, 1);
    }
}

mod markdown_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sections() {
        let report = AnalysisReport::build(
            Mode::Optimize,
            vec![
                finding("missing-index", Severity::Warning)
                    .with_fix("Create an index on users (name)")
                    .with_index("CREATE INDEX idx_users_name ON users (name);"),
            ],
            &Scorer::default(),
            None,
            complexity("SELECT id FROM users WHERE name = 'x'"),
        );
        let markdown = report.to_markdown();
        assert!(markdown.starts_with("# SQL Query Analysis Report\n\n**Mode:** optimize"));
        assert!(markdown.contains("**Performance Score:** 90/100"));
        assert!(markdown.contains("### Warnings\n\n**`missing-index`** missing-index message"));
        assert!(markdown.contains("**Recommendation:** Create an index on users (name)"));
        assert!(markdown.contains("```sql\nCREATE INDEX idx_users_name ON users (name);\n```"));
        assert!(!markdown.contains("### Critical"));
        assert!(markdown.ends_with("- **Has HAVING:** No\n"));
        assert!(markdown.contains("- **WHERE Conditions:** 1\n"));
    }

    #[test]
    fn test_clean_generated_report() {
        let report = AnalysisReport::build(
            Mode::Generate,
            vec![],
            &Scorer::default(),
            Some("SELECT id FROM users LIMIT 5".to_string()),
            complexity("SELECT id FROM users LIMIT 5"),
        );
        let markdown = report.to_markdown();
        assert!(markdown.contains("## Generated Query\n\n```sql\nSELECT id FROM users LIMIT 5\n```"));
        assert!(markdown.contains("## No Issues Found"));
    }
}
