//! Tests for the heuristic rules

use super::*;
use indoc::indoc;
use pretty_assertions::assert_eq;
use sqlsage_query::QueryTokenizer;

const SHOP: &str = indoc! {"
    CREATE TABLE users (
        id INT PRIMARY KEY,
        name TEXT,
        email VARCHAR(255) UNIQUE,
        spend DECIMAL(10, 2),
        created_at TIMESTAMP
    );
    CREATE TABLE orders (
        id INT PRIMARY KEY,
        user_id INT REFERENCES users (id),
        total DECIMAL(10, 2),
        status TEXT
    );
    CREATE INDEX idx_users_lower_email ON users (lower(email));
"};

fn shop() -> SchemaModel {
    let (schema, warnings) = SchemaModel::parse(SHOP);
    assert!(warnings.is_empty(), "{warnings:?}");
    schema
}

fn check_with(rule: &dyn Rule, schema: &SchemaModel, config: &AnalyzerConfig, sql: &str) -> Vec<Finding> {
    let query = QueryTokenizer::parse(sql).unwrap();
    rule.check(&RuleContext::new(schema, &query, config))
}

fn check(rule: &dyn Rule, schema: &SchemaModel, sql: &str) -> Vec<Finding> {
    check_with(rule, schema, &AnalyzerConfig::default(), sql)
}

fn rule_ids(findings: &[Finding]) -> Vec<&str> {
    findings.iter().map(|f| f.rule_id.as_str()).collect()
}

mod select_star_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rewrite_lists_declared_columns() {
        let findings = check(&SelectStarRule, &shop(), "SELECT * FROM users");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(
            findings[0].rewritten_query.as_deref(),
            Some("SELECT id, name, email, spend, created_at FROM users")
        );
        assert_eq!(findings[0].table.as_deref(), Some("users"));
    }

    #[test]
    fn test_qualified_star_expands_one_table() {
        let findings = check(
            &SelectStarRule,
            &shop(),
            "SELECT u.*, o.total FROM users u JOIN orders o ON o.user_id = u.id",
        );
        assert_eq!(
            findings[0].rewritten_query.as_deref(),
            Some(
                "SELECT u.id, u.name, u.email, u.spend, u.created_at, o.total \
                 FROM users u JOIN orders o ON o.user_id = u.id"
            )
        );
    }

    #[test]
    fn test_unknown_table_gets_fix_without_rewrite() {
        let findings = check(&SelectStarRule, &shop(), "SELECT * FROM ghosts");
        assert_eq!(findings.len(), 1);
        assert!(findings[0].rewritten_query.is_none());
        assert!(findings[0].suggested_fix.is_some());
    }

    #[test]
    fn test_explicit_columns_pass() {
        assert!(check(&SelectStarRule, &shop(), "SELECT id, count(*) FROM users").is_empty());
    }
}

mod missing_where_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unknown_size_counts_as_large() {
        let findings = check(&MissingWhereRule, &SchemaModel::new(), "SELECT id FROM nowhere");
        assert_eq!(rule_ids(&findings), vec!["missing-where"]);
        assert_eq!(findings[0].table.as_deref(), Some("nowhere"));
    }

    #[test]
    fn test_where_or_limit_suppresses() {
        let schema = shop();
        assert!(check(&MissingWhereRule, &schema, "SELECT id FROM users WHERE id = 1").is_empty());
        assert!(check(&MissingWhereRule, &schema, "SELECT id FROM users LIMIT 10").is_empty());
    }

    #[test]
    fn test_small_tables_are_exempt() {
        let config = AnalyzerConfig::default().with_row_estimate("Users", 50);
        assert!(check_with(&MissingWhereRule, &shop(), &config, "SELECT id FROM users").is_empty());

        let config = AnalyzerConfig::default().with_row_estimate("users", 50_000);
        assert_eq!(check_with(&MissingWhereRule, &shop(), &config, "SELECT id FROM users").len(), 1);
    }

    #[test]
    fn test_derived_tables_and_ctes_are_skipped() {
        let schema = shop();
        assert!(check(&MissingWhereRule, &schema, "SELECT n FROM (SELECT 1 AS n) t").is_empty());
        assert!(
            check(
                &MissingWhereRule,
                &schema,
                "WITH big AS (SELECT id FROM users WHERE id > 5) SELECT id FROM big"
            )
            .is_empty()
        );
    }

    #[test]
    fn test_each_compound_branch_is_checked() {
        let findings = check(
            &MissingWhereRule,
            &shop(),
            "SELECT id FROM users UNION ALL SELECT id FROM orders WHERE total > 5",
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].table.as_deref(), Some("users"));
    }
}

mod join_condition_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_on_suggests_foreign_key() {
        let findings = check(&JoinConditionRule, &shop(), "SELECT u.id FROM users u JOIN orders o");
        assert_eq!(findings.len(), 1);
        assert_eq!(
            findings[0].suggested_fix.as_deref(),
            Some("Join on the foreign key: ON o.user_id = u.id")
        );
        assert_eq!(
            findings[0].rewritten_query.as_deref(),
            Some("SELECT u.id FROM users u JOIN orders o ON o.user_id = u.id")
        );
    }

    #[test]
    fn test_condition_ignoring_foreign_key() {
        let findings = check(
            &JoinConditionRule,
            &shop(),
            "SELECT u.id FROM users u JOIN orders o ON o.id = u.id",
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].columns, vec!["user_id"]);
        assert!(findings[0].rewritten_query.is_none());
    }

    #[test]
    fn test_foreign_key_condition_passes() {
        let schema = shop();
        for sql in [
            "SELECT u.id FROM users u JOIN orders o ON o.user_id = u.id",
            "SELECT u.id FROM users u LEFT JOIN orders o ON u.id = o.user_id AND o.total > 10",
            "SELECT id FROM users JOIN orders USING (id)",
            "SELECT 1 FROM users CROSS JOIN orders",
        ] {
            assert!(check(&JoinConditionRule, &schema, sql).is_empty(), "{sql}");
        }
    }

    #[test]
    fn test_missing_on_without_schema() {
        let findings = check(&JoinConditionRule, &SchemaModel::new(), "SELECT 1 FROM a JOIN b");
        assert_eq!(findings.len(), 1);
        assert!(findings[0].rewritten_query.is_none());
    }
}

mod missing_index_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unindexed_filter_column() {
        let findings = check(&MissingIndexRule, &shop(), "SELECT id FROM users WHERE name = 'x'");
        assert_eq!(findings.len(), 1);
        assert_eq!(
            findings[0].suggested_index.as_deref(),
            Some("CREATE INDEX idx_users_name ON users (name);")
        );
        assert_eq!(findings[0].columns, vec!["name"]);
    }

    #[test]
    fn test_indexed_columns_pass() {
        let schema = shop();
        assert!(check(&MissingIndexRule, &schema, "SELECT id FROM users WHERE id = 1").is_empty());
        assert!(check(&MissingIndexRule, &schema, "SELECT id FROM users WHERE email = 'a@b.c'").is_empty());
    }

    #[test]
    fn test_join_columns_are_checked() {
        let findings = check(
            &MissingIndexRule,
            &shop(),
            "SELECT u.id FROM users u JOIN orders o ON o.user_id = u.id",
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].table.as_deref(), Some("orders"));
        assert_eq!(findings[0].columns, vec!["user_id"]);
    }

    #[test]
    fn test_duplicates_are_collapsed() {
        let findings = check(
            &MissingIndexRule,
            &shop(),
            "SELECT id FROM users WHERE name = 'a' OR name = 'b'",
        );
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn test_no_schema_no_findings() {
        let findings = check(&MissingIndexRule, &SchemaModel::new(), "SELECT id FROM users WHERE name = 'x'");
        assert!(findings.is_empty());
    }

    #[test]
    fn test_index_suggestion_can_be_disabled() {
        let config = AnalyzerConfig::default().with_suggest_indexes(false);
        let findings = check_with(&MissingIndexRule, &shop(), &config, "SELECT id FROM users WHERE name = 'x'");
        assert_eq!(findings.len(), 1);
        assert!(findings[0].suggested_index.is_none());
    }
}

mod function_on_indexed_column_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_function_on_indexed_column() {
        let findings = check(
            &FunctionOnIndexedColumnRule,
            &shop(),
            "SELECT id FROM users WHERE upper(email) = 'X'",
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(findings[0].columns, vec!["email"]);
    }

    #[test]
    fn test_expression_index_or_unindexed_column_passes() {
        let schema = shop();
        let rule = FunctionOnIndexedColumnRule;
        assert!(check(&rule, &schema, "SELECT id FROM users WHERE lower(email) = 'x'").is_empty());
        assert!(check(&rule, &schema, "SELECT id FROM users WHERE lower(name) = 'x'").is_empty());
    }

    #[test]
    fn test_unknown_table_is_info() {
        let findings = check(
            &FunctionOnIndexedColumnRule,
            &shop(),
            "SELECT id FROM ghosts WHERE lower(code) = 'x'",
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Info);
    }

    #[test]
    fn test_empty_schema_is_silent() {
        let findings = check(
            &FunctionOnIndexedColumnRule,
            &SchemaModel::new(),
            "SELECT id FROM ghosts WHERE lower(code) = 'x'",
        );
        assert!(findings.is_empty());
    }
}

mod order_without_limit_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_multi_table_sort_without_limit() {
        let sql = "SELECT u.name FROM users u JOIN orders o ON o.user_id = u.id ORDER BY o.total DESC";
        let findings = check(&OrderWithoutLimitRule, &shop(), sql);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Info);
    }

    #[test]
    fn test_single_table_or_limited_sort_passes() {
        let schema = shop();
        assert!(check(&OrderWithoutLimitRule, &schema, "SELECT name FROM users ORDER BY name").is_empty());
        assert!(
            check(
                &OrderWithoutLimitRule,
                &schema,
                "SELECT u.name FROM users u JOIN orders o ON o.user_id = u.id ORDER BY 1 LIMIT 5"
            )
            .is_empty()
        );
    }
}

mod cartesian_join_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unlinked_from_entries() {
        let findings = check(&CartesianJoinRule, &shop(), "SELECT * FROM users, orders");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(findings[0].table.as_deref(), Some("orders"));
        assert_eq!(
            findings[0].rewritten_query.as_deref(),
            Some("SELECT * FROM users, orders WHERE orders.user_id = users.id")
        );
    }

    #[test]
    fn test_linked_tables_pass() {
        let schema = shop();
        for sql in [
            "SELECT * FROM users u, orders o WHERE o.user_id = u.id",
            "SELECT * FROM users u JOIN orders o ON o.user_id = u.id",
            "SELECT * FROM users JOIN orders USING (id)",
            "SELECT * FROM users",
        ] {
            assert!(check(&CartesianJoinRule, &schema, sql).is_empty(), "{sql}");
        }
    }

    #[test]
    fn test_cross_join_and_constant_condition() {
        let schema = shop();
        assert_eq!(check(&CartesianJoinRule, &schema, "SELECT 1 FROM users CROSS JOIN orders").len(), 1);
        assert_eq!(check(&CartesianJoinRule, &schema, "SELECT 1 FROM users JOIN orders ON 1 = 1").len(), 1);
    }

    #[test]
    fn test_one_finding_per_query() {
        let findings = check(
            &CartesianJoinRule,
            &SchemaModel::new(),
            "SELECT 1 FROM a, b, c UNION SELECT 1 FROM d, e",
        );
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.starts_with("b, c is not linked to a"));
    }

    #[test]
    fn test_unattributed_column_comparison_links_tables() {
        let findings = check(&CartesianJoinRule, &SchemaModel::new(), "SELECT * FROM a, b WHERE x = y");
        assert!(findings.is_empty());
    }

    #[test]
    fn test_open_join_gets_condition_in_rewrite() {
        let findings = check(&CartesianJoinRule, &shop(), "SELECT u.id FROM users u JOIN orders o");
        assert_eq!(
            findings[0].rewritten_query.as_deref(),
            Some("SELECT u.id FROM users u JOIN orders o ON o.user_id = u.id")
        );
    }
}

mod in_subquery_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rewrite_to_exists() {
        let findings = check(
            &InSubqueryRule,
            &shop(),
            "SELECT name FROM users WHERE id IN (SELECT user_id FROM orders WHERE total > 100)",
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(
            findings[0].rewritten_query.as_deref(),
            Some(
                "SELECT name FROM users WHERE EXISTS \
                 (SELECT 1 FROM orders WHERE total > 100 AND orders.user_id = users.id)"
            )
        );
    }

    #[test]
    fn test_not_in_mentions_null_semantics() {
        let findings = check(
            &InSubqueryRule,
            &shop(),
            "SELECT u.name FROM users u WHERE u.id NOT IN (SELECT o.user_id FROM orders o)",
        );
        assert_eq!(
            findings[0].rewritten_query.as_deref(),
            Some("SELECT u.name FROM users u WHERE NOT EXISTS (SELECT 1 FROM orders o WHERE o.user_id = u.id)")
        );
        assert!(findings[0].suggested_fix.as_deref().unwrap().contains("NULL"));
    }

    #[test]
    fn test_complex_subquery_gets_fix_only() {
        let findings = check(
            &InSubqueryRule,
            &shop(),
            "SELECT name FROM users WHERE id IN (SELECT user_id FROM orders GROUP BY user_id HAVING count(*) > 2)",
        );
        assert_eq!(findings.len(), 1);
        assert!(findings[0].rewritten_query.is_none());
    }

    #[test]
    fn test_value_lists_pass() {
        assert!(check(&InSubqueryRule, &shop(), "SELECT name FROM users WHERE id IN (1, 2, 3)").is_empty());
    }
}

mod sargability_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_leading_wildcard() {
        let findings = check(&LeadingWildcardRule, &shop(), "SELECT id FROM users WHERE name LIKE '%son'");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].table.as_deref(), Some("users"));
        assert!(check(&LeadingWildcardRule, &shop(), "SELECT id FROM users WHERE name LIKE 'son%'").is_empty());
    }

    #[test]
    fn test_implicit_conversion_rewrite() {
        let findings = check(&ImplicitConversionRule, &shop(), "SELECT id FROM users WHERE spend > '100'");
        assert_eq!(findings.len(), 1);
        assert_eq!(
            findings[0].rewritten_query.as_deref(),
            Some("SELECT id FROM users WHERE spend > 100")
        );
    }

    #[test]
    fn test_text_column_with_quoted_number_passes() {
        assert!(check(&ImplicitConversionRule, &shop(), "SELECT id FROM users WHERE name = '100'").is_empty());
    }
}

mod union_and_join_count_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_union_without_all() {
        let findings = check(&UnionWithoutAllRule, &shop(), "SELECT id FROM users UNION SELECT user_id FROM orders");
        assert_eq!(findings.len(), 1);
        assert_eq!(
            findings[0].rewritten_query.as_deref(),
            Some("SELECT id FROM users UNION ALL SELECT user_id FROM orders")
        );
        assert!(check(&UnionWithoutAllRule, &shop(), "SELECT 1 UNION ALL SELECT 2").is_empty());
    }

    #[test]
    fn test_too_many_joins() {
        let sql = "SELECT 1 FROM a JOIN b ON b.id = a.id JOIN c ON c.id = b.id JOIN d ON d.id = c.id JOIN e ON e.id = d.id";
        let schema = SchemaModel::new();
        assert_eq!(check(&TooManyJoinsRule, &schema, sql).len(), 1);

        let config = AnalyzerConfig::default().with_max_joins(4);
        assert!(check_with(&TooManyJoinsRule, &schema, &config, sql).is_empty());
    }
}

mod unknown_table_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_undeclared_table() {
        let findings = check(&UnknownTableRule, &shop(), "SELECT g.id FROM ghosts g JOIN Ghosts h ON h.id = g.id");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].table.as_deref(), Some("ghosts"));
    }

    #[test]
    fn test_cte_names_and_empty_schema() {
        assert!(check(&UnknownTableRule, &shop(), "WITH g AS (SELECT 1 AS n) SELECT n FROM g").is_empty());
        assert!(check(&UnknownTableRule, &SchemaModel::new(), "SELECT id FROM ghosts").is_empty());
    }
}

mod engine_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_rule_ids_are_unique() {
        let engine = RuleEngine::default();
        let mut ids: Vec<&str> = engine.rules().map(|r| r.id()).collect();
        assert_eq!(ids.len(), 13);
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 13);
    }

    #[test]
    fn test_evaluate_concatenates_in_rule_order() {
        let query = QueryTokenizer::parse("SELECT * FROM users").unwrap();
        let findings = RuleEngine::default().evaluate(&shop(), &query);
        assert_eq!(rule_ids(&findings), vec!["select-star", "missing-where"]);
    }

    #[test]
    fn test_disabled_rules_are_skipped() {
        let config = AnalyzerConfig::default().with_disabled_rule("select-star");
        let query = QueryTokenizer::parse("SELECT * FROM users").unwrap();
        let findings = RuleEngine::new(config).evaluate(&shop(), &query);
        assert_eq!(rule_ids(&findings), vec!["missing-where"]);
    }

    #[test]
    fn test_custom_rule_set() {
        let engine = RuleEngine::with_rules(AnalyzerConfig::default(), vec![Box::new(UnionWithoutAllRule)]);
        let query = QueryTokenizer::parse("SELECT * FROM users").unwrap();
        assert!(engine.evaluate(&shop(), &query).is_empty());
    }

    #[test]
    fn test_parse_warnings_become_info_findings() {
        let (_, warnings) = SchemaModel::parse("CREATE VIEW v AS SELECT 1; CREATE TABLE t (id INT);");
        let findings = parse_warning_findings(&warnings);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, SCHEMA_PARSE_RULE_ID);
        assert_eq!(findings[0].severity, Severity::Info);
    }
}
