//! Tests for query clause segmentation

use super::*;
use pretty_assertions::assert_eq;

fn parse(sql: &str) -> TokenizedQuery {
    QueryTokenizer::parse(sql).unwrap()
}

fn table_names(query: &TokenizedQuery) -> Vec<&str> {
    query.table_refs().map(|t| t.name.as_str()).collect()
}

#[test]
fn test_select_star() {
    let query = parse("SELECT * FROM users");
    assert_eq!(query.select, vec!["*"]);
    assert_eq!(table_names(&query), vec!["users"]);
    assert!(query.selects_star());
    assert!(!query.has_where());
    assert!(!query.has_limit());
}

#[test]
fn test_full_clause_set() {
    let query = parse(
        "select u.name, count(o.id) as orders from users u left join orders o on o.user_id = u.id \
         where u.active = true and o.total between 10 and 20 group by u.name \
         having count(o.id) > 1 order by orders desc limit 10 offset 5;",
    );

    assert_eq!(query.select, vec!["u.name", "count(o.id) AS orders"]);
    assert_eq!(query.from, vec![TableRef::new("users").with_alias("u")]);
    assert_eq!(
        query.joins,
        vec![JoinSpec {
            kind: JoinKind::Left,
            table: TableRef::new("orders").with_alias("o"),
            condition: Some("o.user_id = u.id".to_string()),
            using: vec![],
        }]
    );
    assert_eq!(
        query.predicates,
        vec!["u.active = TRUE", "o.total BETWEEN 10 AND 20"]
    );
    assert_eq!(query.group_by, vec!["u.name"]);
    assert_eq!(query.having.as_deref(), Some("count(o.id) > 1"));
    assert_eq!(query.order_by, vec!["orders DESC"]);
    assert_eq!(query.limit, Some(10));
    assert_eq!(query.offset, Some(5));
    assert_eq!(query.aliases.get("u").map(String::as_str), Some("users"));
    assert_eq!(query.aliases.get("o").map(String::as_str), Some("orders"));

    assert_eq!(
        query.to_sql(),
        "SELECT u.name, count(o.id) AS orders FROM users u LEFT JOIN orders o ON o.user_id = u.id \
         WHERE u.active = TRUE AND o.total BETWEEN 10 AND 20 GROUP BY u.name \
         HAVING count(o.id) > 1 ORDER BY orders DESC LIMIT 10 OFFSET 5"
    );
}

#[test]
fn test_resolve_qualifier() {
    let query = parse("SELECT * FROM users u JOIN orders ON orders.user_id = u.id");
    assert_eq!(query.resolve_qualifier("U").map(|t| t.name.as_str()), Some("users"));
    assert_eq!(
        query.resolve_qualifier("orders").map(|t| t.name.as_str()),
        Some("orders")
    );
    assert!(query.resolve_qualifier("users").is_none());
}

#[test]
fn test_top_level_or_keeps_single_predicate() {
    let query = parse("SELECT id FROM t WHERE a = 1 OR b = 2 AND c = 3");
    assert_eq!(query.predicates, vec!["a = 1 OR b = 2 AND c = 3"]);
}

#[test]
fn test_subqueries_are_not_split() {
    let query = parse(
        "SELECT id FROM users WHERE id IN (SELECT user_id FROM orders WHERE total > 100) AND active = 1",
    );
    assert_eq!(table_names(&query), vec!["users"]);
    assert_eq!(
        query.predicates,
        vec![
            "id IN (SELECT user_id FROM orders WHERE total > 100)",
            "active = 1"
        ]
    );
}

#[test]
fn test_comma_separated_from() {
    let query = parse("SELECT * FROM users, orders o");
    assert_eq!(table_names(&query), vec!["users", "orders"]);
    assert!(query.joins.is_empty());
    assert_eq!(query.table_count(), 2);
}

#[test]
fn test_join_variants() {
    let query = parse(
        "SELECT * FROM a JOIN b USING (id) CROSS JOIN c NATURAL JOIN d INNER JOIN e ON e.x = a.x",
    );
    let kinds: Vec<JoinKind> = query.joins.iter().map(|j| j.kind).collect();
    assert_eq!(
        kinds,
        vec![
            JoinKind::Inner,
            JoinKind::Cross,
            JoinKind::Natural,
            JoinKind::Inner
        ]
    );
    assert_eq!(query.joins[0].using, vec!["id"]);
    assert!(query.joins[0].has_condition());
    assert!(!query.joins[1].has_condition());
    assert_eq!(query.joins[3].condition.as_deref(), Some("e.x = a.x"));
}

#[test]
fn test_join_condition_with_left_function() {
    let query = parse("SELECT * FROM a JOIN b ON LEFT(a.code, 2) = b.prefix WHERE a.x = 1");
    assert_eq!(
        query.joins[0].condition.as_deref(),
        Some("LEFT (a.code, 2) = b.prefix")
    );
}

#[test]
fn test_top_folds_into_limit() {
    let query = parse("SELECT TOP 5 name FROM users");
    assert_eq!(query.select, vec!["name"]);
    assert_eq!(query.limit, Some(5));
    assert_eq!(query.to_sql(), "SELECT name FROM users LIMIT 5");
}

#[test]
fn test_mysql_limit_with_offset() {
    let query = parse("SELECT id FROM t LIMIT 20, 10");
    assert_eq!(query.limit, Some(10));
    assert_eq!(query.offset, Some(20));
}

#[test]
fn test_fetch_first_rows() {
    let query = parse("SELECT id FROM t ORDER BY id OFFSET 10 ROWS FETCH FIRST 25 ROWS ONLY");
    assert_eq!(query.limit, Some(25));
    assert_eq!(query.offset, Some(10));
}

#[test]
fn test_parameter_limit() {
    let query = parse("SELECT id FROM t LIMIT ?");
    assert_eq!(query.limit, None);
    assert_eq!(query.limit_expr.as_deref(), Some("?"));
    assert!(query.has_limit());
}

#[test]
fn test_with_clause() {
    let query = parse(
        "WITH recent AS (SELECT * FROM orders WHERE created_at > now()) SELECT count(*) FROM recent",
    );
    assert_eq!(
        query.ctes,
        vec![CommonTableExpr {
            name: "recent".to_string(),
            body: "SELECT * FROM orders WHERE created_at > now()".to_string(),
        }]
    );
    assert!(query.is_cte("RECENT"));
    assert_eq!(table_names(&query), vec!["recent"]);
}

#[test]
fn test_compound_branches() {
    let query = parse("SELECT id FROM a UNION SELECT id FROM b UNION ALL (SELECT id FROM c)");
    let operators: Vec<SetOperator> = query.compound.iter().map(|b| b.operator).collect();
    assert_eq!(operators, vec![SetOperator::Union, SetOperator::UnionAll]);
    assert_eq!(table_names(&query.compound[1].query), vec!["c"]);
    assert_eq!(query.branches().count(), 3);
}

#[test]
fn test_parenthesized_first_branch() {
    let query = parse("(SELECT a FROM t) UNION SELECT b FROM u");
    assert_eq!(query.select, vec!["a"]);
    assert_eq!(table_names(&query), vec!["t"]);
    assert_eq!(query.compound.len(), 1);
    assert_eq!(query.compound[0].operator, SetOperator::Union);
    assert_eq!(table_names(&query.compound[0].query), vec!["u"]);
    assert_eq!(query.to_sql(), "SELECT a FROM t UNION SELECT b FROM u");

    let query = parse("(SELECT a FROM t) UNION ALL (SELECT b FROM u)");
    assert_eq!(query.compound[0].operator, SetOperator::UnionAll);
    assert_eq!(query.branches().count(), 2);
}

#[test]
fn test_leading_group_that_is_not_a_select_is_malformed() {
    for sql in ["(1, 2) UNION SELECT b FROM u", "(a) SELECT b FROM u"] {
        let err = QueryTokenizer::parse(sql).unwrap_err();
        assert_eq!(err.reason, "leading parenthesized group is not a SELECT", "for {sql:?}");
    }
}

#[test]
fn test_derived_table() {
    let query = parse("SELECT t.n FROM (SELECT count(*) AS n FROM users) AS t");
    let table = &query.from[0];
    assert!(table.derived);
    assert_eq!(table.name, "(SELECT count(*) AS n FROM users)");
    assert_eq!(table.alias.as_deref(), Some("t"));
    assert!(query.tables().is_empty());
}

#[test]
fn test_distinct_and_is_distinct_from() {
    let query = parse("SELECT DISTINCT city FROM users WHERE a IS DISTINCT FROM b");
    assert!(query.distinct);
    assert_eq!(query.select, vec!["city"]);
    assert_eq!(table_names(&query), vec!["users"]);
    assert_eq!(query.predicates, vec!["a IS DISTINCT FROM b"]);
}

#[test]
fn test_only_first_statement_is_analyzed() {
    let query = parse("SELECT 1; SELECT 2");
    assert_eq!(query.select, vec!["1"]);
}

#[test]
fn test_prefix_before_select_is_skipped() {
    assert_eq!(parse("EXPLAIN SELECT 1").select, vec!["1"]);
    assert_eq!(parse("(SELECT id FROM t)").select, vec!["id"]);
}

#[test]
fn test_missing_select_is_malformed() {
    for sql in [
        "",
        "UPDATE users SET a = 1",
        "DELETE FROM t WHERE id IN (SELECT id FROM x)",
        "-- just a comment",
    ] {
        let err = QueryTokenizer::parse(sql).unwrap_err();
        assert_eq!(err.reason, "no top-level SELECT found", "for {sql:?}");
    }
}

#[test]
fn test_quoted_table_names_survive_serialization() {
    let query = parse(r#"SELECT "Order Items".id FROM "Order Items""#);
    assert_eq!(query.from[0].name, "Order Items");
    assert_eq!(
        query.to_sql(),
        r#"SELECT "Order Items".id FROM "Order Items""#
    );
}

#[test]
fn test_normalization_is_idempotent() {
    let queries = [
        "SELECT * FROM users",
        "select u.name, count(o.id) as orders from users u left join orders o on o.user_id = u.id \
         where u.active = true and o.total between 10 and 20 group by u.name order by 2 desc limit 10",
        "SELECT TOP 3 * FROM public.users WHERE name LIKE '%son'",
        "SELECT id FROM t LIMIT 20, 10",
        "WITH RECURSIVE r (n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM r) SELECT n FROM r",
        "SELECT id FROM a UNION SELECT id FROM b EXCEPT SELECT id FROM c",
        "SELECT * FROM a JOIN b USING (id) CROSS JOIN c NATURAL JOIN d",
        "SELECT t.n FROM (SELECT count(*) AS n FROM users) AS t",
        "SELECT a FROM t WHERE x BETWEEN 1 AND 5 AND y = CASE WHEN z AND w THEN 1 END",
        r#"SELECT "Order Items".id FROM "Order Items" oi WHERE oi.qty::int > 2"#,
        "SELECT * FROM generate_series(1, 10) g",
    ];
    for sql in queries {
        let first = parse(sql);
        let rendered = first.to_sql();
        let second = parse(&rendered);
        assert_eq!(first, second, "clause structure changed for {sql}");
        assert_eq!(rendered, second.to_sql());
    }
}
