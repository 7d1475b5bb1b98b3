//! Tests for intent-driven query generation

use super::*;
use indoc::indoc;
use pretty_assertions::assert_eq;

const SHOP: &str = indoc! {"
    CREATE TABLE users (
        id INT PRIMARY KEY,
        name TEXT,
        email TEXT,
        spend DECIMAL(10, 2),
        country TEXT,
        created_at TIMESTAMP
    );
    CREATE TABLE orders (
        id INT PRIMARY KEY,
        user_id INT REFERENCES users (id),
        total DECIMAL(10, 2),
        status TEXT,
        created_at TIMESTAMP
    );
    CREATE TABLE products (
        id INT PRIMARY KEY,
        name TEXT,
        price DECIMAL(10, 2)
    );
"};

fn shop() -> SchemaModel {
    let (schema, warnings) = SchemaModel::parse(SHOP);
    assert!(warnings.is_empty(), "{warnings:?}");
    schema
}

fn generate(intent: &str) -> GeneratedQuery {
    QueryGenerator::default().generate(intent, &shop()).unwrap()
}

fn sql(intent: &str) -> String {
    generate(intent).sql
}

fn note_ids(generated: &GeneratedQuery) -> Vec<&str> {
    generated.notes.iter().map(|n| n.rule_id.as_str()).collect()
}

mod ranking_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_top_n_orders_by_inferred_metric() {
        let generated = generate("top 5 users who spent the most money");
        assert_eq!(generated.sql, "SELECT * FROM users ORDER BY spend DESC LIMIT 5");
        assert_eq!(generated.table, "users");
        assert!(generated.notes.is_empty());
    }

    #[test]
    fn test_bare_by_names_the_metric() {
        assert_eq!(
            sql("top 5 users by spend"),
            "SELECT * FROM users ORDER BY spend DESC LIMIT 5"
        );
    }

    #[test]
    fn test_bottom_n_sorts_ascending() {
        assert_eq!(
            sql("bottom 3 products by price"),
            "SELECT * FROM products ORDER BY price LIMIT 3"
        );
    }

    #[test]
    fn test_ranking_word_can_name_the_metric() {
        assert_eq!(
            sql("5 newest orders"),
            "SELECT * FROM orders ORDER BY created_at DESC LIMIT 5"
        );
    }

    #[test]
    fn test_explicit_sort_with_two_word_column() {
        assert_eq!(
            sql("users sorted by created at descending"),
            "SELECT * FROM users ORDER BY created_at DESC"
        );
        assert_eq!(sql("products ordered by name"), "SELECT * FROM products ORDER BY name");
    }
}

mod aggregate_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_count_per_column() {
        assert_eq!(
            sql("how many orders per status"),
            "SELECT status, COUNT(*) FROM orders GROUP BY status"
        );
    }

    #[test]
    fn test_plain_count() {
        assert_eq!(sql("count of products"), "SELECT COUNT(*) FROM products");
    }

    #[test]
    fn test_grouping_without_aggregate_counts_rows() {
        assert_eq!(
            sql("users per country"),
            "SELECT country, COUNT(*) FROM users GROUP BY country"
        );
    }

    #[test]
    fn test_average_infers_table_from_column() {
        assert_eq!(
            sql("average total per status"),
            "SELECT status, AVG(total) FROM orders GROUP BY status"
        );
        assert_eq!(
            sql("average spend by country"),
            "SELECT country, AVG(spend) FROM users GROUP BY country"
        );
    }

    #[test]
    fn test_count_distinct() {
        assert_eq!(
            sql("how many distinct countries among users"),
            "SELECT COUNT(DISTINCT country) FROM users"
        );
    }
}

mod condition_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_symbol_and_word_comparators() {
        assert_eq!(
            sql("orders where total > 100 and status is 'paid'"),
            "SELECT * FROM orders WHERE total > 100 AND status = 'paid'"
        );
        assert_eq!(
            sql("products with price at least 20"),
            "SELECT * FROM products WHERE price >= 20"
        );
    }

    #[test]
    fn test_contains_becomes_like() {
        assert_eq!(
            sql("products whose name contains 'phone'"),
            "SELECT * FROM products WHERE name LIKE '%phone%'"
        );
    }

    #[test]
    fn test_inner_quote_survives_into_literal() {
        assert_eq!(
            sql("users whose name is \"O'Neil\""),
            "SELECT * FROM users WHERE name = 'O''Neil'"
        );
    }

    #[test]
    fn test_null_comparison() {
        assert_eq!(sql("users where email is null"), "SELECT * FROM users WHERE email IS NULL");
    }

    #[test]
    fn test_unknown_column_is_reported_not_invented() {
        let generated = generate("users where shoe size > 40");
        assert_eq!(generated.sql, "SELECT * FROM users");
        assert_eq!(note_ids(&generated), vec![IGNORED_RULE_ID]);
        assert!(generated.notes[0].message.contains("\"shoe size\""));
    }
}

mod table_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_joins_through_foreign_key() {
        assert_eq!(
            sql("orders of users whose country is 'NO'"),
            "SELECT * FROM orders JOIN users ON orders.user_id = users.id WHERE users.country = 'NO'"
        );
    }

    #[test]
    fn test_unlinked_table_is_ignored() {
        let generated = generate("users and products");
        assert_eq!(generated.sql, "SELECT * FROM users");
        assert_eq!(note_ids(&generated), vec![IGNORED_RULE_ID]);
        assert_eq!(generated.notes[0].table.as_deref(), Some("products"));
    }

    #[test]
    fn test_ambiguous_column_uses_first_declared_table() {
        let generated = generate("distinct name");
        assert_eq!(generated.sql, "SELECT DISTINCT name FROM users");
        assert_eq!(note_ids(&generated), vec![AMBIGUITY_RULE_ID]);
        assert_eq!(
            generated.notes[0].message,
            "\"name\" also matches columns in products; using users.name"
        );
        assert_eq!(generated.notes[0].severity, Severity::Info);
    }

    #[test]
    fn test_synonyms_from_vocabulary() {
        let mut vocabulary = IntentVocabulary::default();
        vocabulary
            .synonyms
            .insert("shoppers".to_string(), "users".to_string());
        let generated = QueryGenerator::new(vocabulary)
            .generate("shoppers per country", &shop())
            .unwrap();
        assert_eq!(
            generated.sql,
            "SELECT country, COUNT(*) FROM users GROUP BY country"
        );
    }

    #[test]
    fn test_no_table_is_an_error() {
        let generator = QueryGenerator::default();
        let err = generator.generate("what is the weather today", &shop()).unwrap_err();
        assert_eq!(err.intent, "what is the weather today");
        assert!(generator.generate("   ", &shop()).is_err());
        assert!(generator.generate("top 5 users", &SchemaModel::new()).is_err());
    }
}
