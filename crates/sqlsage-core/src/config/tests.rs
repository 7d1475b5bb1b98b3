use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_default_weights() {
    let weights = ScoreWeights::default();
    assert_eq!(weights.weight_for(Severity::Critical), 25);
    assert_eq!(weights.weight_for(Severity::Warning), 10);
    assert_eq!(weights.weight_for(Severity::Info), 2);
}

#[test]
fn test_unknown_tables_are_large() {
    let config = AnalyzerConfig::default()
        .with_row_estimate("Countries", 250)
        .with_row_estimate("events", 5_000_000);

    assert!(!config.is_large_table("countries"));
    assert!(config.is_large_table("events"));
    assert!(config.is_large_table("never_seen"));
}

#[test]
fn test_threshold_is_exclusive() {
    let config = AnalyzerConfig::default()
        .with_large_table_threshold(100)
        .with_row_estimate("t", 100);
    assert!(!config.is_large_table("t"));
}

#[test]
fn test_disabled_rules() {
    let config = AnalyzerConfig::new().with_disabled_rule("select-star");
    assert!(!config.is_rule_enabled("select-star"));
    assert!(config.is_rule_enabled("missing-where"));
}

#[test]
fn test_partial_toml_keeps_defaults() {
    let config = AnalyzerConfig::from_toml_str(
        r#"
        max_joins = 5
        disabled_rules = ["in-subquery"]

        [weights]
        info = 1

        [row_estimates]
        countries = 200
        "#,
    )
    .unwrap();

    assert_eq!(config.max_joins, 5);
    assert_eq!(config.weights.info, 1);
    assert_eq!(config.weights.critical, 25);
    assert_eq!(config.large_table_threshold, 1_000);
    assert!(!config.is_rule_enabled("in-subquery"));
    assert!(!config.is_large_table("countries"));
    assert_eq!(config.vocabulary, IntentVocabulary::default());
}

#[test]
fn test_invalid_toml_is_a_configuration_error() {
    let err = AnalyzerConfig::from_toml_str("max_joins = \"many\"").unwrap_err();
    assert!(matches!(err, AssistError::Configuration(_)));
}

#[test]
fn test_vocabulary_direction_and_synonyms() {
    let vocabulary = IntentVocabulary::default();
    assert_eq!(vocabulary.direction("most"), Some(true));
    assert_eq!(vocabulary.direction("lowest"), Some(false));
    assert_eq!(vocabulary.direction("users"), None);
    assert_eq!(vocabulary.canonical("spent"), "spend");
    assert_eq!(vocabulary.canonical("email"), "email");
    assert!(vocabulary.is_stop_word("the"));
}
