//! Index DDL rendering for suggestions

use sqlsage_core::quote_ident;

/// Conventional index name: `idx_<table>_<col1>_<col2>`
pub fn index_name<S: AsRef<str>>(table: &str, columns: &[S]) -> String {
    let mut name = format!("idx_{}", sanitize(table));
    for column in columns {
        name.push('_');
        name.push_str(&sanitize(column.as_ref()));
    }
    name
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Render `CREATE INDEX idx_<table>_<cols> ON <table> (<cols>);`
pub fn index_ddl<S: AsRef<str>>(table: &str, columns: &[S]) -> String {
    tracing::trace!(table = %table, columns = columns.len(), "rendering CREATE INDEX suggestion");
    let column_list = columns
        .iter()
        .map(|c| quote_ident(c.as_ref()))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE INDEX {} ON {} ({});",
        index_name(table, columns),
        quote_ident(table),
        column_list
    )
}
