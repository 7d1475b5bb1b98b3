//! DDL parsing into a [`SchemaModel`]
//!
//! Recognizes `CREATE TABLE`, `CREATE INDEX` and `ALTER TABLE ... ADD`.
//! Everything else is reported as a [`ParseWarning`] and skipped, so a
//! partially understood schema still produces a usable model. Foreign keys
//! are resolved after every statement has been read, which lets a table
//! reference another table declared later in the text.

use sqlsage_core::{Token, TokenCursor, render_tokens, split_top_level, tokenize};

use crate::model::{Column, ForeignKeyRef, IndexDef, SchemaModel, Table};
use crate::warning::{ParseWarning, ParseWarningKind};

/// Keywords that end a column's type and start its constraints
const COLUMN_CONSTRAINT_START: &[&str] = &[
    "PRIMARY",
    "NOT",
    "NULL",
    "UNIQUE",
    "DEFAULT",
    "REFERENCES",
    "CHECK",
    "CONSTRAINT",
    "AUTO_INCREMENT",
    "AUTOINCREMENT",
    "COLLATE",
    "GENERATED",
    "IDENTITY",
    "ON",
    "COMMENT",
    "AS",
];

/// Keywords a named `CONSTRAINT` may introduce
const NAMED_CONSTRAINT_KINDS: &[&str] = &["PRIMARY", "UNIQUE", "FOREIGN", "CHECK", "EXCLUDE"];

/// Foreign key waiting for the whole schema to be known
#[derive(Debug)]
struct PendingReference {
    table: String,
    columns: Vec<String>,
    ref_table: String,
    ref_columns: Vec<String>,
    statement: String,
}

/// Accumulates tables and warnings while walking the statements
#[derive(Debug, Default)]
struct SchemaParser {
    schema: SchemaModel,
    warnings: Vec<ParseWarning>,
    references: Vec<PendingReference>,
}

impl SchemaModel {
    /// Parse schema DDL text. Never fails: problems become warnings.
    pub fn parse(schema_text: &str) -> (SchemaModel, Vec<ParseWarning>) {
        SchemaParser::default().run(schema_text)
    }
}

impl SchemaParser {
    fn run(mut self, text: &str) -> (SchemaModel, Vec<ParseWarning>) {
        let tokens = tokenize(text);
        for statement in split_top_level(&tokens, |t| matches!(t, Token::Semicolon)) {
            if !statement.is_empty() {
                self.parse_statement(statement);
            }
        }
        self.resolve_references();

        tracing::debug!(
            tables = self.schema.len(),
            warnings = self.warnings.len(),
            "parsed schema"
        );
        (self.schema, self.warnings)
    }

    fn parse_statement(&mut self, tokens: &[Token]) {
        let text = render_tokens(tokens);
        let mut cur = TokenCursor::new(tokens);

        if cur.eat_keyword("CREATE") {
            cur.eat_keywords(&["OR", "REPLACE"]);
            while cur
                .eat_any_keyword(&["TEMP", "TEMPORARY", "UNLOGGED", "GLOBAL", "LOCAL"])
                .is_some()
            {}
            if cur.eat_keyword("TABLE") {
                return self.parse_create_table(cur, &text);
            }
            let unique = cur.eat_keyword("UNIQUE");
            cur.eat_any_keyword(&["CLUSTERED", "NONCLUSTERED", "FULLTEXT", "SPATIAL"]);
            if cur.eat_keyword("INDEX") {
                return self.parse_create_index(cur, unique, &text);
            }
        } else if cur.eat_keywords(&["ALTER", "TABLE"]) {
            return self.parse_alter_table(cur, &text);
        }

        let head = tokens.first().map(Token::to_sql).unwrap_or_default();
        self.warn(
            ParseWarningKind::UnrecognizedStatement,
            format!("skipped `{head}` statement"),
            &text,
        );
    }

    fn parse_create_table(&mut self, mut cur: TokenCursor<'_>, text: &str) {
        cur.eat_keywords(&["IF", "NOT", "EXISTS"]);
        let Some(name) = cur.qualified_name().and_then(|parts| parts.last().cloned()) else {
            self.warn(
                ParseWarningKind::UnrecognizedStatement,
                "CREATE TABLE without a table name",
                text,
            );
            return;
        };
        let Some(body) = cur.group() else {
            self.warn(
                ParseWarningKind::UnrecognizedStatement,
                format!("CREATE TABLE {name} has no column list"),
                text,
            );
            return;
        };

        let mut table = Table::new(&name);
        let mut references = Vec::new();
        for element in split_top_level(body, |t| matches!(t, Token::Comma)) {
            if element.is_empty() {
                self.warn(
                    ParseWarningKind::MalformedColumn,
                    format!("empty column definition in {name}"),
                    text,
                );
                continue;
            }
            let mut cur = TokenCursor::new(element);
            if starts_table_constraint(&cur) {
                parse_table_constraint(&mut cur, &mut table, &mut references, &mut self.warnings, text);
            } else {
                parse_column(&mut cur, &mut table, &mut references, &mut self.warnings, text);
            }
        }

        if self.schema.insert_table(table) {
            tracing::trace!(table = %name, "registered table");
            self.references.extend(references);
        } else {
            self.warn(
                ParseWarningKind::DuplicateTable,
                format!("table {name} is declared more than once, keeping the first definition"),
                text,
            );
        }
    }

    fn parse_create_index(&mut self, mut cur: TokenCursor<'_>, unique: bool, text: &str) {
        cur.eat_keyword("CONCURRENTLY");
        cur.eat_keywords(&["IF", "NOT", "EXISTS"]);
        let name = if cur.at_keyword("ON") {
            None
        } else {
            cur.qualified_name().and_then(|parts| parts.last().cloned())
        };
        if !cur.eat_keyword("ON") {
            self.warn(
                ParseWarningKind::MalformedConstraint,
                "CREATE INDEX without ON <table>",
                text,
            );
            return;
        }
        cur.eat_keyword("ONLY");
        let Some(table_name) = cur.qualified_name().and_then(|parts| parts.last().cloned()) else {
            self.warn(
                ParseWarningKind::MalformedConstraint,
                "CREATE INDEX without a table name",
                text,
            );
            return;
        };
        if cur.eat_keyword("USING") {
            cur.advance();
        }
        let Some(columns) = key_list(&mut cur) else {
            self.warn(
                ParseWarningKind::MalformedConstraint,
                format!("index on {table_name} has no column list"),
                text,
            );
            return;
        };
        let Some(table) = self.schema.table_mut(&table_name) else {
            self.warn(
                ParseWarningKind::UnknownTable,
                format!("index on undeclared table {table_name}"),
                text,
            );
            return;
        };

        if unique && columns.len() == 1 {
            if let Some(column) = table.column_mut(&columns[0]) {
                column.is_unique = true;
            }
        }
        table.add_index(IndexDef {
            name,
            columns,
            unique,
            primary: false,
        });
    }

    fn parse_alter_table(&mut self, mut cur: TokenCursor<'_>, text: &str) {
        cur.eat_keywords(&["IF", "EXISTS"]);
        cur.eat_keyword("ONLY");
        let Some(table_name) = cur.qualified_name().and_then(|parts| parts.last().cloned()) else {
            self.warn(
                ParseWarningKind::UnrecognizedStatement,
                "ALTER TABLE without a table name",
                text,
            );
            return;
        };
        if !self.schema.contains_table(&table_name) {
            self.warn(
                ParseWarningKind::UnknownTable,
                format!("ALTER TABLE on undeclared table {table_name}"),
                text,
            );
            return;
        }

        for action in split_top_level(cur.rest(), |t| matches!(t, Token::Comma)) {
            let mut cur = TokenCursor::new(action);
            if !cur.eat_keyword("ADD") {
                self.warn(
                    ParseWarningKind::UnrecognizedStatement,
                    format!("unsupported ALTER TABLE action `{}`", render_tokens(action)),
                    text,
                );
                continue;
            }
            let Some(table) = self.schema.table_mut(&table_name) else {
                return;
            };
            if starts_table_constraint(&cur) {
                parse_table_constraint(&mut cur, table, &mut self.references, &mut self.warnings, text);
            } else {
                cur.eat_keyword("COLUMN");
                cur.eat_keywords(&["IF", "NOT", "EXISTS"]);
                parse_column(&mut cur, table, &mut self.references, &mut self.warnings, text);
            }
        }
    }

    fn resolve_references(&mut self) {
        for pending in std::mem::take(&mut self.references) {
            let target = self.schema.table(&pending.ref_table).cloned();

            for (i, column) in pending.columns.iter().enumerate() {
                let wanted = pending
                    .ref_columns
                    .get(i)
                    .cloned()
                    .or_else(|| {
                        target
                            .as_ref()
                            .and_then(|t| t.primary_key().get(i).map(|c| c.to_string()))
                    })
                    .unwrap_or_else(|| "id".to_string());

                let resolved = target
                    .as_ref()
                    .and_then(|t| t.column(&wanted).map(|c| (t.name.clone(), c.name.clone())));
                let foreign_key = match resolved {
                    Some((table, column)) => ForeignKeyRef {
                        table,
                        column,
                        resolved: true,
                    },
                    None => {
                        self.warn(
                            ParseWarningKind::UnresolvedReference,
                            format!(
                                "{}.{} references {}.{} which is not declared",
                                pending.table, column, pending.ref_table, wanted
                            ),
                            &pending.statement,
                        );
                        ForeignKeyRef {
                            table: pending.ref_table.clone(),
                            column: wanted,
                            resolved: false,
                        }
                    }
                };

                if let Some(col) = self
                    .schema
                    .table_mut(&pending.table)
                    .and_then(|t| t.column_mut(column))
                {
                    col.foreign_key = Some(foreign_key);
                }
            }
        }
    }

    fn warn(&mut self, kind: ParseWarningKind, message: impl Into<String>, statement: &str) {
        push_warning(&mut self.warnings, kind, message, statement);
    }
}

fn push_warning(
    warnings: &mut Vec<ParseWarning>,
    kind: ParseWarningKind,
    message: impl Into<String>,
    statement: &str,
) {
    let warning = ParseWarning::new(kind, message, statement);
    tracing::trace!(kind = %warning.kind, message = %warning.message, "schema parse warning");
    warnings.push(warning);
}

/// Parses a column definition and adds it, with its implied indexes, to `table`
fn parse_column(
    cur: &mut TokenCursor<'_>,
    table: &mut Table,
    references: &mut Vec<PendingReference>,
    warnings: &mut Vec<ParseWarning>,
    text: &str,
) {
    let name = match cur.advance() {
        Some(token) => match token.identifier() {
            Some(name) => name.to_string(),
            None => {
                push_warning(
                    warnings,
                    ParseWarningKind::MalformedColumn,
                    format!("expected a column name in {}, found `{}`", table.name, token),
                    text,
                );
                return;
            }
        },
        None => return,
    };

    let type_start = cur.position();
    while !cur.is_done() && !cur.at_any_keyword(COLUMN_CONSTRAINT_START) {
        cur.skip_item();
    }
    let mut column = Column::new(&name, render_tokens(cur.since(type_start)));

    while !cur.is_done() {
        if cur.eat_keywords(&["PRIMARY", "KEY"]) {
            column.is_primary_key = true;
            column.nullable = false;
            cur.eat_any_keyword(&["ASC", "DESC"]);
        } else if cur.eat_keywords(&["NOT", "NULL"]) {
            column.nullable = false;
        } else if cur.eat_keyword("NULL") {
            column.nullable = true;
        } else if cur.eat_keyword("UNIQUE") {
            column.is_unique = true;
            cur.eat_keyword("KEY");
        } else if cur.eat_keyword("DEFAULT") {
            column.default = default_expression(cur);
            if column.default.is_none() {
                push_warning(
                    warnings,
                    ParseWarningKind::MalformedColumn,
                    format!("DEFAULT without a value on {}.{}", table.name, name),
                    text,
                );
            }
        } else if cur.eat_keyword("REFERENCES") {
            match cur.qualified_name().and_then(|parts| parts.last().cloned()) {
                Some(ref_table) => references.push(PendingReference {
                    table: table.name.clone(),
                    columns: vec![name.clone()],
                    ref_table,
                    ref_columns: key_list(cur).unwrap_or_default(),
                    statement: text.to_string(),
                }),
                None => push_warning(
                    warnings,
                    ParseWarningKind::MalformedColumn,
                    format!("REFERENCES without a table on {}.{}", table.name, name),
                    text,
                ),
            }
        } else if cur.eat_keyword("ON") {
            // ON DELETE / ON UPDATE referential actions
            cur.advance();
            cur.eat_any_keyword(&["SET", "NO"]);
            cur.advance();
        } else if cur.eat_keyword("CONSTRAINT") {
            cur.name();
        } else {
            cur.skip_item();
        }
    }

    if table.has_column(&name) {
        push_warning(
            warnings,
            ParseWarningKind::MalformedColumn,
            format!("column {name} is declared twice in {}", table.name),
            text,
        );
        return;
    }

    if column.is_primary_key {
        table.add_index(IndexDef {
            name: None,
            columns: vec![name.clone()],
            unique: true,
            primary: true,
        });
    }
    if column.is_unique {
        table.add_index(IndexDef {
            name: None,
            columns: vec![name.clone()],
            unique: true,
            primary: false,
        });
    }
    table.columns.push(column);
}

fn default_expression(cur: &mut TokenCursor<'_>) -> Option<String> {
    let start = cur.position();
    match cur.peek()? {
        Token::LParen => cur.skip_item(),
        Token::Op(op) if op == "-" || op == "+" => {
            cur.advance();
            cur.advance();
        }
        Token::Word(_) => {
            cur.advance();
            if matches!(cur.peek(), Some(Token::LParen)) {
                cur.skip_item();
            }
        }
        _ => {
            cur.advance();
        }
    }
    while cur.peek().and_then(Token::operator) == Some("::") {
        cur.advance();
        cur.advance();
    }
    Some(render_tokens(cur.since(start)))
}

/// Parses a table-level constraint (also used by `ALTER TABLE ... ADD`)
/// Decides between a table constraint and a column whose name happens to be
/// a constraint keyword (`key VARCHAR(50)`, `check TEXT`).
fn starts_table_constraint(cur: &TokenCursor<'_>) -> bool {
    let Some(first) = cur.peek() else {
        return false;
    };
    let at = |n: usize, keywords: &[&str]| {
        cur.peek_nth(n).is_some_and(|t| t.is_any_keyword(keywords))
    };
    let open = |n: usize| matches!(cur.peek_nth(n), Some(Token::LParen));
    // `(a, b)` or `name (a(10), b)`: a key column list starts with a name,
    // while a type argument list such as `VARCHAR(50)` starts with a literal
    let key_list_at = |n: usize| {
        open(n)
            && matches!(
                cur.peek_nth(n + 1),
                Some(Token::Word(_) | Token::QuotedIdent(_))
            )
    };
    let index_tail = |n: usize| {
        key_list_at(n)
            || (matches!(cur.peek_nth(n), Some(Token::Word(_) | Token::QuotedIdent(_)))
                && key_list_at(n + 1))
    };

    if first.is_keyword("CONSTRAINT") {
        at(2, NAMED_CONSTRAINT_KINDS)
    } else if first.is_any_keyword(&["PRIMARY", "FOREIGN"]) {
        at(1, &["KEY"])
    } else if first.is_keyword("UNIQUE") {
        at(1, &["KEY", "INDEX"]) || index_tail(1)
    } else if first.is_any_keyword(&["FULLTEXT", "SPATIAL"]) {
        if at(1, &["KEY", "INDEX"]) {
            index_tail(2)
        } else {
            index_tail(1)
        }
    } else if first.is_any_keyword(&["INDEX", "KEY"]) {
        index_tail(1)
    } else if first.is_keyword("CHECK") {
        open(1)
    } else if first.is_keyword("EXCLUDE") {
        open(1) || at(1, &["USING"])
    } else {
        false
    }
}

fn parse_table_constraint(
    cur: &mut TokenCursor<'_>,
    table: &mut Table,
    references: &mut Vec<PendingReference>,
    warnings: &mut Vec<ParseWarning>,
    text: &str,
) {
    let constraint_name = if cur.eat_keyword("CONSTRAINT") {
        cur.name()
    } else {
        None
    };

    let malformed = |warnings: &mut Vec<ParseWarning>, message: String| {
        push_warning(warnings, ParseWarningKind::MalformedConstraint, message, text);
    };

    if cur.eat_keywords(&["PRIMARY", "KEY"]) {
        let Some(columns) = key_list(cur) else {
            return malformed(warnings, format!("PRIMARY KEY without columns on {}", table.name));
        };
        if let Some(missing) = first_missing(table, &columns) {
            return malformed(
                warnings,
                format!("PRIMARY KEY names unknown column {missing} in {}", table.name),
            );
        }
        for name in &columns {
            if let Some(column) = table.column_mut(name) {
                column.is_primary_key = true;
                column.nullable = false;
            }
        }
        table.add_index(IndexDef {
            name: constraint_name,
            columns,
            unique: true,
            primary: true,
        });
    } else if cur.eat_keyword("UNIQUE") {
        cur.eat_any_keyword(&["KEY", "INDEX"]);
        let index_name = index_name_before_columns(cur).or(constraint_name);
        let Some(columns) = key_list(cur) else {
            return malformed(warnings, format!("UNIQUE without columns on {}", table.name));
        };
        if let Some(missing) = first_missing(table, &columns) {
            return malformed(
                warnings,
                format!("UNIQUE names unknown column {missing} in {}", table.name),
            );
        }
        if let [only] = columns.as_slice() {
            if let Some(column) = table.column_mut(only) {
                column.is_unique = true;
            }
        }
        table.add_index(IndexDef {
            name: index_name,
            columns,
            unique: true,
            primary: false,
        });
    } else if cur.eat_keywords(&["FOREIGN", "KEY"]) {
        index_name_before_columns(cur);
        let Some(columns) = key_list(cur) else {
            return malformed(warnings, format!("FOREIGN KEY without columns on {}", table.name));
        };
        if !cur.eat_keyword("REFERENCES") {
            return malformed(
                warnings,
                format!("FOREIGN KEY on {} has no REFERENCES clause", table.name),
            );
        }
        let Some(ref_table) = cur.qualified_name().and_then(|parts| parts.last().cloned()) else {
            return malformed(
                warnings,
                format!("FOREIGN KEY on {} references no table", table.name),
            );
        };
        let ref_columns = key_list(cur).unwrap_or_default();
        if !ref_columns.is_empty() && ref_columns.len() != columns.len() {
            return malformed(
                warnings,
                format!(
                    "FOREIGN KEY on {} pairs {} columns with {} referenced columns",
                    table.name,
                    columns.len(),
                    ref_columns.len()
                ),
            );
        }
        if let Some(missing) = first_missing(table, &columns) {
            return malformed(
                warnings,
                format!("FOREIGN KEY names unknown column {missing} in {}", table.name),
            );
        }
        references.push(PendingReference {
            table: table.name.clone(),
            columns,
            ref_table,
            ref_columns,
            statement: text.to_string(),
        });
    } else if cur.eat_any_keyword(&["FULLTEXT", "SPATIAL"]).is_some()
        || cur.at_any_keyword(&["INDEX", "KEY"])
    {
        cur.eat_any_keyword(&["INDEX", "KEY"]);
        let index_name = index_name_before_columns(cur).or(constraint_name);
        let Some(columns) = key_list(cur) else {
            return malformed(warnings, format!("index without columns on {}", table.name));
        };
        table.add_index(IndexDef {
            name: index_name,
            columns,
            unique: false,
            primary: false,
        });
    } else if cur.eat_any_keyword(&["CHECK", "EXCLUDE"]).is_some() {
        // not relevant to query analysis
    } else {
        let rest = render_tokens(cur.rest());
        malformed(
            warnings,
            format!("unrecognized constraint `{rest}` on {}", table.name),
        );
    }
}

fn index_name_before_columns(cur: &mut TokenCursor<'_>) -> Option<String> {
    if matches!(cur.peek(), Some(Token::LParen)) {
        None
    } else {
        cur.name()
    }
}

fn first_missing<'a>(table: &Table, columns: &'a [String]) -> Option<&'a str> {
    columns
        .iter()
        .find(|c| !table.has_column(c))
        .map(String::as_str)
}

/// Parses `(key, key, ...)`. Plain column keys keep their name; expression
/// keys such as `lower(email)` are kept as rendered text.
fn key_list(cur: &mut TokenCursor<'_>) -> Option<Vec<String>> {
    let group = cur.group()?;
    let keys: Vec<String> = split_top_level(group, |t| matches!(t, Token::Comma))
        .into_iter()
        .filter(|key| !key.is_empty())
        .map(|key| {
            let mut cur = TokenCursor::new(key);
            match cur.advance() {
                Some(Token::Word(name) | Token::QuotedIdent(name)) if is_plain_key_suffix(cur.rest()) => {
                    name.clone()
                }
                _ => render_tokens(key),
            }
        })
        .collect();
    (!keys.is_empty()).then_some(keys)
}

/// `ASC`, `DESC`, `NULLS FIRST`, `COLLATE x` or a MySQL prefix length `(10)`
fn is_plain_key_suffix(rest: &[Token]) -> bool {
    let mut cur = TokenCursor::new(rest);
    if let Some(Token::LParen) = cur.peek() {
        match cur.group() {
            Some([Token::Number(_)]) => {}
            _ => return false,
        }
    }
    while let Some(token) = cur.advance() {
        if token.is_keyword("COLLATE") {
            cur.advance();
        } else if !token.is_any_keyword(&["ASC", "DESC", "NULLS", "FIRST", "LAST"]) {
            return false;
        }
    }
    true
}
