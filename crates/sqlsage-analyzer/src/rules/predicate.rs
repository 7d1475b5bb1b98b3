//! Column references and literal patterns inside predicate text
//!
//! Predicates arrive as normalized strings. These helpers re-lex them and
//! pick out the pieces the rules care about: bare or qualified column
//! references, the function call wrapping a reference, and the token
//! positions of comparisons, `LIKE` patterns and `IN (SELECT ...)` groups.

use sqlsage_core::{Token, is_keyword, render_tokens, split_top_level};

/// Words that look like identifiers but never name a column
const NON_COLUMN_WORDS: &[&str] = &[
    "CURRENT_DATE",
    "CURRENT_TIME",
    "CURRENT_TIMESTAMP",
    "CURRENT_USER",
    "LOCALTIME",
    "LOCALTIMESTAMP",
    "SESSION_USER",
    "SYSDATE",
    "INTERVAL",
    "ESCAPE",
    "COLLATE",
    "SIMILAR",
    "TO",
    "ISNULL",
    "NOTNULL",
    "DIV",
    "MOD",
    "XOR",
    "REGEXP",
    "RLIKE",
    "GLOB",
    "SYMMETRIC",
    "UNKNOWN",
];

const COMPARISON_OPERATORS: &[&str] = &["=", "==", "<>", "!=", "<", ">", "<=", ">="];

/// Function call wrapping a column reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCall {
    pub name: String,
    /// Rendered call text, e.g. `lower(email)`
    pub sql: String,
}

/// A column mentioned in a predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    /// Table name or alias written before the column
    pub qualifier: Option<String>,
    pub column: String,
    /// Outermost function call containing the reference
    pub function: Option<FunctionCall>,
    /// First token of the reference
    pub start: usize,
    /// One past the last token of the reference
    pub end: usize,
}

impl ColumnRef {
    /// The reference as written, `u.email` or `email`
    pub fn display(&self) -> String {
        match &self.qualifier {
            Some(qualifier) => format!("{qualifier}.{}", self.column),
            None => self.column.clone(),
        }
    }

    pub fn is_bare(&self) -> bool {
        self.function.is_none()
    }
}

#[derive(Debug)]
struct CallSpan {
    start: usize,
    close: usize,
    name: String,
    sql: String,
}

/// Index of the `)` matching the `(` at `open`, or `tokens.len()` when the
/// group is unterminated.
pub fn matching_paren(tokens: &[Token], open: usize) -> usize {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i;
                }
            }
            _ => {}
        }
    }
    tokens.len()
}

fn starts_subquery(rest: &[Token]) -> bool {
    rest.first()
        .is_some_and(|t| t.is_any_keyword(&["SELECT", "WITH"]))
}

fn is_function_name(token: &Token) -> bool {
    match token {
        Token::Word(word) => !is_keyword(word) || word.eq_ignore_ascii_case("LEFT") || word.eq_ignore_ascii_case("RIGHT"),
        _ => false,
    }
}

fn function_calls(tokens: &[Token]) -> Vec<CallSpan> {
    let mut calls = Vec::new();
    for (i, pair) in tokens.windows(2).enumerate() {
        if is_function_name(&pair[0]) && matches!(pair[1], Token::LParen) {
            let close = matching_paren(tokens, i + 1);
            let end = (close + 1).min(tokens.len());
            calls.push(CallSpan {
                start: i,
                close,
                name: pair[0].to_sql(),
                sql: render_tokens(&tokens[i..end]),
            });
        }
    }
    calls
}

fn reference_start(token: &Token) -> Option<&str> {
    match token {
        Token::Word(word) if NON_COLUMN_WORDS.iter().any(|w| w.eq_ignore_ascii_case(word)) => None,
        _ => token.identifier(),
    }
}

fn name_part(token: &Token) -> Option<&str> {
    match token {
        Token::Word(word) | Token::QuotedIdent(word) => Some(word),
        _ => None,
    }
}

/// Cast targets (`x::int`, `CAST(x AS int)`) are type names
fn follows_type_position(tokens: &[Token], i: usize) -> bool {
    i.checked_sub(1)
        .and_then(|prev| tokens.get(prev))
        .is_some_and(|prev| prev.operator() == Some("::") || prev.is_keyword("AS"))
}

/// Column references in `tokens`, in order. Subqueries are skipped.
pub fn column_refs(tokens: &[Token]) -> Vec<ColumnRef> {
    let calls = function_calls(tokens);
    let mut refs = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        if matches!(tokens[i], Token::LParen) && starts_subquery(&tokens[i + 1..]) {
            i = matching_paren(tokens, i) + 1;
            continue;
        }
        let Some(first) = reference_start(&tokens[i]) else {
            i += 1;
            continue;
        };
        if follows_type_position(tokens, i) {
            i += 1;
            continue;
        }

        let mut parts = vec![first];
        let mut end = i + 1;
        while matches!(tokens.get(end), Some(Token::Dot)) {
            match tokens.get(end + 1).and_then(name_part) {
                Some(part) => {
                    parts.push(part);
                    end += 2;
                }
                None => break,
            }
        }

        // function names, `t.*` and typed literals such as DATE '2024-01-01'
        if matches!(tokens.get(end), Some(Token::LParen | Token::Dot | Token::Str(_))) {
            i = end;
            continue;
        }

        let column = parts[parts.len() - 1].to_string();
        let qualifier = (parts.len() >= 2).then(|| parts[parts.len() - 2].to_string());
        let function = calls
            .iter()
            .find(|call| call.start < i && i < call.close)
            .map(|call| FunctionCall {
                name: call.name.clone(),
                sql: call.sql.clone(),
            });
        refs.push(ColumnRef {
            qualifier,
            column,
            function,
            start: i,
            end,
        });
        i = end;
    }
    refs
}

/// Returns true if the predicate has an `OR` outside any parentheses
pub fn has_top_level_or(tokens: &[Token]) -> bool {
    split_top_level(tokens, |t| t.is_keyword("OR")).len() > 1
}

/// Returns true for string literals holding a plain decimal number
pub fn is_numeric_literal(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let mut parts = digits.splitn(2, '.');
    let whole = parts.next().unwrap_or_default();
    let fraction = parts.next();
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    !whole.is_empty()
        && all_digits(whole)
        && fraction.is_none_or(|f| !f.is_empty() && all_digits(f))
}

/// A column compared with a quoted number, `spend = '100'`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotedNumberComparison {
    pub column: ColumnRef,
    /// Position of the string literal token
    pub literal: usize,
    pub value: String,
}

pub fn quoted_number_comparisons(tokens: &[Token], refs: &[ColumnRef]) -> Vec<QuotedNumberComparison> {
    let mut found = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        if !token
            .operator()
            .is_some_and(|op| COMPARISON_OPERATORS.contains(&op))
        {
            continue;
        }
        let left = refs.iter().find(|r| r.is_bare() && r.end == i);
        let right = refs.iter().find(|r| r.is_bare() && r.start == i + 1);
        let literal_after = match tokens.get(i + 1) {
            Some(Token::Str(value)) if is_numeric_literal(value) => Some((i + 1, value)),
            _ => None,
        };
        let literal_before = match i.checked_sub(1).and_then(|p| tokens.get(p)) {
            Some(Token::Str(value)) if is_numeric_literal(value) => Some((i - 1, value)),
            _ => None,
        };
        let pair = match (left, literal_after, right, literal_before) {
            (Some(column), Some((pos, value)), _, _) => Some((column, pos, value)),
            (_, _, Some(column), Some((pos, value))) => Some((column, pos, value)),
            _ => None,
        };
        if let Some((column, literal, value)) = pair {
            found.push(QuotedNumberComparison {
                column: column.clone(),
                literal,
                value: value.clone(),
            });
        }
    }
    found
}

/// A `LIKE`/`ILIKE` whose pattern starts with `%`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WildcardMatch {
    pub column: Option<ColumnRef>,
    pub pattern: String,
}

pub fn leading_wildcards(tokens: &[Token], refs: &[ColumnRef]) -> Vec<WildcardMatch> {
    let mut found = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        if !token.is_any_keyword(&["LIKE", "ILIKE"]) {
            continue;
        }
        let Some(Token::Str(pattern)) = tokens.get(i + 1) else {
            continue;
        };
        if !pattern.starts_with('%') {
            continue;
        }
        let operand_end = match i.checked_sub(1).and_then(|p| tokens.get(p)) {
            Some(prev) if prev.is_keyword("NOT") => i - 1,
            _ => i,
        };
        found.push(WildcardMatch {
            column: refs.iter().find(|r| r.is_bare() && r.end == operand_end).cloned(),
            pattern: pattern.clone(),
        });
    }
    found
}

/// `col [NOT] IN (SELECT ...)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InSubquery {
    pub column: ColumnRef,
    pub negated: bool,
    /// Tokens between the parentheses
    pub subquery: Vec<Token>,
    /// Token range of the whole `col [NOT] IN (...)` expression
    pub start: usize,
    pub end: usize,
}

pub fn in_subqueries(tokens: &[Token], refs: &[ColumnRef]) -> Vec<InSubquery> {
    let mut found = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        if !token.is_keyword("IN")
            || !matches!(tokens.get(i + 1), Some(Token::LParen))
            || !tokens.get(i + 2).is_some_and(|t| t.is_keyword("SELECT"))
        {
            continue;
        }
        let negated = i
            .checked_sub(1)
            .and_then(|p| tokens.get(p))
            .is_some_and(|t| t.is_keyword("NOT"));
        let operand_end = if negated { i - 1 } else { i };
        let Some(column) = refs.iter().find(|r| r.is_bare() && r.end == operand_end) else {
            continue;
        };
        let close = matching_paren(tokens, i + 1);
        found.push(InSubquery {
            column: column.clone(),
            negated,
            subquery: tokens[i + 2..close.min(tokens.len())].to_vec(),
            start: column.start,
            end: (close + 1).min(tokens.len()),
        });
    }
    found
}
