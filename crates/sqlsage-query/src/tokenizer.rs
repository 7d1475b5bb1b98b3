//! Clause segmentation of SELECT statements
//!
//! The tokenizer does not build an expression tree. It locates the clause
//! keywords at parenthesis depth 0, so subqueries and function arguments are
//! never split, and keeps every expression as normalized text.

use sqlsage_core::{
    MalformedQueryError, Token, TokenCursor, render_tokens, split_top_level, tokenize,
};

use crate::query::{
    CommonTableExpr, CompoundBranch, JoinKind, JoinSpec, SetOperator, TableRef, TokenizedQuery,
};

/// Keyword sequences that introduce a join, longest forms first
const JOIN_FORMS: &[(&[&str], JoinKind)] = &[
    (&["JOIN"], JoinKind::Inner),
    (&["INNER", "JOIN"], JoinKind::Inner),
    (&["STRAIGHT_JOIN"], JoinKind::Inner),
    (&["LEFT", "OUTER", "JOIN"], JoinKind::Left),
    (&["LEFT", "JOIN"], JoinKind::Left),
    (&["RIGHT", "OUTER", "JOIN"], JoinKind::Right),
    (&["RIGHT", "JOIN"], JoinKind::Right),
    (&["FULL", "OUTER", "JOIN"], JoinKind::Full),
    (&["FULL", "JOIN"], JoinKind::Full),
    (&["CROSS", "JOIN"], JoinKind::Cross),
    (&["NATURAL", "JOIN"], JoinKind::Natural),
    (&["NATURAL", "LEFT", "OUTER", "JOIN"], JoinKind::Natural),
    (&["NATURAL", "LEFT", "JOIN"], JoinKind::Natural),
    (&["NATURAL", "RIGHT", "OUTER", "JOIN"], JoinKind::Natural),
    (&["NATURAL", "RIGHT", "JOIN"], JoinKind::Natural),
    (&["NATURAL", "INNER", "JOIN"], JoinKind::Natural),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clause {
    Select,
    From,
    Where,
    GroupBy,
    Having,
    OrderBy,
    Limit,
    Offset,
    Fetch,
}

/// Segments SQL text into a [`TokenizedQuery`]
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryTokenizer;

impl QueryTokenizer {
    /// Parse the first statement of `query_text`.
    ///
    /// Fails only when no top-level `SELECT` can be found.
    pub fn parse(query_text: &str) -> Result<TokenizedQuery, MalformedQueryError> {
        let tokens = tokenize(query_text);
        let statements = split_top_level(&tokens, |t| matches!(t, Token::Semicolon));
        let mut statements = statements.into_iter().filter(|s| !s.is_empty());
        let statement = statements.next().unwrap_or_default();
        if statements.next().is_some() {
            tracing::debug!("query text holds several statements, analyzing the first");
        }

        let query = parse_statement(unwrap_parens(statement))?;
        tracing::debug!(
            tables = query.table_count(),
            joins = query.joins.len(),
            predicates = query.predicates.len(),
            branches = query.compound.len(),
            "tokenized query"
        );
        Ok(query)
    }
}

/// Strips parentheses wrapping the whole statement
fn unwrap_parens(mut tokens: &[Token]) -> &[Token] {
    loop {
        let mut cur = TokenCursor::new(tokens);
        match cur.group() {
            Some(inner) if cur.is_done() => tokens = inner,
            _ => return tokens,
        }
    }
}

fn parse_statement(tokens: &[Token]) -> Result<TokenizedQuery, MalformedQueryError> {
    let mut cur = TokenCursor::new(tokens);
    let mut ctes = Vec::new();
    let mut recursive = false;
    if cur.eat_keyword("WITH") {
        recursive = cur.eat_keyword("RECURSIVE");
        parse_ctes(&mut cur, &mut ctes);
    }

    let rest = cur.rest();
    // a leading group is the first compound branch, never a prefix to skip
    let leading_group = matches!(rest.first(), Some(Token::LParen));
    let start = if leading_group {
        0
    } else {
        top_level_position(rest, |t| t.is_keyword("SELECT"))
            .ok_or_else(|| MalformedQueryError::new("no top-level SELECT found"))?
    };
    if start > 0 {
        tracing::trace!(skipped = start, "ignoring tokens before SELECT");
    }

    let mut segments = split_compound(&rest[start..]).into_iter();
    let (_, first) = segments
        .next()
        .ok_or_else(|| MalformedQueryError::new("no top-level SELECT found"))?;
    let mut query = if leading_group {
        parse_select(unwrap_parens(first)).map_err(|_| {
            MalformedQueryError::new("leading parenthesized group is not a SELECT")
        })?
    } else {
        parse_select(first)?
    };
    for (operator, segment) in segments {
        let branch = parse_select(unwrap_parens(segment)).map_err(|_| {
            MalformedQueryError::new(format!("{} is not followed by a SELECT", operator.as_sql()))
        })?;
        query.compound.push(CompoundBranch {
            operator,
            query: branch,
        });
    }

    query.ctes = ctes;
    query.recursive = recursive;
    Ok(query)
}

/// Reads `name [(cols)] AS [NOT MATERIALIZED] (body), ...`. Stops quietly at
/// the first malformed entry.
fn parse_ctes(cur: &mut TokenCursor<'_>, ctes: &mut Vec<CommonTableExpr>) {
    loop {
        if cur.at_keyword("SELECT") {
            return;
        }
        let Some(name) = cur.name() else { return };
        if matches!(cur.peek(), Some(Token::LParen)) {
            cur.group();
        }
        if !cur.eat_keyword("AS") {
            return;
        }
        if !cur.eat_keywords(&["NOT", "MATERIALIZED"]) {
            cur.eat_keyword("MATERIALIZED");
        }
        let Some(body) = cur.group() else { return };
        ctes.push(CommonTableExpr {
            name,
            body: render_tokens(body),
        });
        if !cur.eat(&Token::Comma) {
            return;
        }
    }
}

fn top_level_position(tokens: &[Token], pred: impl Fn(&Token) -> bool) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            _ if depth == 0 && pred(token) => return Some(i),
            _ => {}
        }
    }
    None
}

/// Splits on top-level set operators. The first segment carries a
/// placeholder operator that callers ignore.
fn split_compound(tokens: &[Token]) -> Vec<(SetOperator, &[Token])> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut operator = SetOperator::Union;
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            _ if depth == 0 && token.is_any_keyword(&["UNION", "INTERSECT", "EXCEPT", "MINUS"]) => {
                segments.push((operator, &tokens[start..i]));
                let quantifier = tokens.get(i + 1);
                let all = quantifier.is_some_and(|t| t.is_keyword("ALL"));
                operator = if token.is_keyword("UNION") {
                    if all { SetOperator::UnionAll } else { SetOperator::Union }
                } else if token.is_keyword("INTERSECT") {
                    SetOperator::Intersect
                } else {
                    SetOperator::Except
                };
                if quantifier.is_some_and(|t| t.is_any_keyword(&["ALL", "DISTINCT"])) {
                    i += 1;
                }
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    segments.push((operator, &tokens[start..]));
    segments
}

/// Splits a single SELECT into clause bodies (keywords removed)
fn segment_clauses(tokens: &[Token]) -> Vec<(Clause, &[Token])> {
    let mut clauses: Vec<(Clause, usize, usize)> = Vec::new();
    let mut current = (Clause::Select, 1usize);
    let mut depth = 0usize;
    let mut i = 1;
    while i < tokens.len() {
        let token = &tokens[i];
        let next_is_by = tokens.get(i + 1).is_some_and(|t| t.is_keyword("BY"));
        let started = match token {
            Token::LParen => {
                depth += 1;
                None
            }
            Token::RParen => {
                depth = depth.saturating_sub(1);
                None
            }
            _ if depth > 0 => None,
            _ if token.is_keyword("FROM") => {
                // `IS DISTINCT FROM` belongs to an expression
                let after_distinct = i > 0 && tokens[i - 1].is_keyword("DISTINCT");
                (!after_distinct).then_some((Clause::From, 1))
            }
            _ if token.is_keyword("WHERE") => Some((Clause::Where, 1)),
            _ if token.is_keyword("GROUP") && next_is_by => Some((Clause::GroupBy, 2)),
            _ if token.is_keyword("HAVING") => Some((Clause::Having, 1)),
            _ if token.is_keyword("ORDER") && next_is_by => Some((Clause::OrderBy, 2)),
            _ if token.is_keyword("LIMIT") => Some((Clause::Limit, 1)),
            _ if token.is_keyword("OFFSET") => Some((Clause::Offset, 1)),
            _ if token.is_keyword("FETCH") => Some((Clause::Fetch, 1)),
            _ => None,
        };

        match started {
            Some((clause, width))
                if clause != current.0 && !clauses.iter().any(|(c, _, _)| *c == clause) =>
            {
                clauses.push((current.0, current.1, i));
                current = (clause, i + width);
                i += width;
            }
            _ => i += 1,
        }
    }
    clauses.push((current.0, current.1, tokens.len()));

    clauses
        .into_iter()
        .map(|(clause, start, end)| (clause, &tokens[start.min(end)..end]))
        .collect()
}

fn parse_select(tokens: &[Token]) -> Result<TokenizedQuery, MalformedQueryError> {
    if !tokens.first().is_some_and(|t| t.is_keyword("SELECT")) {
        return Err(MalformedQueryError::new("no top-level SELECT found"));
    }

    let mut query = TokenizedQuery::default();
    let mut top = None;
    for (clause, body) in segment_clauses(tokens) {
        match clause {
            Clause::Select => top = parse_select_list(body, &mut query),
            Clause::From => parse_from(body, &mut query),
            Clause::Where => query.predicates = split_predicates(body),
            Clause::GroupBy => query.group_by = split_list(body),
            Clause::Having => {
                query.having = (!body.is_empty()).then(|| render_tokens(body));
            }
            Clause::OrderBy => query.order_by = split_list(body),
            Clause::Limit => parse_limit(body, &mut query),
            Clause::Offset => {
                query.offset = match body.first() {
                    Some(Token::Number(n)) => n.parse().ok(),
                    _ => None,
                };
            }
            Clause::Fetch => {
                let rows = body.iter().find_map(|t| match t {
                    Token::Number(n) => n.parse().ok(),
                    _ => None,
                });
                query.limit = Some(rows.unwrap_or(1));
            }
        }
    }
    if !query.has_limit() {
        query.limit = top;
    }

    for table in query.table_refs().cloned().collect::<Vec<_>>() {
        if let Some(alias) = &table.alias {
            query.aliases.insert(alias.to_lowercase(), table.name.clone());
        }
    }
    Ok(query)
}

/// Parses `[DISTINCT|ALL] [TOP n] items`. Returns the TOP row count.
fn parse_select_list(body: &[Token], query: &mut TokenizedQuery) -> Option<u64> {
    let mut cur = TokenCursor::new(body);
    if cur.eat_keyword("DISTINCT") {
        query.distinct = true;
        if cur.eat_keyword("ON") {
            cur.group();
        }
    } else {
        cur.eat_keyword("ALL");
    }

    let mut top = None;
    if cur.eat_keyword("TOP") {
        top = match cur.peek() {
            Some(Token::LParen) => cur.group().and_then(|inner| match inner {
                [Token::Number(n)] => n.parse().ok(),
                _ => None,
            }),
            Some(Token::Number(n)) => {
                cur.advance();
                n.parse().ok()
            }
            _ => None,
        };
        cur.eat_keyword("PERCENT");
        cur.eat_keywords(&["WITH", "TIES"]);
    }

    query.select = split_list(cur.rest());
    top
}

fn split_list(tokens: &[Token]) -> Vec<String> {
    split_top_level(tokens, |t| matches!(t, Token::Comma))
        .into_iter()
        .filter(|part| !part.is_empty())
        .map(render_tokens)
        .collect()
}

fn parse_limit(body: &[Token], query: &mut TokenizedQuery) {
    match body {
        [Token::Number(n)] => match n.parse() {
            Ok(limit) => query.limit = Some(limit),
            Err(_) => query.limit_expr = Some(n.clone()),
        },
        // MySQL `LIMIT offset, count`
        [Token::Number(offset), Token::Comma, Token::Number(count)] => {
            query.offset = offset.parse().ok();
            match count.parse() {
                Ok(limit) => query.limit = Some(limit),
                Err(_) => query.limit_expr = Some(count.clone()),
            }
        }
        [] => {}
        [token] if token.is_any_keyword(&["ALL", "NULL"]) => {}
        _ => query.limit_expr = Some(render_tokens(body)),
    }
}

fn at_join_start(cur: &TokenCursor<'_>) -> bool {
    JOIN_FORMS.iter().any(|(words, _)| {
        words
            .iter()
            .enumerate()
            .all(|(i, word)| cur.peek_nth(i).is_some_and(|t| t.is_keyword(word)))
    })
}

fn eat_join(cur: &mut TokenCursor<'_>) -> Option<JoinKind> {
    JOIN_FORMS
        .iter()
        .find_map(|(words, kind)| cur.eat_keywords(words).then_some(*kind))
}

fn parse_from(body: &[Token], query: &mut TokenizedQuery) {
    let mut cur = TokenCursor::new(body);
    query.from.extend(parse_table_ref(&mut cur));

    while let Some(token) = cur.peek() {
        if cur.eat(&Token::Comma) {
            query.from.extend(parse_table_ref(&mut cur));
            continue;
        }
        let Some(kind) = eat_join(&mut cur) else {
            tracing::trace!(token = %token, "skipping unexpected token in FROM");
            cur.skip_item();
            continue;
        };
        let Some(table) = parse_table_ref(&mut cur) else {
            continue;
        };

        let mut join = JoinSpec {
            kind,
            table,
            condition: None,
            using: Vec::new(),
        };
        if cur.eat_keyword("ON") {
            let start = cur.position();
            while !cur.is_done() && !at_join_start(&cur) && !matches!(cur.peek(), Some(Token::Comma))
            {
                cur.skip_item();
            }
            let condition = cur.since(start);
            if !condition.is_empty() {
                join.condition = Some(render_tokens(condition));
            }
        } else if cur.eat_keyword("USING") {
            if let Some(columns) = cur.group() {
                join.using = split_top_level(columns, |t| matches!(t, Token::Comma))
                    .into_iter()
                    .filter_map(|part| match part {
                        [Token::Word(name) | Token::QuotedIdent(name)] => Some(name.clone()),
                        _ => None,
                    })
                    .collect();
            }
        }
        query.joins.push(join);
    }
}

fn parse_table_ref(cur: &mut TokenCursor<'_>) -> Option<TableRef> {
    cur.eat_keyword("LATERAL");
    let mut table = match cur.peek()? {
        Token::LParen => {
            let inner = cur.group()?;
            TableRef {
                name: format!("({})", render_tokens(inner)),
                schema: None,
                alias: None,
                derived: true,
            }
        }
        Token::Word(_) | Token::QuotedIdent(_) if !at_join_start(cur) => {
            let mut parts = cur.qualified_name()?;
            if let Some(Token::LParen) = cur.peek() {
                let args = cur.group().map(render_tokens).unwrap_or_default();
                TableRef {
                    name: format!("{}({})", parts.join("."), args),
                    schema: None,
                    alias: None,
                    derived: true,
                }
            } else {
                let name = parts.pop()?;
                TableRef {
                    name,
                    schema: parts.pop(),
                    alias: None,
                    derived: false,
                }
            }
        }
        _ => return None,
    };

    if cur.eat_keyword("AS") {
        table.alias = cur.name();
    } else if !at_join_start(cur) {
        if let Some(alias) = cur.peek().and_then(Token::identifier) {
            table.alias = Some(alias.to_string());
            cur.advance();
        }
    }
    // column alias list: `AS t (a, b)`
    if table.alias.is_some() && matches!(cur.peek(), Some(Token::LParen)) {
        cur.group();
    }
    Some(table)
}

/// Splits WHERE on top-level AND. A top-level OR keeps the whole clause as
/// one predicate, since its conjuncts are not independent.
fn split_predicates(tokens: &[Token]) -> Vec<String> {
    let mut depth = 0usize;
    let mut case_depth = 0usize;
    let mut between_pending = false;
    let mut has_or = false;
    let mut cuts = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            _ if depth > 0 => {}
            _ if token.is_keyword("CASE") => case_depth += 1,
            _ if token.is_keyword("END") => case_depth = case_depth.saturating_sub(1),
            _ if case_depth > 0 => {}
            _ if token.is_keyword("BETWEEN") => between_pending = true,
            _ if token.is_keyword("AND") => {
                if between_pending {
                    between_pending = false;
                } else {
                    cuts.push(i);
                }
            }
            _ if token.is_keyword("OR") => has_or = true,
            _ => {}
        }
    }

    if has_or {
        return if tokens.is_empty() {
            Vec::new()
        } else {
            vec![render_tokens(tokens)]
        };
    }

    let mut predicates = Vec::new();
    let mut start = 0;
    for cut in cuts.into_iter().chain(std::iter::once(tokens.len())) {
        let part = &tokens[start..cut];
        if !part.is_empty() {
            predicates.push(render_tokens(part));
        }
        start = cut + 1;
    }
    predicates
}

#[cfg(test)]
mod tests;
