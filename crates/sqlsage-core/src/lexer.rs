//! SQL Lexer shared by schema parsing and query tokenization
//!
//! The lexer never fails: unknown characters become single-character
//! operators and unterminated literals run to the end of input. It handles:
//! - Line (`--`, `#`) and block (`/* */`) comments
//! - String literals with doubled-quote escapes
//! - Quoted identifiers in ANSI (`"x"`), MySQL (`` `x` ``) and SQL Server (`[x]`) style
//! - Bind parameters (`?`, `:name`, `$1`, `@name`)
//!
//! [`render_tokens`] turns a token slice back into canonical SQL text. Lexing
//! rendered text yields the same tokens, which is what makes clause
//! normalization idempotent.

use std::fmt;

/// Reserved words that are upper-cased when rendering.
const KEYWORDS: &[&str] = &[
    "ALL", "AND", "ANY", "AS", "ASC", "BETWEEN", "BY", "CASE", "CROSS", "DESC", "DISTINCT", "ELSE",
    "END", "EXCEPT", "EXISTS", "FALSE", "FROM", "FULL", "GROUP", "HAVING", "ILIKE", "IN", "INNER",
    "INTERSECT", "IS", "JOIN", "LEFT", "LIKE", "LIMIT", "NATURAL", "NOT", "NULL", "OFFSET", "ON",
    "OR", "ORDER", "OUTER", "RECURSIVE", "RIGHT", "SELECT", "SOME", "THEN", "TOP", "TRUE", "UNION",
    "USING", "WHEN", "WHERE", "WITH",
];

/// Returns true if `word` is a reserved SQL keyword (case-insensitive).
pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.iter().any(|kw| kw.eq_ignore_ascii_case(word))
}

/// Quote an identifier only when it cannot be written bare
pub fn quote_ident(name: &str) -> String {
    let bare = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !is_keyword(name);
    if bare {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// A lexical SQL token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    /// Bare identifier or keyword, original case preserved
    Word(String),
    /// Quoted identifier (`"x"`, `` `x` ``, `[x]`), quotes removed
    QuotedIdent(String),
    /// String literal, quotes removed and escapes resolved
    Str(String),
    /// Numeric literal
    Number(String),
    /// Bind parameter (`?`, `:name`, `$1`, `@name`)
    Param(String),
    /// Operator (`=`, `<>`, `>=`, `||`, `::`, ...)
    Op(String),
    Star,
    LParen,
    RParen,
    Comma,
    Dot,
    Semicolon,
}

impl Token {
    /// Returns true if this is a bare word equal to `keyword` (case-insensitive)
    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Word(w) if w.eq_ignore_ascii_case(keyword))
    }

    /// Returns true if this is a bare word matching any of `keywords`
    pub fn is_any_keyword(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|kw| self.is_keyword(kw))
    }

    /// Returns the identifier text for bare (non-reserved) or quoted identifiers
    pub fn identifier(&self) -> Option<&str> {
        match self {
            Token::Word(w) if !is_keyword(w) => Some(w),
            Token::QuotedIdent(w) => Some(w),
            _ => None,
        }
    }

    /// Returns the operator text if this is an operator
    pub fn operator(&self) -> Option<&str> {
        match self {
            Token::Op(op) => Some(op),
            _ => None,
        }
    }

    /// Renders the token as canonical SQL text
    pub fn to_sql(&self) -> String {
        match self {
            Token::Word(w) if is_keyword(w) => w.to_ascii_uppercase(),
            Token::Word(w) => w.clone(),
            Token::QuotedIdent(w) => format!("\"{}\"", w.replace('"', "\"\"")),
            Token::Str(s) => format!("'{}'", s.replace('\'', "''")),
            Token::Number(n) | Token::Param(n) | Token::Op(n) => n.clone(),
            Token::Star => "*".to_string(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
            Token::Comma => ",".to_string(),
            Token::Dot => ".".to_string(),
            Token::Semicolon => ";".to_string(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

/// Forgiving SQL lexer
pub struct SqlLexer<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> SqlLexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, position: 0 }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token() {
            tokens.push(token);
        }
        tokens
    }

    /// Get the next token, or `None` at end of input
    pub fn next_token(&mut self) -> Option<Token> {
        self.skip_whitespace_and_comments();
        if self.is_eof() {
            return None;
        }

        let ch = self.current_char();
        let token = match ch {
            '\'' => Token::Str(self.read_delimited('\'', '\'')),
            '"' => Token::QuotedIdent(self.read_delimited('"', '"')),
            '`' => Token::QuotedIdent(self.read_delimited('`', '`')),
            '[' => Token::QuotedIdent(self.read_delimited('[', ']')),
            '(' => self.single(Token::LParen),
            ')' => self.single(Token::RParen),
            ',' => self.single(Token::Comma),
            ';' => self.single(Token::Semicolon),
            '*' => self.single(Token::Star),
            '.' if self.peek_char(1).is_ascii_digit() => Token::Number(self.read_number()),
            '.' => self.single(Token::Dot),
            '?' => {
                self.advance();
                Token::Param("?".to_string())
            }
            ':' if self.peek_char(1) == ':' => {
                self.advance();
                self.advance();
                Token::Op("::".to_string())
            }
            ':' | '@' | '$' if is_ident_char(self.peek_char(1)) => {
                self.advance();
                let name = self.read_word();
                Token::Param(format!("{}{}", ch, name))
            }
            c if c.is_ascii_digit() => Token::Number(self.read_number()),
            c if c.is_alphabetic() || c == '_' => Token::Word(self.read_word()),
            _ => Token::Op(self.read_operator()),
        };
        Some(token)
    }

    fn single(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    fn current_char(&self) -> char {
        self.input[self.position..].chars().next().unwrap_or('\0')
    }

    fn peek_char(&self, offset: usize) -> char {
        self.input[self.position..].chars().nth(offset).unwrap_or('\0')
    }

    fn advance(&mut self) {
        if let Some(ch) = self.input[self.position..].chars().next() {
            self.position += ch.len_utf8();
        }
    }

    fn is_eof(&self) -> bool {
        self.position >= self.input.len()
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            let ch = self.current_char();
            if self.is_eof() {
                return;
            }
            if ch.is_whitespace() {
                self.advance();
            } else if (ch == '-' && self.peek_char(1) == '-') || ch == '#' {
                while !self.is_eof() && self.current_char() != '\n' {
                    self.advance();
                }
            } else if ch == '/' && self.peek_char(1) == '*' {
                self.advance();
                self.advance();
                while !self.is_eof() && !(self.current_char() == '*' && self.peek_char(1) == '/') {
                    self.advance();
                }
                // closing */
                self.advance();
                self.advance();
            } else {
                return;
            }
        }
    }

    /// Reads a quoted run. A doubled closing quote is an escaped quote.
    fn read_delimited(&mut self, open: char, close: char) -> String {
        debug_assert_eq!(self.current_char(), open);
        self.advance();
        let mut text = String::new();
        while !self.is_eof() {
            let ch = self.current_char();
            if ch == close {
                if self.peek_char(1) == close {
                    text.push(ch);
                    self.advance();
                    self.advance();
                    continue;
                }
                self.advance();
                break;
            }
            text.push(ch);
            self.advance();
        }
        text
    }

    fn read_word(&mut self) -> String {
        let start = self.position;
        while !self.is_eof() && is_ident_char(self.current_char()) {
            self.advance();
        }
        self.input[start..self.position].to_string()
    }

    fn read_number(&mut self) -> String {
        let start = self.position;
        let mut seen_dot = false;
        while !self.is_eof() {
            let ch = self.current_char();
            if ch.is_ascii_digit() {
                self.advance();
            } else if ch == '.' && !seen_dot && self.peek_char(1) != '.' {
                seen_dot = true;
                self.advance();
            } else if (ch == 'e' || ch == 'E')
                && (self.peek_char(1).is_ascii_digit()
                    || (matches!(self.peek_char(1), '+' | '-') && self.peek_char(2).is_ascii_digit()))
            {
                self.advance();
                self.advance();
            } else {
                break;
            }
        }
        self.input[start..self.position].to_string()
    }

    fn read_operator(&mut self) -> String {
        let ch = self.current_char();
        let next = self.peek_char(1);
        let pair: String = [ch, next].iter().collect();
        if matches!(pair.as_str(), "<=" | ">=" | "<>" | "!=" | "||" | "=>" | "->") {
            self.advance();
            self.advance();
            return pair;
        }
        self.advance();
        ch.to_string()
    }
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

/// Convenience wrapper: lex `input` into tokens
pub fn tokenize(input: &str) -> Vec<Token> {
    SqlLexer::new(input).tokenize()
}

/// Renders tokens as canonical SQL with normalized spacing and keyword case.
pub fn render_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut prev: Option<&Token> = None;
    for token in tokens {
        if let Some(prev) = prev {
            if needs_space(prev, token) {
                out.push(' ');
            }
        }
        out.push_str(&token.to_sql());
        prev = Some(token);
    }
    out
}

fn needs_space(prev: &Token, next: &Token) -> bool {
    if matches!(next, Token::Comma | Token::RParen | Token::Dot | Token::Semicolon) {
        return false;
    }
    if matches!(prev, Token::LParen | Token::Dot) {
        return false;
    }
    if prev.operator() == Some("::") || next.operator() == Some("::") {
        return false;
    }
    // function call: `count(` rather than `count (`
    if matches!(next, Token::LParen) {
        return match prev {
            Token::Word(w) => is_keyword(w),
            Token::QuotedIdent(_) => false,
            _ => true,
        };
    }
    true
}

/// Splits `tokens` on every depth-0 token for which `is_separator` holds.
///
/// Separators are dropped. Empty segments are kept so callers can detect
/// stray separators.
pub fn split_top_level<'t>(
    tokens: &'t [Token],
    is_separator: impl Fn(&Token) -> bool,
) -> Vec<&'t [Token]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            _ if depth == 0 && is_separator(token) => {
                parts.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&tokens[start..]);
    parts
}
