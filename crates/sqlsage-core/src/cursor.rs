//! Forward-only cursor over a token slice

use crate::Token;

/// Cursor used by the DDL and query parsers to walk a statement
#[derive(Debug, Clone)]
pub struct TokenCursor<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> TokenCursor<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    pub fn peek_nth(&self, n: usize) -> Option<&'t Token> {
        self.tokens.get(self.pos + n)
    }

    pub fn advance(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    pub fn is_done(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Tokens from `start` up to the current position
    pub fn since(&self, start: usize) -> &'t [Token] {
        &self.tokens[start.min(self.pos)..self.pos]
    }

    /// Remaining tokens
    pub fn rest(&self) -> &'t [Token] {
        &self.tokens[self.pos.min(self.tokens.len())..]
    }

    pub fn at_keyword(&self, keyword: &str) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(keyword))
    }

    pub fn at_any_keyword(&self, keywords: &[&str]) -> bool {
        self.peek().is_some_and(|t| t.is_any_keyword(keywords))
    }

    pub fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consumes the whole keyword sequence, or nothing
    pub fn eat_keywords(&mut self, keywords: &[&str]) -> bool {
        let matches = keywords
            .iter()
            .enumerate()
            .all(|(i, kw)| self.peek_nth(i).is_some_and(|t| t.is_keyword(kw)));
        if matches {
            self.pos += keywords.len();
        }
        matches
    }

    /// Consumes one of `keywords` and returns the matched word
    pub fn eat_any_keyword(&mut self, keywords: &[&str]) -> Option<&'t str> {
        match self.peek() {
            Some(Token::Word(word)) if keywords.iter().any(|kw| kw.eq_ignore_ascii_case(word)) => {
                self.pos += 1;
                Some(word)
            }
            _ => None,
        }
    }

    pub fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consumes a bare or quoted name. Reserved words are accepted.
    pub fn name(&mut self) -> Option<String> {
        match self.peek()? {
            Token::Word(w) | Token::QuotedIdent(w) => {
                self.pos += 1;
                Some(w.clone())
            }
            _ => None,
        }
    }

    /// Consumes a dotted name such as `schema.table` and returns its parts
    pub fn qualified_name(&mut self) -> Option<Vec<String>> {
        let mut parts = vec![self.name()?];
        while matches!(self.peek(), Some(Token::Dot))
            && matches!(self.peek_nth(1), Some(Token::Word(_) | Token::QuotedIdent(_)))
        {
            self.pos += 1;
            parts.extend(self.name());
        }
        Some(parts)
    }

    /// Consumes a parenthesized group and returns its inner tokens.
    ///
    /// An unterminated group runs to the end of the slice.
    pub fn group(&mut self) -> Option<&'t [Token]> {
        if !matches!(self.peek(), Some(Token::LParen)) {
            return None;
        }
        let start = self.pos + 1;
        let mut depth = 0usize;
        for (offset, token) in self.tokens[self.pos..].iter().enumerate() {
            match token {
                Token::LParen => depth += 1,
                Token::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        let end = self.pos + offset;
                        self.pos = end + 1;
                        return Some(&self.tokens[start..end]);
                    }
                }
                _ => {}
            }
        }
        self.pos = self.tokens.len();
        Some(&self.tokens[start..])
    }

    /// Skips one token, or a whole parenthesized group
    pub fn skip_item(&mut self) {
        if self.group().is_none() {
            self.advance();
        }
    }
}
