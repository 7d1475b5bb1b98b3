//! Plain-English intent tokenization

/// A token of an intent sentence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentToken {
    /// Lowercase word
    Word(String),
    Number(String),
    /// Quoted value, quotes removed
    Quoted(String),
    /// `=`, `<>`, `!=`, `<`, `>`, `<=`, `>=`
    Comparator(String),
}

/// A word of the normalized intent text, with its byte range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentWord {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Tokenized intent.
///
/// `text` joins the tokens with single spaces (quoted values re-quoted with
/// `'`); the intent patterns match against it. `words` indexes the plain
/// words inside `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intent {
    pub tokens: Vec<IntentToken>,
    pub text: String,
    pub words: Vec<IntentWord>,
}

impl Intent {
    pub fn parse(input: &str) -> Self {
        let tokens = tokenize_intent(input);
        let mut text = String::new();
        let mut words = Vec::new();
        for token in &tokens {
            if !text.is_empty() {
                text.push(' ');
            }
            let start = text.len();
            match token {
                IntentToken::Word(word) => {
                    text.push_str(word);
                    words.push(IntentWord {
                        text: word.clone(),
                        start,
                        end: text.len(),
                    });
                }
                IntentToken::Number(n) | IntentToken::Comparator(n) => text.push_str(n),
                IntentToken::Quoted(value) => {
                    text.push('\'');
                    text.push_str(&value.replace('\'', "''"));
                    text.push('\'');
                }
            }
        }
        Self {
            tokens,
            text,
            words,
        }
    }

    /// Word starting at byte offset `start`, if any
    pub fn word_at(&self, start: usize) -> Option<&IntentWord> {
        self.words.iter().find(|w| w.start == start)
    }
}

fn is_boundary(prev: Option<char>) -> bool {
    prev.is_none_or(|c| c.is_whitespace() || matches!(c, '=' | '<' | '>' | '(' | ','))
}

/// Splits an intent into words, numbers, quoted values and comparators.
///
/// A quote only opens a value at a word boundary, so possessives such as
/// `user's` stay words.
pub fn tokenize_intent(input: &str) -> Vec<IntentToken> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let prev = i.checked_sub(1).map(|p| chars[p]);

        if (c == '\'' || c == '"') && is_boundary(prev) {
            let close = chars[i + 1..].iter().position(|&q| q == c);
            let end = close.map_or(chars.len(), |offset| i + 1 + offset);
            tokens.push(IntentToken::Quoted(chars[i + 1..end].iter().collect()));
            i = end + 1;
        } else if c.is_ascii_digit()
            || (c == '-' && is_boundary(prev) && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit()))
        {
            let start = i;
            i += 1;
            while i < chars.len()
                && (chars[i].is_ascii_digit()
                    || (chars[i] == '.' && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit())))
            {
                i += 1;
            }
            // `3rd`, `2024q1` and similar are words
            if i < chars.len() && (chars[i].is_alphabetic() || chars[i] == '_') {
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(IntentToken::Word(word.to_lowercase()));
            } else {
                tokens.push(IntentToken::Number(chars[start..i].iter().collect()));
            }
        } else if matches!(c, '<' | '>' | '=' | '!') {
            let start = i;
            while i < chars.len() && matches!(chars[i], '<' | '>' | '=' | '!') {
                i += 1;
            }
            let op: String = chars[start..i].iter().collect();
            let op = if op == "==" { "=".to_string() } else { op };
            if matches!(op.as_str(), "=" | "<>" | "!=" | "<" | ">" | "<=" | ">=") {
                tokens.push(IntentToken::Comparator(op));
            }
        } else if c.is_alphanumeric() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            tokens.push(IntentToken::Word(word.to_lowercase()));
            // possessive `'s`
            if chars.get(i) == Some(&'\'') {
                i += 1;
                if chars.get(i).is_some_and(|s| s.eq_ignore_ascii_case(&'s'))
                    && !chars.get(i + 1).is_some_and(|n| n.is_alphanumeric())
                {
                    i += 1;
                }
            }
        } else {
            i += 1;
        }
    }
    tokens
}
