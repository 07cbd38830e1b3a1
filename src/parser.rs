// src/parser.rs
use crate::errors::ContextError;

#[derive(Debug, PartialEq)]
pub enum ParseError {
    InvalidSyntax(String),
}

impl From<String> for ParseError {
    fn from(msg: String) -> Self {
        ParseError::InvalidSyntax(msg)
    }
}

impl From<ParseError> for ContextError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::InvalidSyntax(msg) => ContextError::Parse(msg),
        }
    }
}

/// Lexical unit of a filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LParen,
    RParen,
    /// Bare word, possibly with embedded quoted sections (`project:'My Work'`).
    Word(String),
    /// Word that was quoted in its entirety; never an operator or attribute.
    Literal(String),
}

/// Character cursor over a single filter string.
pub struct Parser<'a> {
    s: &'a str,
    i: usize,
}

impl<'a> Parser<'a> {
    pub fn new(s: &'a str) -> Self {
        Self { s, i: 0 }
    }

    /// Splits the whole input into tokens. Parentheses always stand alone,
    /// even when glued to a word: `(+home` is `(` followed by `+home`.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, ParseError> {
        let mut out = Vec::new();
        loop {
            self.skip_ws();
            match self.peek_char() {
                None => break,
                Some('(') => {
                    self.i += 1;
                    out.push(Token::LParen);
                }
                Some(')') => {
                    self.i += 1;
                    out.push(Token::RParen);
                }
                Some(_) => out.push(self.parse_word()?),
            }
        }
        Ok(out)
    }

    fn parse_word(&mut self) -> Result<Token, ParseError> {
        let mut text = String::new();
        let mut fully_quoted = true;
        let mut pieces = 0;
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() || c == '(' || c == ')' {
                break;
            }
            if c == '\'' || c == '"' {
                text.push_str(&self.parse_quoted_string()?);
            } else {
                fully_quoted = false;
                text.push(c);
                self.i += c.len_utf8();
            }
            pieces += 1;
        }
        if fully_quoted && pieces == 1 {
            Ok(Token::Literal(text))
        } else {
            Ok(Token::Word(text))
        }
    }

    pub fn parse_identifier(&mut self) -> Result<String, ParseError> {
        let start = self.i;
        while let Some(c) = self.peek_char() {
            if c == '_' || c.is_ascii_alphanumeric() {
                self.i += 1;
            } else {
                break;
            }
        }
        if self.i == start {
            return Err(ParseError::InvalidSyntax("identifier expected".into()));
        }
        Ok(self.s[start..self.i].to_string())
    }

    pub fn parse_int(&mut self) -> Result<u64, ParseError> {
        let start = self.i;
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.i += 1;
            } else {
                break;
            }
        }
        if self.i == start {
            return Err(ParseError::InvalidSyntax("expected integer".into()));
        }
        self.s[start..self.i]
            .parse::<u64>()
            .map_err(|_| ParseError::InvalidSyntax("bad integer".into()))
    }

    pub fn parse_quoted_string(&mut self) -> Result<String, ParseError> {
        let quote = self
            .peek_char()
            .ok_or_else(|| ParseError::InvalidSyntax("string".into()))?;
        if quote != '\'' && quote != '"' {
            return Err(ParseError::InvalidSyntax("expected quoted string".into()));
        }
        self.i += 1;
        let mut out = String::new();
        while let Some(c) = self.peek_char() {
            self.i += c.len_utf8();
            if c == quote {
                return Ok(out);
            }
            if c == '\\' {
                if let Some(nc) = self.peek_char() {
                    self.i += nc.len_utf8();
                    match nc {
                        '\\' => out.push('\\'),
                        '"' => out.push('"'),
                        '\'' => out.push('\''),
                        _ => {
                            out.push('\\');
                            out.push(nc);
                        }
                    }
                } else {
                    break;
                }
            } else {
                out.push(c);
            }
        }
        Err(ParseError::InvalidSyntax("unterminated string".into()))
    }

    pub fn consume_char(&mut self, c: char) -> bool {
        if self.peek_char() == Some(c) {
            self.i += c.len_utf8();
            true
        } else {
            false
        }
    }

    pub fn peek_char(&self) -> Option<char> {
        self.s[self.i..].chars().next()
    }

    /// Everything not yet consumed.
    pub fn rest(&self) -> &'a str {
        &self.s[self.i..]
    }

    pub fn skip_ws(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.i += c.len_utf8();
            } else {
                break;
            }
        }
    }

    pub fn eof(&self) -> bool {
        self.i >= self.s.len()
    }
}

/// Joins shell arguments into filter text. An argument that holds
/// whitespace or a quote is re-quoted so it stays one word; for an
/// `attr:value` argument only the value is quoted.
pub fn join_args<S: AsRef<str>>(args: &[S]) -> String {
    args.iter()
        .map(|a| quote_arg(a.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote_arg(arg: &str) -> String {
    if !arg.contains(|c: char| c.is_whitespace() || c == '\'' || c == '"') {
        return arg.to_string();
    }
    let split = attribute_prefix_len(arg);
    let (prefix, value) = arg.split_at(split);
    let mut out = String::with_capacity(arg.len() + 2);
    out.push_str(prefix);
    out.push('\'');
    for c in value.chars() {
        if c == '\'' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

// Length of a leading `name[.modifier]:` or `name=`, or 0.
fn attribute_prefix_len(arg: &str) -> usize {
    let mut p = Parser::new(arg);
    if p.parse_identifier().is_err() {
        return 0;
    }
    if p.consume_char('.') && p.parse_identifier().is_err() {
        return 0;
    }
    if p.consume_char(':') || p.consume_char('=') {
        p.i
    } else {
        0
    }
}
