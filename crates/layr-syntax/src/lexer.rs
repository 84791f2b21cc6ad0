//! Lexer for `{{ }}` templates.
//!
//! Text outside delimiters becomes a single [`TokenKind::Text`] token; the
//! inside of every action is split into operands and punctuation. Every
//! token records its byte span so the parser can hand exact directive spans
//! back to callers that splice source text.

use std::fmt;
use std::ops::Range;

use serde_json::Number;

use crate::error::SyntaxError;

/// Byte range into the original source.
pub type Span = Range<usize>;

const LEFT_DELIM: &str = "{{";
const RIGHT_DELIM: &str = "}}";
const LEFT_COMMENT: &str = "/*";
const RIGHT_COMMENT: &str = "*/";

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Text(String),
    LeftDelim,
    RightDelim,
    Identifier(String),
    /// `.A.B`
    Field(Vec<String>),
    /// A lone `.`
    Dot,
    /// `$name.A.B`; the bare `$` has an empty name.
    Variable { name: String, fields: Vec<String> },
    Str(String),
    Number(Number),
    Bool(bool),
    Nil,
    Pipe,
    LeftParen,
    RightParen,
    /// `:=`
    Declare,
    Comma,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub line: usize,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TokenKind::Text(_) => write!(f, "text"),
            TokenKind::LeftDelim => write!(f, "{LEFT_DELIM}"),
            TokenKind::RightDelim => write!(f, "{RIGHT_DELIM}"),
            TokenKind::Identifier(name) => write!(f, "{name}"),
            TokenKind::Field(path) => write!(f, ".{}", path.join(".")),
            TokenKind::Dot => write!(f, "."),
            TokenKind::Variable { name, .. } => write!(f, "${name}"),
            TokenKind::Str(s) => write!(f, "{s:?}"),
            TokenKind::Number(n) => write!(f, "{n}"),
            TokenKind::Bool(b) => write!(f, "{b}"),
            TokenKind::Nil => write!(f, "nil"),
            TokenKind::Pipe => write!(f, "|"),
            TokenKind::LeftParen => write!(f, "("),
            TokenKind::RightParen => write!(f, ")"),
            TokenKind::Declare => write!(f, ":="),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Eof => write!(f, "EOF"),
        }
    }
}

/// Lexer over one template source.
pub struct Lexer<'a> {
    name: &'a str,
    src: &'a str,
    pos: usize,
    line: usize,
    /// Set by a `-}}` marker: strip leading whitespace from the next text.
    trim_next_text: bool,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(name: &'a str, src: &'a str) -> Self {
        Self {
            name,
            src,
            pos: 0,
            line: 1,
            trim_next_text: false,
            tokens: Vec::new(),
        }
    }

    /// Split the whole source into tokens, ending with [`TokenKind::Eof`].
    pub fn tokenize(mut self) -> Result<Vec<Token>, SyntaxError> {
        loop {
            match self.src[self.pos..].find(LEFT_DELIM) {
                None => {
                    self.push_text(self.pos, self.src.len(), false);
                    break;
                }
                Some(offset) => {
                    let start = self.pos + offset;
                    let trim_left = has_trim_marker(&self.src[start + LEFT_DELIM.len()..]);
                    self.push_text(self.pos, start, trim_left);
                    self.lex_action(start, trim_left)?;
                }
            }
        }

        let end = self.src.len();
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            span: end..end,
            line: self.line,
        });
        Ok(self.tokens)
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(self.name, self.line, message)
    }

    fn push(&mut self, kind: TokenKind, span: Span, line: usize) {
        self.tokens.push(Token { kind, span, line });
    }

    fn push_text(&mut self, from: usize, to: usize, trim_right: bool) {
        let line = self.line;
        let raw = &self.src[from..to];
        self.line += raw.matches('\n').count();
        self.pos = to;

        let mut text = raw;
        if std::mem::take(&mut self.trim_next_text) {
            text = text.trim_start_matches(is_space);
        }
        if trim_right {
            text = text.trim_end_matches(is_space);
        }
        if !text.is_empty() {
            self.push(TokenKind::Text(text.to_string()), from..to, line);
        }
    }

    fn lex_action(&mut self, start: usize, trim_left: bool) -> Result<(), SyntaxError> {
        let mut inner = start + LEFT_DELIM.len();
        if trim_left {
            inner += 1;
        }

        // Comments must open right after the delimiter (or after "- ").
        let comment_at = if trim_left { inner + 1 } else { inner };
        if self.src[comment_at.min(self.src.len())..].starts_with(LEFT_COMMENT) {
            return self.lex_comment(comment_at + LEFT_COMMENT.len());
        }

        self.push(TokenKind::LeftDelim, start..inner, self.line);
        self.pos = inner;

        loop {
            let skipped = self.skip_space();
            let rest = &self.src[self.pos..];
            if rest.is_empty() {
                return Err(self.error("unclosed action"));
            }

            if rest.starts_with(RIGHT_DELIM) {
                let end = self.pos + RIGHT_DELIM.len();
                self.push(TokenKind::RightDelim, self.pos..end, self.line);
                self.pos = end;
                return Ok(());
            }
            if skipped && rest.starts_with("-}}") {
                let end = self.pos + 3;
                self.push(TokenKind::RightDelim, self.pos..end, self.line);
                self.pos = end;
                self.trim_next_text = true;
                return Ok(());
            }

            let c = rest.chars().next().unwrap_or_default();
            let next = rest[c.len_utf8()..].chars().next();
            match c {
                '|' => self.single(TokenKind::Pipe),
                '(' => self.single(TokenKind::LeftParen),
                ')' => self.single(TokenKind::RightParen),
                ',' => self.single(TokenKind::Comma),
                ':' if next == Some('=') => {
                    let from = self.pos;
                    self.pos += 2;
                    self.push(TokenKind::Declare, from..self.pos, self.line);
                }
                '"' => self.lex_quote()?,
                '`' => self.lex_raw_quote()?,
                '.' if next.is_some_and(|n| n.is_ascii_digit()) => self.lex_number()?,
                '.' if next.is_some_and(is_ident_start) => {
                    let from = self.pos;
                    let fields = self.lex_field_chain();
                    self.push(TokenKind::Field(fields), from..self.pos, self.line);
                }
                '.' => self.single(TokenKind::Dot),
                '$' => {
                    let from = self.pos;
                    self.pos += 1;
                    let name = self.lex_ident().to_string();
                    let fields = self.lex_field_chain();
                    self.push(TokenKind::Variable { name, fields }, from..self.pos, self.line);
                }
                '-' | '+' if next.is_some_and(|n| n.is_ascii_digit() || n == '.') => {
                    self.lex_number()?
                }
                c if c.is_ascii_digit() => self.lex_number()?,
                c if is_ident_start(c) => {
                    let from = self.pos;
                    let ident = self.lex_ident();
                    let kind = match ident {
                        "true" => TokenKind::Bool(true),
                        "false" => TokenKind::Bool(false),
                        "nil" => TokenKind::Nil,
                        other => TokenKind::Identifier(other.to_string()),
                    };
                    self.push(kind, from..self.pos, self.line);
                }
                other => return Err(self.error(format!("unexpected {other:?} in action"))),
            }
        }
    }

    fn lex_comment(&mut self, body: usize) -> Result<(), SyntaxError> {
        let Some(close) = self.src[body..].find(RIGHT_COMMENT) else {
            return Err(self.error("unclosed comment"));
        };
        let after = body + close + RIGHT_COMMENT.len();
        self.line += self.src[body..after].matches('\n').count();
        self.pos = after;

        let skipped = self.skip_space();
        let rest = &self.src[self.pos..];
        if rest.starts_with(RIGHT_DELIM) {
            self.pos += RIGHT_DELIM.len();
        } else if skipped && rest.starts_with("-}}") {
            self.pos += 3;
            self.trim_next_text = true;
        } else {
            return Err(self.error("comment ends before closing delimiter"));
        }
        Ok(())
    }

    fn single(&mut self, kind: TokenKind) {
        let from = self.pos;
        self.pos += 1;
        self.push(kind, from..self.pos, self.line);
    }

    /// Skip whitespace inside an action; returns whether anything was skipped.
    fn skip_space(&mut self) -> bool {
        let rest = &self.src[self.pos..];
        let trimmed = rest.trim_start_matches(is_space);
        let skipped = rest.len() - trimmed.len();
        self.line += rest[..skipped].matches('\n').count();
        self.pos += skipped;
        skipped > 0
    }

    fn lex_ident(&mut self) -> &'a str {
        let src: &'a str = self.src;
        let rest = &src[self.pos..];
        let len = rest
            .char_indices()
            .find(|&(_, c)| !is_ident_char(c))
            .map_or(rest.len(), |(i, _)| i);
        self.pos += len;
        &rest[..len]
    }

    /// Consume `.a.b.c` starting at a `.`.
    fn lex_field_chain(&mut self) -> Vec<String> {
        let mut fields = Vec::new();
        loop {
            let rest = &self.src[self.pos..];
            let mut chars = rest.chars();
            if chars.next() != Some('.') || !chars.next().is_some_and(is_ident_start) {
                return fields;
            }
            self.pos += 1;
            fields.push(self.lex_ident().to_string());
        }
    }

    fn lex_number(&mut self) -> Result<(), SyntaxError> {
        let from = self.pos;
        let rest = &self.src[from..];
        let mut len = 0;
        let mut prev = '\0';
        for (i, c) in rest.char_indices() {
            let sign = (c == '-' || c == '+') && (i == 0 || prev == 'e' || prev == 'E');
            if !(sign || c.is_ascii_alphanumeric() || c == '.' || c == '_') {
                break;
            }
            prev = c;
            len = i + c.len_utf8();
        }
        let text = &rest[..len];
        self.pos += len;

        let cleaned = text.replace('_', "");
        let number = if let Ok(i) = cleaned.parse::<i64>() {
            Number::from(i)
        } else if let Some(n) = cleaned.parse::<f64>().ok().and_then(Number::from_f64) {
            n
        } else {
            return Err(self.error(format!("bad number syntax: {text:?}")));
        };
        self.push(TokenKind::Number(number), from..self.pos, self.line);
        Ok(())
    }

    fn lex_quote(&mut self) -> Result<(), SyntaxError> {
        let from = self.pos;
        let mut value = String::new();
        let mut chars = self.src[from + 1..].char_indices();
        loop {
            let Some((i, c)) = chars.next() else {
                return Err(self.error("unterminated quoted string"));
            };
            match c {
                '"' => {
                    self.pos = from + 1 + i + 1;
                    break;
                }
                '\n' => return Err(self.error("unterminated quoted string")),
                '\\' => {
                    let escaped = match chars.next().map(|(_, e)| e) {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('0') => '\0',
                        Some('\\') => '\\',
                        Some('"') => '"',
                        Some('\'') => '\'',
                        Some(other) => {
                            return Err(self.error(format!("unknown escape sequence \\{other}")));
                        }
                        None => return Err(self.error("unterminated quoted string")),
                    };
                    value.push(escaped);
                }
                c => value.push(c),
            }
        }
        self.push(TokenKind::Str(value), from..self.pos, self.line);
        Ok(())
    }

    fn lex_raw_quote(&mut self) -> Result<(), SyntaxError> {
        let from = self.pos;
        let body = from + 1;
        let Some(close) = self.src[body..].find('`') else {
            return Err(self.error("unterminated raw quoted string"));
        };
        let value = self.src[body..body + close].to_string();
        let line = self.line;
        self.line += value.matches('\n').count();
        self.pos = body + close + 1;
        self.push(TokenKind::Str(value), from..self.pos, line);
        Ok(())
    }
}

fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_ident_char(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

/// Widen `span`, which starts at a `{{` and ends after a `}}`, over the
/// whitespace its trim markers would remove from the surrounding text.
///
/// Callers that cut or replace source text use this so `{{- ... -}}` keeps
/// its meaning once the action itself is gone.
pub fn trim_extent(src: &str, span: Span) -> Span {
    let action = &src[span.clone()];
    let mut extent = span.clone();
    if has_trim_marker(&action[LEFT_DELIM.len()..]) {
        extent.start = src[..span.start].trim_end_matches(is_space).len();
    }
    let closes_trimmed = action
        .strip_suffix("-}}")
        .is_some_and(|inner| inner.ends_with(is_space));
    if closes_trimmed {
        let after = &src[span.end..];
        extent.end += after.len() - after.trim_start_matches(is_space).len();
    }
    extent
}

/// `{{- ` trims; `{{-3}}` is a negative number.
fn has_trim_marker(after_delim: &str) -> bool {
    let mut chars = after_delim.chars();
    chars.next() == Some('-') && chars.next().is_some_and(is_space)
}
