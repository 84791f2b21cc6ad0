//! Recursive-descent parser from tokens to [`Tree`]s.

use std::sync::Arc;

use crate::ast::{Arg, Branch, Command, Node, Pipeline, Tree};
use crate::error::SyntaxError;
use crate::funcs::FuncMap;
use crate::lexer::{Lexer, Span, Token, TokenKind};
use crate::template::Namespace;

/// A `{{define}}` or `{{block}}` body found while parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub name: String,
    pub tree: Tree,
    /// Span of the opening `{{define ...}}` / `{{block ...}}` action.
    pub span: Span,
}

/// Result of parsing one source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parsed {
    pub root: Tree,
    /// Definitions in document order. Duplicates are kept.
    pub definitions: Vec<Definition>,
    /// Full extent of every `{{define}}...{{end}}` section, opening action
    /// through closing `{{end}}`. Blocks are not listed; they render in place.
    pub define_sections: Vec<Span>,
}

impl Parsed {
    /// Collapse definitions by name. A later non-empty body replaces an
    /// earlier one; an empty body never replaces a non-empty one.
    pub fn namespace(&self) -> Namespace {
        let mut trees = Namespace::new();
        for def in &self.definitions {
            let keep_existing = def.tree.is_empty()
                && trees.get(&def.name).is_some_and(|existing| !existing.is_empty());
            if !keep_existing {
                trees.insert(def.name.clone(), Arc::new(def.tree.clone()));
            }
        }
        trees
    }
}

/// Parse `source` under `name`. Identifiers must resolve through `funcs`
/// or the builtin set.
pub fn parse(name: &str, source: &str, funcs: &FuncMap) -> Result<Parsed, SyntaxError> {
    let tokens = Lexer::new(name, source).tokenize()?;
    let mut parser = Parser {
        name,
        tokens,
        pos: 0,
        funcs,
        vars: Vec::new(),
        definitions: Vec::new(),
        define_sections: Vec::new(),
    };

    let (root, stop) = parser.parse_list(true)?;
    match stop {
        Stop::Eof => {}
        Stop::End(line, _) => return Err(SyntaxError::new(name, line, "unexpected {{end}}")),
        Stop::Else(line, _) => return Err(SyntaxError::new(name, line, "unexpected {{else}}")),
    }
    Ok(Parsed {
        root,
        definitions: parser.definitions,
        define_sections: parser.define_sections,
    })
}

/// Why a list stopped.
enum Stop {
    Eof,
    /// Line of the `{{end}}` and the offset just past it.
    End(usize, usize),
    Else(usize, ElseKind),
}

#[derive(PartialEq)]
enum ElseKind {
    Plain,
    If(usize),
    With(usize),
}

#[derive(Clone, Copy, PartialEq)]
enum Control {
    If,
    Range,
    With,
}

impl Control {
    fn keyword(self) -> &'static str {
        match self {
            Control::If => "if",
            Control::Range => "range",
            Control::With => "with",
        }
    }
}

struct Parser<'a> {
    name: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    funcs: &'a FuncMap,
    /// Variables in scope, innermost last. `$` is always defined.
    vars: Vec<String>,
    definitions: Vec<Definition>,
    define_sections: Vec<Span>,
}

impl Parser<'_> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn next(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn error(&self, token: &Token, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(self.name, token.line, message)
    }

    fn expect_right_delim(&mut self, context: &str) -> Result<usize, SyntaxError> {
        let token = self.next();
        match token.kind {
            TokenKind::RightDelim => Ok(token.span.end),
            _ => Err(self.error(&token, format!("unexpected {token} in {context}"))),
        }
    }

    fn expect_string(&mut self, context: &str) -> Result<String, SyntaxError> {
        let token = self.next();
        match token.kind {
            TokenKind::Str(value) => Ok(value),
            _ => Err(self.error(&token, format!("unexpected {token} in {context}"))),
        }
    }

    fn keyword(&self) -> Option<&str> {
        match &self.peek().kind {
            TokenKind::Identifier(word) => Some(word.as_str()),
            _ => None,
        }
    }

    fn parse_list(&mut self, top_level: bool) -> Result<(Tree, Stop), SyntaxError> {
        let mut nodes = Vec::new();
        loop {
            let token = self.next();
            match token.kind {
                TokenKind::Eof => return Ok((Tree::new(nodes), Stop::Eof)),
                TokenKind::Text(text) => nodes.push(Node::Text(text)),
                TokenKind::LeftDelim => {
                    let start = token.span.start;
                    let line = token.line;
                    let keyword = self.keyword().map(str::to_owned);
                    match keyword.as_deref() {
                        Some("end") => {
                            self.next();
                            let end = self.expect_right_delim("end")?;
                            return Ok((Tree::new(nodes), Stop::End(line, end)));
                        }
                        Some("else") => {
                            self.next();
                            let kind = self.parse_else_head()?;
                            return Ok((Tree::new(nodes), Stop::Else(line, kind)));
                        }
                        Some("if") => {
                            self.next();
                            nodes.push(Node::If(self.parse_branch(Control::If, start)?));
                        }
                        Some("range") => {
                            self.next();
                            nodes.push(Node::Range(self.parse_branch(Control::Range, start)?));
                        }
                        Some("with") => {
                            self.next();
                            nodes.push(Node::With(self.parse_branch(Control::With, start)?));
                        }
                        Some("define") => {
                            let define = self.next();
                            if !top_level {
                                return Err(self.error(&define, "unexpected <define> in command"));
                            }
                            self.parse_define(start)?;
                        }
                        Some("block") => {
                            self.next();
                            nodes.push(self.parse_block(start)?);
                        }
                        Some("template") => {
                            self.next();
                            nodes.push(self.parse_template(start)?);
                        }
                        _ => {
                            let pipe = self.parse_pipeline("command", 1)?;
                            let end = self.expect_right_delim("command")?;
                            nodes.push(Node::Action {
                                span: start..end,
                                pipe,
                            });
                        }
                    }
                }
                _ => return Err(self.error(&token, format!("unexpected {token}"))),
            }
        }
    }

    /// After `{{else`: plain `}}`, or the start of `if`/`with` chaining.
    fn parse_else_head(&mut self) -> Result<ElseKind, SyntaxError> {
        let keyword = self.keyword().map(str::to_owned);
        match keyword.as_deref() {
            Some("if") => {
                let start = self.next().span.start;
                Ok(ElseKind::If(start))
            }
            Some("with") => {
                let start = self.next().span.start;
                Ok(ElseKind::With(start))
            }
            _ => {
                self.expect_right_delim("else")?;
                Ok(ElseKind::Plain)
            }
        }
    }

    fn parse_branch(&mut self, control: Control, start: usize) -> Result<Branch, SyntaxError> {
        let scope = self.vars.len();
        let max_decl = if control == Control::Range { 2 } else { 1 };
        let pipe = self.parse_pipeline(control.keyword(), max_decl)?;
        let end = self.expect_right_delim(control.keyword())?;

        let (list, stop) = self.parse_list(false)?;
        let else_list = match stop {
            Stop::End(..) => None,
            Stop::Eof => {
                let eof = self.peek().clone();
                return Err(self.error(&eof, format!("unexpected EOF in {}", control.keyword())));
            }
            Stop::Else(_, ElseKind::Plain) => {
                let (else_list, stop) = self.parse_list(false)?;
                match stop {
                    Stop::End(..) => Some(else_list),
                    Stop::Else(line, _) => {
                        return Err(SyntaxError::new(self.name, line, "expected end; found {{else}}"));
                    }
                    Stop::Eof => {
                        let eof = self.peek().clone();
                        return Err(self.error(&eof, format!("unexpected EOF in {}", control.keyword())));
                    }
                }
            }
            // `{{else if ...}}` shares the enclosing `{{end}}`.
            Stop::Else(_, ElseKind::If(at)) if control == Control::If => {
                let nested = self.parse_branch(Control::If, at)?;
                Some(Tree::new(vec![Node::If(nested)]))
            }
            Stop::Else(_, ElseKind::With(at)) if control == Control::With => {
                let nested = self.parse_branch(Control::With, at)?;
                Some(Tree::new(vec![Node::With(nested)]))
            }
            Stop::Else(line, _) => {
                return Err(SyntaxError::new(
                    self.name,
                    line,
                    format!("unexpected chained else in {}", control.keyword()),
                ));
            }
        };
        self.vars.truncate(scope);

        Ok(Branch {
            span: start..end,
            pipe,
            list,
            else_list,
        })
    }

    /// Parse a body with a fresh variable scope, requiring `{{end}}`.
    /// Also returns the offset just past that `{{end}}`.
    fn parse_body(&mut self, context: &str) -> Result<(Tree, usize), SyntaxError> {
        let outer = std::mem::take(&mut self.vars);
        let result = self.parse_list(false);
        self.vars = outer;
        let (tree, stop) = result?;
        match stop {
            Stop::End(_, end) => Ok((tree, end)),
            Stop::Else(line, _) => Err(SyntaxError::new(
                self.name,
                line,
                format!("unexpected {{{{else}}}} in {context}"),
            )),
            Stop::Eof => {
                let eof = self.peek().clone();
                Err(self.error(&eof, format!("unexpected EOF in {context}")))
            }
        }
    }

    fn parse_define(&mut self, start: usize) -> Result<(), SyntaxError> {
        let name = self.expect_string("define clause")?;
        let end = self.expect_right_delim("define clause")?;
        let (tree, close) = self.parse_body("define")?;
        self.definitions.push(Definition {
            name,
            tree,
            span: start..end,
        });
        self.define_sections.push(start..close);
        Ok(())
    }

    fn parse_block(&mut self, start: usize) -> Result<Node, SyntaxError> {
        let name = self.expect_string("block clause")?;
        let pipe = self.parse_pipeline("block clause", 0)?;
        let end = self.expect_right_delim("block clause")?;
        let (tree, _) = self.parse_body("block")?;
        self.definitions.push(Definition {
            name: name.clone(),
            tree,
            span: start..end,
        });
        Ok(Node::Template {
            span: start..end,
            name,
            pipe: Some(pipe),
        })
    }

    fn parse_template(&mut self, start: usize) -> Result<Node, SyntaxError> {
        let name = self.expect_string("template clause")?;
        let pipe = if self.peek().kind == TokenKind::RightDelim {
            None
        } else {
            Some(self.parse_pipeline("template clause", 0)?)
        };
        let end = self.expect_right_delim("template clause")?;
        Ok(Node::Template {
            span: start..end,
            name,
            pipe,
        })
    }

    /// Try to read `$x :=` or `$i, $v :=` at the start of a pipeline.
    fn parse_declaration(&mut self, max_decl: usize) -> Result<Vec<String>, SyntaxError> {
        let bare_var = |kind: &TokenKind| match kind {
            TokenKind::Variable { name, fields } if fields.is_empty() && !name.is_empty() => {
                Some(name.clone())
            }
            _ => None,
        };
        let at = |offset: usize| self.tokens.get(self.pos + offset).map(|t| &t.kind);

        let Some(first) = at(0).and_then(bare_var) else {
            return Ok(Vec::new());
        };
        let decl = match (at(1), at(2).and_then(bare_var), at(3)) {
            (Some(TokenKind::Declare), _, _) => vec![first],
            (Some(TokenKind::Comma), Some(second), Some(TokenKind::Declare)) => vec![first, second],
            _ => return Ok(Vec::new()),
        };
        let token = self.peek().clone();
        if decl.len() > max_decl {
            return Err(self.error(&token, "too many declarations in command"));
        }
        self.pos += if decl.len() == 1 { 2 } else { 4 };
        Ok(decl)
    }

    fn parse_pipeline(&mut self, context: &str, max_decl: usize) -> Result<Pipeline, SyntaxError> {
        let decl = self.parse_declaration(max_decl)?;
        let mut cmds = Vec::new();
        loop {
            match self.peek().kind {
                TokenKind::RightDelim | TokenKind::RightParen => break,
                _ => cmds.push(self.parse_command()?),
            }
            if self.peek().kind == TokenKind::Pipe {
                self.next();
                if matches!(self.peek().kind, TokenKind::RightDelim | TokenKind::RightParen) {
                    let token = self.peek().clone();
                    return Err(self.error(&token, "missing command after |"));
                }
            }
        }
        if cmds.is_empty() {
            let token = self.peek().clone();
            return Err(self.error(&token, format!("missing value for {context}")));
        }
        self.vars.extend(decl.iter().cloned());
        Ok(Pipeline { decl, cmds })
    }

    fn parse_command(&mut self) -> Result<Command, SyntaxError> {
        let mut args = Vec::new();
        loop {
            match self.peek().kind {
                TokenKind::Pipe | TokenKind::RightDelim | TokenKind::RightParen => break,
                _ => args.push(self.parse_operand()?),
            }
        }
        match args.first() {
            None => {
                let token = self.peek().clone();
                Err(self.error(&token, "missing value for command"))
            }
            Some(first) if args.len() > 1 && !matches!(first, Arg::Function(_)) => {
                let token = self.peek().clone();
                Err(self.error(&token, format!("can't give argument to non-function {first}")))
            }
            Some(_) => Ok(Command { args }),
        }
    }

    fn parse_operand(&mut self) -> Result<Arg, SyntaxError> {
        let token = self.next();
        let arg = match token.kind {
            TokenKind::Identifier(ref name) => {
                if !self.funcs.resolves(name) {
                    return Err(self.error(&token, format!("function {name:?} not defined")));
                }
                Arg::Function(name.clone())
            }
            TokenKind::Dot => Arg::Dot,
            TokenKind::Nil => Arg::Nil,
            TokenKind::Bool(b) => Arg::Bool(b),
            TokenKind::Number(ref n) => Arg::Number(n.clone()),
            TokenKind::Str(ref s) => Arg::Str(s.clone()),
            TokenKind::Field(ref path) => Arg::Field(path.clone()),
            TokenKind::Variable { ref name, ref fields } => {
                if !name.is_empty() && !self.vars.iter().any(|v| v == name) {
                    return Err(self.error(&token, format!("undefined variable \"${name}\"")));
                }
                Arg::Variable {
                    name: name.clone(),
                    fields: fields.clone(),
                }
            }
            TokenKind::LeftParen => {
                let pipe = self.parse_pipeline("parenthesized pipeline", 0)?;
                let close = self.next();
                if close.kind != TokenKind::RightParen {
                    return Err(self.error(&close, format!("unexpected {close} in parenthesized pipeline")));
                }
                Arg::Pipeline(Box::new(pipe))
            }
            _ => return Err(self.error(&token, format!("unexpected {token} in operand"))),
        };
        Ok(arg)
    }
}
