//! Statement parser
//!
//! Recursive descent over one line's tokens. Precedence, loosest first:
//! `==`/`!=`, `<<`, `+`, then method calls.

use crate::error::{CompileError, CompileResult};
use crate::lexer::{Line, Token};

/// Expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// String literal
    Str(String),
    /// Integer literal
    Int(i64),
    /// `nil`
    Nil,
    /// `true` / `false`
    Bool(bool),
    /// `self`
    SelfRef,
    /// Local variable read
    Local(String),
    /// `recv.name(args)`; binary operators are calls too
    Call {
        /// Receiver
        receiver: Box<Expr>,
        /// Method name
        name: String,
        /// Arguments
        args: Vec<Expr>,
    },
}

/// Statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// Expression evaluated for its value
    Expr(Expr),
    /// `name = value`
    Assign {
        /// Local name
        name: String,
        /// Assigned value
        value: Expr,
    },
    /// `return value`
    Return(Expr),
}

const KEYWORDS: &[&str] = &["self", "nil", "true", "false", "return"];

/// Parser over one line
pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    line: u32,
}

impl<'a> Parser<'a> {
    /// Create a parser for a lexed line
    pub fn new(line: &'a Line) -> Self {
        Self {
            tokens: &line.tokens,
            pos: 0,
            line: line.number,
        }
    }

    /// Parse the line as one statement, or `None` if it has no tokens
    pub fn statement(mut self) -> CompileResult<Option<Stmt>> {
        if self.tokens.is_empty() {
            return Ok(None);
        }

        let stmt = match (self.tokens.first(), self.tokens.get(1)) {
            (Some(Token::Ident(kw)), _) if kw == "return" => {
                self.pos += 1;
                Stmt::Return(self.expression()?)
            }
            (Some(Token::Ident(name)), Some(Token::Assign)) => {
                if KEYWORDS.contains(&name.as_str()) {
                    return Err(self.error(format!("can't assign to {name}")));
                }
                self.pos += 2;
                Stmt::Assign {
                    name: name.clone(),
                    value: self.expression()?,
                }
            }
            _ => Stmt::Expr(self.expression()?),
        };

        match self.peek() {
            None => Ok(Some(stmt)),
            Some(token) => Err(self.error(format!("unexpected {token:?} after statement"))),
        }
    }

    fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::syntax(message, self.line)
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token, what: &str) -> CompileResult<()> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(self.error(format!("expected {what}, found {token:?}"))),
            None => Err(self.error(format!("expected {what} at end of line"))),
        }
    }

    fn expression(&mut self) -> CompileResult<Expr> {
        self.binary(0)
    }

    /// Left-associative binary operators, one precedence level per entry
    fn binary(&mut self, level: usize) -> CompileResult<Expr> {
        const LEVELS: &[&[&str]] = &[&["==", "!="], &["<<"], &["+"]];
        if level == LEVELS.len() {
            return self.postfix();
        }

        let mut lhs = self.binary(level + 1)?;
        while let Some(op) = self.peek().and_then(Token::operator)
            && LEVELS[level].contains(&op)
        {
            self.pos += 1;
            let rhs = self.binary(level + 1)?;
            lhs = Expr::Call {
                receiver: Box::new(lhs),
                name: op.to_string(),
                args: vec![rhs],
            };
        }
        Ok(lhs)
    }

    fn postfix(&mut self) -> CompileResult<Expr> {
        let mut expr = self.primary()?;
        while self.peek() == Some(&Token::Dot) {
            self.pos += 1;
            let name = match self.next() {
                Some(Token::Ident(name)) => name.clone(),
                Some(token) => return Err(self.error(format!("expected method name, found {token:?}"))),
                None => return Err(self.error("expected method name at end of line")),
            };
            let args = if self.peek() == Some(&Token::LParen) {
                self.pos += 1;
                self.arguments()?
            } else {
                Vec::new()
            };
            expr = Expr::Call {
                receiver: Box::new(expr),
                name,
                args,
            };
        }
        Ok(expr)
    }

    fn arguments(&mut self) -> CompileResult<Vec<Expr>> {
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => return Ok(args),
                Some(token) => return Err(self.error(format!("expected `,` or `)`, found {token:?}"))),
                None => return Err(self.error("unclosed argument list")),
            }
        }
    }

    fn primary(&mut self) -> CompileResult<Expr> {
        match self.next() {
            Some(Token::Str(s)) => Ok(Expr::Str(s.clone())),
            Some(Token::Int(n)) => Ok(Expr::Int(*n)),
            Some(Token::Ident(name)) => Ok(match name.as_str() {
                "self" => Expr::SelfRef,
                "nil" => Expr::Nil,
                "true" => Expr::Bool(true),
                "false" => Expr::Bool(false),
                "return" => return Err(self.error("unexpected `return` in expression")),
                _ => Expr::Local(name.clone()),
            }),
            Some(Token::LParen) => {
                let expr = self.expression()?;
                self.expect(&Token::RParen, "`)`")?;
                Ok(expr)
            }
            Some(token) => Err(self.error(format!("unexpected {token:?}"))),
            None => Err(self.error("expected expression at end of line")),
        }
    }
}
