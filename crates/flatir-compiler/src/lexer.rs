//! Line lexer
//!
//! Statements never span lines, so the lexer works one line at a time and
//! every token carries its line implicitly.

use crate::error::{CompileError, CompileResult};

/// A token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Identifier or keyword; method names may end in `?` or `!`
    Ident(String),
    /// Double-quoted string with escapes resolved
    Str(String),
    /// Integer literal
    Int(i64),
    /// `+`
    Plus,
    /// `<<`
    Shovel,
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    /// `=`
    Assign,
    /// `.`
    Dot,
    /// `,`
    Comma,
    /// `(`
    LParen,
    /// `)`
    RParen,
}

impl Token {
    /// Binary operator method name
    pub fn operator(&self) -> Option<&'static str> {
        match self {
            Self::Plus => Some("+"),
            Self::Shovel => Some("<<"),
            Self::EqEq => Some("=="),
            Self::NotEq => Some("!="),
            _ => None,
        }
    }
}

/// A lexed source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// 1-based line number
    pub number: u32,
    /// Tokens before any comment
    pub tokens: Vec<Token>,
    /// Comment text after `#`, if any
    pub comment: Option<String>,
}

/// Lexer over a single line
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    src: &'a str,
    line: u32,
}

impl<'a> Lexer<'a> {
    /// Create a lexer for `src`, which is line `line` of the file
    pub fn new(src: &'a str, line: u32) -> Self {
        Self {
            chars: src.char_indices().peekable(),
            src,
            line,
        }
    }

    /// Tokenize the whole line
    pub fn tokenize(mut self) -> CompileResult<Line> {
        let mut tokens = Vec::new();
        let mut comment = None;

        while let Some(&(pos, c)) = self.chars.peek() {
            match c {
                c if c.is_whitespace() => {
                    self.chars.next();
                }
                '#' => {
                    comment = Some(self.src[pos + 1..].trim().to_string());
                    break;
                }
                '"' => {
                    self.chars.next();
                    tokens.push(Token::Str(self.string()?));
                }
                '0'..='9' => tokens.push(self.integer()),
                c if c.is_alphabetic() || c == '_' => tokens.push(self.ident()),
                _ => {
                    self.chars.next();
                    tokens.push(self.punct(c)?);
                }
            }
        }

        Ok(Line {
            number: self.line,
            tokens,
            comment,
        })
    }

    fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::lex(message, self.line)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.chars.peek().is_some_and(|&(_, c)| c == expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn punct(&mut self, c: char) -> CompileResult<Token> {
        Ok(match c {
            '+' => Token::Plus,
            '.' => Token::Dot,
            ',' => Token::Comma,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '=' if self.eat('=') => Token::EqEq,
            '=' => Token::Assign,
            '!' if self.eat('=') => Token::NotEq,
            '<' if self.eat('<') => Token::Shovel,
            other => return Err(self.error(format!("unexpected character `{other}`"))),
        })
    }

    fn string(&mut self) -> CompileResult<String> {
        let mut out = String::new();
        loop {
            match self.chars.next() {
                None => return Err(self.error("unterminated string literal")),
                Some((_, '"')) => return Ok(out),
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, '"')) => out.push('"'),
                    Some((_, '\\')) => out.push('\\'),
                    Some((_, other)) => {
                        return Err(self.error(format!("unknown escape `\\{other}`")));
                    }
                    None => return Err(self.error("unterminated string literal")),
                },
                Some((_, c)) => out.push(c),
            }
        }
    }

    fn integer(&mut self) -> Token {
        let mut value: i64 = 0;
        let mut overflow = false;
        while let Some(&(_, c)) = self.chars.peek() {
            let Some(digit) = c.to_digit(10) else {
                if c != '_' {
                    break;
                }
                self.chars.next();
                continue;
            };
            self.chars.next();
            match value.checked_mul(10).and_then(|v| v.checked_add(digit as i64)) {
                Some(v) => value = v,
                None => overflow = true,
            }
        }
        // Bignums are out of reach; saturate so the writer still rejects the operand
        Token::Int(if overflow { i64::MAX } else { value })
    }

    fn ident(&mut self) -> Token {
        let mut name = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                name.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        // Predicate and bang suffixes, but not the start of `!=`
        if let Some(&(pos, suffix @ ('?' | '!'))) = self.chars.peek()
            && !self.src[pos + 1..].starts_with('=')
        {
            name.push(suffix);
            self.chars.next();
        }
        Token::Ident(name)
    }
}
