//! Main compiler implementation

use flatir_format::{Instr, Operand, Scope, write_scope};
use tracing::debug;

use crate::codegen::ScopeContext;
use crate::error::CompileResult;
use crate::lexer::Lexer;
use crate::parser::Parser;

/// The compiler
#[derive(Debug, Clone)]
pub struct Compiler {
    /// Name of the top-level scope
    name: String,
    /// Source file recorded in the IR
    file: String,
}

impl Compiler {
    /// Create a compiler for source read from `file`
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            name: "main".to_string(),
            file: file.into(),
        }
    }

    /// Override the top-level scope name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Compile source code to an IR scope
    pub fn compile(&self, source: &str) -> CompileResult<Scope> {
        let mut ctx = ScopeContext::new(self.name.as_str(), self.file.as_str());
        ctx.emit(Instr::receive_self());

        let mut last = Operand::Nil;
        let mut returned = false;
        let mut statements = 0usize;

        for (number, text) in (1u32..).zip(source.lines()) {
            let line = Lexer::new(text, number).tokenize()?;

            // Magic comments only count in the leading comment block
            if statements == 0 && line.tokens.is_empty() {
                if let Some(frozen) = line.comment.as_deref().and_then(frozen_string_literal) {
                    ctx.set_frozen_string_literal(frozen);
                }
                continue;
            }

            let Some(stmt) = Parser::new(&line).statement()? else {
                continue;
            };
            let (value, is_return) = ctx.statement(&stmt, number)?;
            last = value;
            returned = is_return;
            statements += 1;
        }

        if !returned {
            ctx.emit(Instr::return_value(last));
        }

        debug!(
            file = %self.file,
            statements,
            instrs = ctx.instructions.len(),
            temps = ctx.registers.max_used(),
            "compiled scope"
        );
        Ok(ctx.build())
    }

    /// Compile source code straight to a flat IR buffer
    pub fn compile_to_buffer(&self, source: &str) -> CompileResult<Vec<u8>> {
        let scope = self.compile(source)?;
        Ok(write_scope(&scope)?)
    }
}

/// Value of a `frozen_string_literal` magic comment, if `comment` is one
///
/// Accepts both `frozen_string_literal: true` and the Emacs form
/// `-*- frozen-string-literal: true; -*-`.
fn frozen_string_literal(comment: &str) -> Option<bool> {
    let body = comment.trim();
    let body = body
        .strip_prefix("-*-")
        .and_then(|rest| rest.strip_suffix("-*-"))
        .unwrap_or(body);

    body.split(';').find_map(|pair| {
        let (key, value) = pair.split_once(':')?;
        let key = key.trim().replace('-', "_");
        if !key.eq_ignore_ascii_case("frozen_string_literal") {
            return None;
        }
        match value.trim() {
            v if v.eq_ignore_ascii_case("true") => Some(true),
            v if v.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;
    use flatir_format::{FrozenString, Operation, TemporaryVariable};

    fn compile(src: &str) -> CompileResult<Scope> {
        Compiler::new("test.rb").compile(src)
    }

    #[test]
    fn test_magic_comment_parsing() {
        assert_eq!(frozen_string_literal("frozen_string_literal: true"), Some(true));
        assert_eq!(frozen_string_literal("Frozen-String-Literal: FALSE"), Some(false));
        assert_eq!(
            frozen_string_literal("-*- coding: utf-8; frozen_string_literal: true -*-"),
            Some(true)
        );
        assert_eq!(frozen_string_literal("frozen_string_literal: maybe"), None);
        assert_eq!(frozen_string_literal("just a note"), None);
    }

    #[test]
    fn test_hello() {
        let scope = compile("\"hello\"").unwrap();
        assert_eq!(scope.name, "main");
        assert_eq!(scope.file, "test.rb");
        assert_eq!(scope.temp_variables, 0);
        assert_eq!(
            scope.instrs,
            vec![
                Instr::receive_self(),
                Instr::line_number(1),
                Instr::return_value(Operand::StringLiteral(
                    FrozenString::utf8("hello").at("test.rb", 1)
                )),
            ]
        );
    }

    #[test]
    fn test_frozen_string_literal_comment() {
        let src = "# frozen_string_literal: true\n\nx = \"a\"\nx";
        let scope = compile(src).unwrap();
        assert_eq!(
            scope.instrs[2],
            Instr::copy(
                TemporaryVariable(0),
                Operand::FrozenString(FrozenString::utf8("a").at("test.rb", 3))
            )
        );
        assert_eq!(
            scope.instrs.last(),
            Some(&Instr::return_value(Operand::temp(0)))
        );
    }

    #[test]
    fn test_magic_comment_after_code_is_ignored() {
        let src = "x = \"a\"\n# frozen_string_literal: true\ny = \"b\"";
        let scope = compile(src).unwrap();
        let kinds: Vec<&str> = scope
            .instrs
            .iter()
            .filter(|i| i.operation == Operation::Copy)
            .map(|i| i.operands[0].name())
            .collect();
        assert_eq!(kinds, vec!["StringLiteral", "StringLiteral"]);
    }

    #[test]
    fn test_explicit_return_is_not_doubled() {
        let scope = compile("return self").unwrap();
        let returns = scope
            .instrs
            .iter()
            .filter(|i| i.operation == Operation::Return)
            .count();
        assert_eq!(returns, 1);
    }

    #[test]
    fn test_empty_source_returns_nil() {
        let scope = compile("# nothing here\n").unwrap();
        assert_eq!(
            scope.instrs,
            vec![Instr::receive_self(), Instr::return_value(Operand::Nil)]
        );
        // nil has no wire encoding
        assert!(matches!(
            Compiler::new("t.rb").compile_to_buffer(""),
            Err(CompileError::Format(_))
        ));
    }

    #[test]
    fn test_errors_carry_lines() {
        let err = compile("x = \"a\"\ny = z").unwrap_err();
        assert!(matches!(err, CompileError::UndefinedLocal { ref name, line: 2 } if name == "z"));
        assert_eq!(err.line(), Some(2));

        let err = compile("\n\n\"open").unwrap_err();
        assert!(matches!(err, CompileError::Lex { line: 3, .. }));
    }
}
