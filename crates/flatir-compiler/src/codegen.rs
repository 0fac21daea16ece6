//! IR generation

use flatir_format::schema::scope::MAX_TEMP_VARIABLES;
use flatir_format::{FrozenString, Instr, Operand, Scope, TemporaryVariable};
use rustc_hash::FxHashMap;

use crate::error::{CompileError, CompileResult};
use crate::parser::{Expr, Stmt};

/// Temp register allocator
///
/// Locals keep their register for the whole scope; intermediates are
/// released at the end of each statement by restoring the position.
#[derive(Debug, Default)]
pub struct RegisterAllocator {
    /// Next available register
    next: u32,
    /// High-water mark
    max: u32,
}

impl RegisterAllocator {
    /// Create a new register allocator
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a register
    pub fn alloc(&mut self) -> CompileResult<TemporaryVariable> {
        if self.next >= MAX_TEMP_VARIABLES {
            return Err(CompileError::TooManyTemps);
        }
        let temp = TemporaryVariable(self.next);
        self.next += 1;
        self.max = self.max.max(self.next);
        Ok(temp)
    }

    /// Get current position (for restoring later)
    pub fn position(&self) -> u32 {
        self.next
    }

    /// Restore to a previous position
    pub fn restore(&mut self, pos: u32) {
        self.next = pos;
    }

    /// Registers the scope needs
    pub fn max_used(&self) -> u32 {
        self.max
    }
}

/// Scope being compiled
#[derive(Debug)]
pub struct ScopeContext {
    /// Scope name
    pub name: String,
    /// Source file
    pub file: String,
    /// Emitted instructions
    pub instructions: Vec<Instr>,
    /// Register allocator
    pub registers: RegisterAllocator,
    /// Local name → register
    locals: FxHashMap<String, TemporaryVariable>,
    /// Whether string literals are emitted frozen
    frozen_string_literal: bool,
    /// Line of the statement being lowered
    line: u32,
}

impl ScopeContext {
    /// Create a new scope context
    pub fn new(name: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            instructions: Vec::new(),
            registers: RegisterAllocator::new(),
            locals: FxHashMap::default(),
            frozen_string_literal: false,
            line: 0,
        }
    }

    /// Emit string literals as `FrozenString` operands
    pub fn set_frozen_string_literal(&mut self, frozen: bool) {
        self.frozen_string_literal = frozen;
    }

    /// Emit an instruction
    pub fn emit(&mut self, instr: Instr) {
        self.instructions.push(instr);
    }

    /// Lower one statement on `line`
    ///
    /// Returns the statement's value and whether it was a `return`.
    pub fn statement(&mut self, stmt: &Stmt, line: u32) -> CompileResult<(Operand, bool)> {
        self.line = line;
        self.emit(Instr::line_number(line));

        let base = self.registers.position();
        let result = match stmt {
            Stmt::Expr(expr) => (self.expression(expr)?, false),
            Stmt::Assign { name, value } => {
                let temp = match self.locals.get(name) {
                    Some(&temp) => temp,
                    None => {
                        // Claim the local's register below this statement's intermediates
                        let temp = self.registers.alloc()?;
                        let value = self.expression(value)?;
                        self.emit(Instr::copy(temp, value));
                        self.locals.insert(name.clone(), temp);
                        self.registers.restore(temp.offset() + 1);
                        return Ok((Operand::TemporaryVariable(temp), false));
                    }
                };
                let value = self.expression(value)?;
                self.emit(Instr::copy(temp, value));
                (Operand::TemporaryVariable(temp), false)
            }
            Stmt::Return(expr) => {
                let value = self.expression(expr)?;
                self.emit(Instr::return_value(value.clone()));
                (value, true)
            }
        };
        self.registers.restore(base);
        Ok(result)
    }

    /// Lower an expression to the operand holding its value
    pub fn expression(&mut self, expr: &Expr) -> CompileResult<Operand> {
        Ok(match expr {
            Expr::Str(s) => {
                let string = FrozenString::utf8(s).at(self.file.clone(), self.line);
                if self.frozen_string_literal {
                    Operand::FrozenString(string)
                } else {
                    Operand::StringLiteral(string)
                }
            }
            Expr::Int(n) => Operand::Fixnum(*n),
            Expr::Nil => Operand::Nil,
            Expr::Bool(b) => Operand::Boolean(*b),
            Expr::SelfRef => Operand::SelfValue,
            Expr::Local(name) => match self.locals.get(name) {
                Some(&temp) => Operand::TemporaryVariable(temp),
                None => {
                    return Err(CompileError::UndefinedLocal {
                        name: name.clone(),
                        line: self.line,
                    });
                }
            },
            Expr::Call {
                receiver,
                name,
                args,
            } => {
                let receiver = self.expression(receiver)?;
                let args = args
                    .iter()
                    .map(|arg| self.expression(arg))
                    .collect::<CompileResult<Vec<_>>>()?;
                let result = self.registers.alloc()?;
                let mut args = args.into_iter();
                let instr = match (args.next(), args.len()) {
                    (None, _) => Instr::call_0obj(result, name.as_str(), receiver),
                    (Some(arg), 0) => Instr::call_1obj(result, name.as_str(), receiver, arg),
                    (Some(first), _) => {
                        let mut all = vec![first];
                        all.extend(args);
                        Instr::call(result, name.as_str(), receiver, all)
                    }
                };
                self.emit(instr);
                Operand::TemporaryVariable(result)
            }
        })
    }

    /// Build the scope
    pub fn build(self) -> Scope {
        Scope::builder(self.name)
            .location(self.file, 1)
            .instructions(self.instructions)
            .temp_variables(self.registers.max_used())
            .build()
    }
}
