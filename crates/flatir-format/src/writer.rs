//! Scope writer
//!
//! Serializes an in-memory [`Scope`] tree bottom-up: lexical children first,
//! then the closure vector, then each instruction (operands before the
//! instruction table), then the instruction vector and finally the scope
//! table itself.

use tracing::debug;

use crate::buffer::FlatBuf;
use crate::builder::{FlatBuilder, Offset};
use crate::error::{FormatError, Result};
use crate::instruction::Instr;
use crate::operand::{FrozenString, Operand, TemporaryVariable};
use crate::schema::{self, table};
use crate::scope::Scope;

/// Writes scopes into flat buffers
#[derive(Debug, Default)]
pub struct ScopeWriter {
    builder: FlatBuilder,
    /// Shared empty table for payload-free operands
    marker: Option<Offset<table::Marker>>,
}

impl ScopeWriter {
    /// Create a new writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize `scope` into a self-contained buffer
    ///
    /// On error the partially built buffer is discarded.
    pub fn write(&mut self, scope: &Scope) -> Result<Vec<u8>> {
        let root = self.write_scope(scope);
        let bytes = root.and_then(|root| self.builder.finish(root));
        if bytes.is_err() {
            self.builder.reset();
        }
        self.marker = None;

        let bytes = bytes?;
        debug!(scope = %scope.name, bytes = bytes.len(), "wrote scope buffer");
        Ok(bytes)
    }

    fn write_scope(&mut self, scope: &Scope) -> Result<Offset<table::Scope>> {
        if scope.temp_variables > schema::scope::MAX_TEMP_VARIABLES {
            return Err(FormatError::TooManyTemps {
                scope: scope.name.clone(),
                count: scope.temp_variables,
                max: schema::scope::MAX_TEMP_VARIABLES,
            });
        }

        let children = scope
            .lexical_children
            .iter()
            .map(|child| self.write_scope(child))
            .collect::<Result<Vec<_>>>()?;

        if !scope.closures.is_empty() {
            debug!(
                scope = %scope.name,
                closures = scope.closures.len(),
                "nested closures are not persisted"
            );
        }
        let closures = self.builder.create_vector::<table::Closure>(&[]);

        let instrs = scope
            .instrs
            .iter()
            .map(|instr| self.write_instr(instr))
            .collect::<Result<Vec<_>>>()?;
        let instrs = self.builder.create_vector(&instrs);
        let children = self.builder.create_vector(&children);
        let name = self.builder.create_string(&scope.name);
        let file = (!scope.file.is_empty()).then(|| self.builder.create_shared_string(&scope.file));

        let b = &mut self.builder;
        b.start_table();
        b.add_offset(schema::scope::NAME, name);
        b.add_offset(schema::scope::NESTED_CLOSURES, closures);
        b.add_offset(schema::scope::LEXICAL_CHILDREN, children);
        b.add_offset(schema::scope::INSTRS, instrs);
        b.add_u32(schema::scope::TEMP_VARIABLES, scope.temp_variables, 0);
        b.add_bool(
            schema::scope::ACCEPTS_KEYWORD_ARGUMENTS,
            scope.accepts_keyword_arguments,
            false,
        );
        b.add_u32(schema::scope::LINE, scope.line, 0);
        if let Some(file) = file {
            b.add_offset(schema::scope::FILE, file);
        }
        Ok(b.end_table())
    }

    fn write_instr(&mut self, instr: &Instr) -> Result<Offset<table::Instruction>> {
        let tag = instr
            .operation
            .wire_tag()
            .ok_or(FormatError::UnsupportedOperation(instr.operation.name()))?;

        let operands = instr
            .operands
            .iter()
            .map(|operand| self.write_operand(operand))
            .collect::<Result<Vec<_>>>()?;
        let operands = (!operands.is_empty()).then(|| self.builder.create_vector(&operands));
        let result = instr.result.map(|temp| self.write_temp(temp));
        let name = instr
            .name
            .as_deref()
            .map(|name| self.builder.create_shared_string(name));

        let b = &mut self.builder;
        b.start_table();
        b.add_u8(schema::instruction::OPERATION, tag, 0);
        if let Some(operands) = operands {
            b.add_offset(schema::instruction::OPERANDS, operands);
        }
        if let Some(result) = result {
            b.add_offset(schema::instruction::RESULT, result);
        }
        if let Some(name) = name {
            b.add_offset(schema::instruction::NAME, name);
        }
        b.add_u32(schema::instruction::LINE, instr.line.unwrap_or(0), 0);
        Ok(b.end_table())
    }

    fn write_operand(&mut self, operand: &Operand) -> Result<Offset<table::Operand>> {
        let kind = operand
            .operand_type()
            .ok_or(FormatError::UnsupportedOperand(operand.name()))?;

        let value: Offset<()> = match operand {
            Operand::FrozenString(s) => Offset::new(self.write_frozen_string(s).value()),
            Operand::StringLiteral(s) => {
                let frozen = self.write_frozen_string(s);
                self.builder.start_table();
                self.builder
                    .add_offset(schema::string_literal::FROZEN, frozen);
                Offset::new(self.builder.end_table::<table::StringLiteral>().value())
            }
            Operand::TemporaryVariable(temp) => Offset::new(self.write_temp(*temp).value()),
            Operand::CurrentScope | Operand::ScopeModule | Operand::SelfValue => {
                Offset::new(self.write_marker().value())
            }
            other => return Err(FormatError::UnsupportedOperand(other.name())),
        };

        let b = &mut self.builder;
        b.start_table();
        b.add_u8(schema::operand::OPERAND_TYPE, kind.to_byte(), 0);
        b.add_offset(schema::operand::OPERAND, value);
        Ok(b.end_table())
    }

    fn write_frozen_string(&mut self, s: &FrozenString) -> Offset<table::FrozenString> {
        let bytes = self.builder.create_bytes(&s.bytes);
        let encoding = self.builder.create_shared_string(&s.encoding);
        let file = (!s.file.is_empty()).then(|| self.builder.create_shared_string(&s.file));

        let b = &mut self.builder;
        b.start_table();
        b.add_offset(schema::frozen_string::BYTES, bytes);
        b.add_offset(schema::frozen_string::ENCODING, encoding);
        b.add_u8(schema::frozen_string::CODERANGE, s.coderange.to_byte(), 0);
        if let Some(file) = file {
            b.add_offset(schema::frozen_string::FILE, file);
        }
        b.add_u32(schema::frozen_string::LINE, s.line, 0);
        b.end_table()
    }

    fn write_temp(&mut self, temp: TemporaryVariable) -> Offset<table::TemporaryVariable> {
        let b = &mut self.builder;
        b.start_table();
        b.add_u32(schema::temporary_variable::OFFSET, temp.offset(), 0);
        b.end_table()
    }

    fn write_marker(&mut self) -> Offset<table::Marker> {
        if let Some(marker) = self.marker {
            return marker;
        }
        self.builder.start_table();
        let marker = self.builder.end_table();
        self.marker = Some(marker);
        marker
    }
}

/// Serialize `scope` into a self-contained buffer
pub fn write_scope(scope: &Scope) -> Result<Vec<u8>> {
    ScopeWriter::new().write(scope)
}

/// Position of the root scope table in a finished buffer
pub fn root_offset(bytes: &[u8]) -> Result<usize> {
    FlatBuf::new(bytes).indirect(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Operation;

    fn hello() -> Scope {
        Scope::builder("hello")
            .instruction(Instr::copy(
                TemporaryVariable(0),
                Operand::FrozenString(FrozenString::utf8("hello")),
            ))
            .instruction(Instr::return_value(Operand::temp(0)))
            .temp_variables(1)
            .build()
    }

    #[test]
    fn test_write_produces_root() {
        let bytes = write_scope(&hello()).unwrap();
        let root = root_offset(&bytes).unwrap();
        assert!(root > 0 && root < bytes.len());
    }

    #[test]
    fn test_unsupported_operation() {
        let scope = Scope::builder("bad")
            .instruction(Instr::new(Operation::Jump))
            .build();
        let err = write_scope(&scope).unwrap_err();
        assert!(matches!(err, FormatError::UnsupportedOperation("jump")));
    }

    #[test]
    fn test_unsupported_operand_in_child() {
        let child = Scope::builder("child")
            .instruction(Instr::return_value(Operand::Nil))
            .build();
        let scope = Scope::builder("parent").lexical_child(child).build();
        let err = write_scope(&scope).unwrap_err();
        assert!(matches!(err, FormatError::UnsupportedOperand("Nil")));
    }

    #[test]
    fn test_writer_reusable_after_error() {
        let mut writer = ScopeWriter::new();
        let bad = Scope::builder("bad")
            .instruction(Instr::return_value(Operand::Fixnum(1)))
            .build();
        assert!(writer.write(&bad).is_err());
        let first = writer.write(&hello()).unwrap();
        let second = write_scope(&hello()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_temp_count_limit() {
        let limit = schema::scope::MAX_TEMP_VARIABLES;
        let scope = |temps| {
            Scope::builder("x")
                .instruction(Instr::return_value(Operand::SelfValue))
                .temp_variables(temps)
                .build()
        };
        assert!(write_scope(&scope(limit)).is_ok());

        let err = write_scope(&scope(u32::MAX)).unwrap_err();
        assert!(matches!(
            err,
            FormatError::TooManyTemps { count: u32::MAX, max, .. } if max == limit
        ));

        let parent = Scope::builder("parent")
            .lexical_child(scope(limit + 1))
            .build();
        assert!(matches!(
            write_scope(&parent),
            Err(FormatError::TooManyTemps { .. })
        ));
    }
}
