//! Wire schema: table shapes, field slots and union tags
//!
//! Slots are append-only. A new field always takes the next free slot of its
//! table; existing slots are never renumbered or reused.

use serde::{Deserialize, Serialize};

use crate::error::{FormatError, Result};

/// Table marker types used to type builder offsets
pub mod table {
    /// `Scope` table
    pub enum Scope {}
    /// `Closure` table
    pub enum Closure {}
    /// `Instruction` table
    pub enum Instruction {}
    /// `Operand` table
    pub enum Operand {}
    /// `FrozenString` table
    pub enum FrozenString {}
    /// `StringLiteral` table
    pub enum StringLiteral {}
    /// `TemporaryVariable` table
    pub enum TemporaryVariable {}
    /// Payload-free operand table (`CurrentScope`, `ScopeModule`, `Self`)
    pub enum Marker {}
}

/// `Scope` field slots
pub mod scope {
    /// `name: string`
    pub const NAME: u16 = 0;
    /// `nested_closures: [Closure]`
    pub const NESTED_CLOSURES: u16 = 1;
    /// `lexical_children: [Scope]`
    pub const LEXICAL_CHILDREN: u16 = 2;
    /// `instrs: [Instruction]`
    pub const INSTRS: u16 = 3;
    /// `temp_variables: uint32 = 0`
    pub const TEMP_VARIABLES: u16 = 4;
    /// `accepts_keyword_arguments: bool = false`
    pub const ACCEPTS_KEYWORD_ARGUMENTS: u16 = 5;
    /// `line: uint32 = 0`
    pub const LINE: u16 = 6;
    /// `file: string`
    pub const FILE: u16 = 7;

    /// Largest `temp_variables` a scope may declare
    pub const MAX_TEMP_VARIABLES: u32 = 1 << 16;
}

/// `Closure` field slots
pub mod closure {
    /// `scope: Scope`
    pub const SCOPE: u16 = 0;
}

/// `Instruction` field slots
pub mod instruction {
    /// `operation: ubyte`
    pub const OPERATION: u16 = 0;
    /// `operands: [Operand]`
    pub const OPERANDS: u16 = 1;
    /// `result: TemporaryVariable`
    pub const RESULT: u16 = 2;
    /// `name: string` (call method name)
    pub const NAME: u16 = 3;
    /// `line: uint32 = 0` (`LineNumber` payload)
    pub const LINE: u16 = 4;
}

/// `Operand` field slots
pub mod operand {
    /// `operand_type: ubyte` (union tag)
    pub const OPERAND_TYPE: u16 = 0;
    /// `operand: table` (union value)
    pub const OPERAND: u16 = 1;
}

/// `FrozenString` field slots
pub mod frozen_string {
    /// `bytes: [ubyte]`
    pub const BYTES: u16 = 0;
    /// `encoding: string`
    pub const ENCODING: u16 = 1;
    /// `coderange: ubyte = 0`
    pub const CODERANGE: u16 = 2;
    /// `file: string`
    pub const FILE: u16 = 3;
    /// `line: uint32 = 0`
    pub const LINE: u16 = 4;
}

/// `StringLiteral` field slots
pub mod string_literal {
    /// `frozen: FrozenString`
    pub const FROZEN: u16 = 0;
}

/// `TemporaryVariable` field slots
pub mod temporary_variable {
    /// `offset: uint32 = 0`
    pub const OFFSET: u16 = 0;
}

/// Operand union tag
///
/// The numeric values are part of the wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OperandType {
    /// No operand stored
    None = 0,
    /// `StringLiteral` table
    StringLiteral = 1,
    /// `FrozenString` table
    FrozenString = 2,
    /// `TemporaryVariable` table
    TemporaryVariable = 3,
    /// Lexically enclosing scope
    CurrentScope = 4,
    /// Module of the lexically enclosing scope
    ScopeModule = 5,
    /// Receiver of the executing scope
    SelfValue = 6,
}

impl OperandType {
    /// Decode a wire tag
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(Self::None),
            1 => Ok(Self::StringLiteral),
            2 => Ok(Self::FrozenString),
            3 => Ok(Self::TemporaryVariable),
            4 => Ok(Self::CurrentScope),
            5 => Ok(Self::ScopeModule),
            6 => Ok(Self::SelfValue),
            other => Err(FormatError::UnknownOperandType(other)),
        }
    }

    /// Encode as wire tag
    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Variant name
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::StringLiteral => "StringLiteral",
            Self::FrozenString => "FrozenString",
            Self::TemporaryVariable => "TemporaryVariable",
            Self::CurrentScope => "CurrentScope",
            Self::ScopeModule => "ScopeModule",
            Self::SelfValue => "Self",
        }
    }
}
