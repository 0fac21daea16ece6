//! IR instructions and operation codes

use serde::{Deserialize, Serialize};

use crate::error::{FormatError, Result};
use crate::operand::{Operand, TemporaryVariable};

/// IR operation
///
/// The first seven operations have a wire tag. The remaining ones exist in
/// the front end's IR only and cannot be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    // ==================== Wire-mapped ====================
    /// result = operands\[0\]
    Copy,
    /// Bind the receiver (value is already ambient)
    ReceiveSelf,
    /// Update the current line
    LineNumber,
    /// result = operands\[0\].name(operands\[1\]), no block
    Call1Obj,
    /// Leave the scope with operands\[0\]
    Return,
    /// result = call-site block
    LoadImplicitClosure,
    /// result = block captured by the frame
    LoadFrameClosure,

    // ==================== Front end only ====================
    /// result = operands\[0\].name()
    Call0Obj,
    /// result = operands\[0\].name(operands\[1..\])
    Call,
    /// Unconditional jump
    Jump,
    /// No operation
    Nop,
}

impl Operation {
    /// Wire tag, if this operation can be written
    pub const fn wire_tag(self) -> Option<u8> {
        match self {
            Self::Copy => Some(0),
            Self::ReceiveSelf => Some(1),
            Self::LineNumber => Some(2),
            Self::Call1Obj => Some(3),
            Self::Return => Some(4),
            Self::LoadImplicitClosure => Some(5),
            Self::LoadFrameClosure => Some(6),
            Self::Call0Obj | Self::Call | Self::Jump | Self::Nop => None,
        }
    }

    /// Decode a wire tag
    pub fn from_wire(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(Self::Copy),
            1 => Ok(Self::ReceiveSelf),
            2 => Ok(Self::LineNumber),
            3 => Ok(Self::Call1Obj),
            4 => Ok(Self::Return),
            5 => Ok(Self::LoadImplicitClosure),
            6 => Ok(Self::LoadFrameClosure),
            other => Err(FormatError::UnknownOperation(other)),
        }
    }

    /// Get the name of this operation
    pub const fn name(self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::ReceiveSelf => "recv_self",
            Self::LineNumber => "line_num",
            Self::Call1Obj => "call_1o",
            Self::Return => "return",
            Self::LoadImplicitClosure => "load_implicit_closure",
            Self::LoadFrameClosure => "load_frame_closure",
            Self::Call0Obj => "call_0o",
            Self::Call => "call",
            Self::Jump => "jump",
            Self::Nop => "nop",
        }
    }

    /// Whether the operation stores into a result register
    pub const fn has_result(self) -> bool {
        matches!(
            self,
            Self::Copy
                | Self::Call1Obj
                | Self::Call0Obj
                | Self::Call
                | Self::LoadImplicitClosure
                | Self::LoadFrameClosure
        )
    }
}

/// A single IR instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instr {
    /// Operation code
    pub operation: Operation,
    /// Operands in evaluation order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operands: Vec<Operand>,
    /// Result register for result-producing operations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TemporaryVariable>,
    /// Method name of a call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Line payload of `LineNumber`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl Instr {
    /// Create an instruction with no operands
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            operands: Vec::new(),
            result: None,
            name: None,
            line: None,
        }
    }

    /// result = src
    pub fn copy(result: TemporaryVariable, src: Operand) -> Self {
        Self {
            operands: vec![src],
            result: Some(result),
            ..Self::new(Operation::Copy)
        }
    }

    /// Receive self
    pub fn receive_self() -> Self {
        Self::new(Operation::ReceiveSelf)
    }

    /// Line marker
    pub fn line_number(line: u32) -> Self {
        Self {
            line: Some(line),
            ..Self::new(Operation::LineNumber)
        }
    }

    /// result = receiver.name(arg)
    pub fn call_1obj(
        result: TemporaryVariable,
        name: impl Into<String>,
        receiver: Operand,
        arg: Operand,
    ) -> Self {
        Self {
            operands: vec![receiver, arg],
            result: Some(result),
            name: Some(name.into()),
            ..Self::new(Operation::Call1Obj)
        }
    }

    /// result = receiver.name()
    pub fn call_0obj(result: TemporaryVariable, name: impl Into<String>, receiver: Operand) -> Self {
        Self {
            operands: vec![receiver],
            result: Some(result),
            name: Some(name.into()),
            ..Self::new(Operation::Call0Obj)
        }
    }

    /// result = receiver.name(args...)
    pub fn call(
        result: TemporaryVariable,
        name: impl Into<String>,
        receiver: Operand,
        args: Vec<Operand>,
    ) -> Self {
        let mut operands = Vec::with_capacity(args.len() + 1);
        operands.push(receiver);
        operands.extend(args);
        Self {
            operands,
            result: Some(result),
            name: Some(name.into()),
            ..Self::new(Operation::Call)
        }
    }

    /// return src
    pub fn return_value(src: Operand) -> Self {
        Self {
            operands: vec![src],
            ..Self::new(Operation::Return)
        }
    }

    /// result = call-site block
    pub fn load_implicit_closure(result: TemporaryVariable) -> Self {
        Self {
            result: Some(result),
            ..Self::new(Operation::LoadImplicitClosure)
        }
    }

    /// result = frame block
    pub fn load_frame_closure(result: TemporaryVariable) -> Self {
        Self {
            result: Some(result),
            ..Self::new(Operation::LoadFrameClosure)
        }
    }
}
