//! # FlatIR Format
//!
//! This crate defines the flat, relocatable binary encoding of Ruby IR scopes.
//!
//! ## Design Principles
//!
//! - **Zero-copy**: Readers are views over a byte slice; nothing is decoded
//!   until a field accessor is called
//! - **Relative offsets**: Every internal reference is an offset, so a buffer
//!   can be persisted and memory-mapped back without fixups
//! - **Strict**: Operations and operands without a wire tag are rejected at
//!   write time, unknown tags are rejected at read time
//! - **Append-only schema**: Field slots are never reordered or reused

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod buffer;
pub mod builder;
pub mod disasm;
pub mod error;
pub mod instruction;
pub mod mapped;
pub mod operand;
pub mod reader;
pub mod schema;
pub mod scope;
pub mod writer;

pub use buffer::FlatBuf;
pub use builder::{FlatBuilder, Offset};
pub use error::{FormatError, Result};
pub use instruction::{Instr, Operation};
pub use mapped::{MappedScope, persist};
pub use operand::{CodeRange, FrozenString, Operand, TemporaryVariable};
pub use reader::{
    ClosureView, FrozenStringView, InstrView, OperandRef, OperandView, ScopeView,
    StringLiteralView, TemporaryVariableView, Vector, root_scope, scope_at,
};
pub use schema::OperandType;
pub use scope::{Scope, ScopeBuilder};
pub use writer::{ScopeWriter, root_offset, write_scope};
