//! Format errors

use thiserror::Error;

/// Errors that can occur while writing or reading a flat IR buffer
#[derive(Debug, Error)]
pub enum FormatError {
    /// IR operation has no wire tag
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    /// IR operand has no wire tag
    #[error("Unsupported operand: {0}")]
    UnsupportedOperand(&'static str),

    /// Unknown instruction operation tag in a buffer
    #[error("Unknown operation tag: {0}")]
    UnknownOperation(u8),

    /// Unknown operand union tag in a buffer
    #[error("Unknown operand type: {0}")]
    UnknownOperandType(u8),

    /// Operand union tag does not match the requested variant
    #[error("Operand type mismatch: expected {expected}, found {found}")]
    OperandTypeMismatch {
        /// Variant the caller asked for
        expected: &'static str,
        /// Variant actually stored
        found: &'static str,
    },

    /// Unknown code range value
    #[error("Invalid code range: {0}")]
    InvalidCodeRange(u8),

    /// Read past the end of the buffer
    #[error("Out of bounds read of {size} bytes at offset {offset} (buffer length {len})")]
    OutOfBounds {
        /// Absolute offset of the read
        offset: usize,
        /// Width of the read
        size: usize,
        /// Buffer length
        len: usize,
    },

    /// Vector index past its length
    #[error("Index {index} out of range for vector of length {len}")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Vector length
        len: usize,
    },

    /// A required field is absent from a table
    #[error("Missing required field `{field}` in {table}")]
    MissingField {
        /// Table shape
        table: &'static str,
        /// Field name
        field: &'static str,
    },

    /// A string field does not hold valid UTF-8
    #[error("Invalid UTF-8 in field `{0}`")]
    InvalidUtf8(&'static str),

    /// Scope declares more temp registers than any scope may use
    #[error("Scope `{scope}` declares {count} temporary variables (limit {max})")]
    TooManyTemps {
        /// Scope name
        scope: String,
        /// Declared count
        count: u32,
        /// Upper bound
        max: u32,
    },

    /// Buffer is too large to be addressed by 32-bit offsets
    #[error("Buffer exceeds the 2 GiB limit")]
    BufferTooLarge,

    /// IO error while persisting or mapping a buffer
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for format operations
pub type Result<T> = std::result::Result<T, FormatError>;
