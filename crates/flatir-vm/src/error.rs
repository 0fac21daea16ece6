//! VM error types

use flatir_format::FormatError;
use thiserror::Error;

/// VM execution errors
///
/// None of these are recoverable inside the interpreter; they propagate to
/// whoever invoked the run.
#[derive(Debug, Error)]
pub enum VmError {
    /// Instruction tag outside the known operation set
    #[error("Unexpected instruction tag {tag} at ipc {ipc} in `{scope}`")]
    UnexpectedInstruction {
        /// Raw operation tag
        tag: u8,
        /// Instruction index
        ipc: usize,
        /// Scope name
        scope: String,
    },

    /// Operand tag outside the known union
    #[error("Unexpected operand tag {tag} at ipc {ipc} in `{scope}`")]
    UnexpectedOperand {
        /// Raw union tag
        tag: u8,
        /// Instruction index
        ipc: usize,
        /// Scope name
        scope: String,
    },

    /// The instruction stream ended without a `return`
    #[error("Interpreter fell off the end of `{scope}` after {count} instructions")]
    FellOffEnd {
        /// Scope name
        scope: String,
        /// Instructions executed
        count: usize,
    },

    /// Instruction lacks an operand, result or name it needs
    #[error("Malformed `{operation}` at ipc {ipc}: {message}")]
    MalformedInstruction {
        /// Operation name
        operation: &'static str,
        /// Instruction index
        ipc: usize,
        /// What is missing
        message: String,
    },

    /// Temp register beyond the scope's declared temp count
    #[error("Temporary variable %t{index} out of range ({len} temps)")]
    TempOutOfRange {
        /// Register index
        index: u32,
        /// Temp array length
        len: usize,
    },

    /// Scope declares more temp registers than the interpreter allocates
    #[error("Scope `{scope}` declares {count} temporary variables (limit {max})")]
    TooManyTemps {
        /// Scope name
        scope: String,
        /// Declared count
        count: u32,
        /// Upper bound
        max: u32,
    },

    /// String encoding not known to the runtime
    #[error("Unknown encoding: {0}")]
    UnknownEncoding(String),

    /// Incompatible string encodings
    #[error("Encoding::CompatibilityError: incompatible character encodings: {0} and {1}")]
    EncodingCompatibility(&'static str, &'static str),

    /// Method lookup failed
    #[error("NoMethodError: undefined method `{name}' for {receiver}")]
    NoMethod {
        /// Method name
        name: String,
        /// Receiver description
        receiver: String,
    },

    /// Wrong argument type for a builtin
    #[error("TypeError: {0}")]
    TypeError(String),

    /// Attempt to modify a frozen value
    #[error("FrozenError: can't modify frozen {0}")]
    Frozen(String),

    /// Buffer decode failure
    #[error("Format error: {0}")]
    Format(#[from] FormatError),
}

impl VmError {
    /// Create a type error
    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::TypeError(msg.into())
    }

    /// Create a malformed-instruction error
    pub fn malformed(operation: &'static str, ipc: usize, message: impl Into<String>) -> Self {
        Self::MalformedInstruction {
            operation,
            ipc,
            message: message.into(),
        }
    }

    /// Whether the error signals a damaged buffer rather than a bad method body
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Self::UnexpectedInstruction { .. }
                | Self::UnexpectedOperand { .. }
                | Self::MalformedInstruction { .. }
                | Self::TempOutOfRange { .. }
                | Self::TooManyTemps { .. }
                | Self::Format(_)
        )
    }
}

/// Result type for VM operations
pub type VmResult<T> = std::result::Result<T, VmError>;
