//! Compilation errors

use flatir_format::FormatError;
use thiserror::Error;

/// Compilation errors
#[derive(Debug, Error)]
pub enum CompileError {
    /// Invalid token
    #[error("Lex error at line {line}: {message}")]
    Lex {
        /// Error message
        message: String,
        /// Source line
        line: u32,
    },

    /// Syntax error
    #[error("Syntax error at line {line}: {message}")]
    Syntax {
        /// Error message
        message: String,
        /// Source line
        line: u32,
    },

    /// Read of a local that was never assigned
    #[error("Undefined local variable `{name}` at line {line}")]
    UndefinedLocal {
        /// Variable name
        name: String,
        /// Source line
        line: u32,
    },

    /// Scope needs more temp registers than the format can address
    #[error("Too many temporary variables")]
    TooManyTemps,

    /// The lowered IR could not be written
    #[error("Format error: {0}")]
    Format(#[from] FormatError),
}

impl CompileError {
    /// Create a lex error
    pub fn lex(message: impl Into<String>, line: u32) -> Self {
        Self::Lex {
            message: message.into(),
            line,
        }
    }

    /// Create a syntax error
    pub fn syntax(message: impl Into<String>, line: u32) -> Self {
        Self::Syntax {
            message: message.into(),
            line,
        }
    }

    /// Source line the error points at, if any
    pub fn line(&self) -> Option<u32> {
        match self {
            Self::Lex { line, .. } | Self::Syntax { line, .. } | Self::UndefinedLocal { line, .. } => {
                Some(*line)
            }
            Self::TooManyTemps | Self::Format(_) => None,
        }
    }
}

/// Result type for compilation
pub type CompileResult<T> = Result<T, CompileError>;
