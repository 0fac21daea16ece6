//! # FlatIR Compiler
//!
//! Lowers a small, line-oriented Ruby subset to flat IR scopes.
//!
//! ## Pipeline
//!
//! 1. Lex each source line
//! 2. Parse the line into a statement
//! 3. Lower statements into the top-level scope
//! 4. Write the scope to a buffer (optional)

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod codegen;
pub mod compiler;
pub mod error;
pub mod lexer;
pub mod parser;

pub use compiler::Compiler;
pub use error::{CompileError, CompileResult};
