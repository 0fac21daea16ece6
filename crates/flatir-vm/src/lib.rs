//! # FlatIR VM
//!
//! Executes scopes directly from a flat IR buffer.
//!
//! ## Design Principles
//!
//! - **Lazy**: Instructions and operands are decoded at the point of use
//! - **Shared buffer**: Any number of interpreters may read one buffer;
//!   temps and the instruction pointer are private to each run
//! - **Fail fast**: Unknown tags, malformed instructions and bodies without
//!   a `return` abort the run with an error

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod context;
pub mod dispatch;
pub mod error;
pub mod interpreter;
pub mod string;
pub mod value;

pub use context::{Frame, FrameBuilder};
pub use dispatch::{BuiltinDispatcher, Dispatcher};
pub use error::{VmError, VmResult};
pub use interpreter::{Completion, Interpreter};
pub use string::{Encoding, RubyString};
pub use value::{Block, RubyModule, RubyObject, StaticScope, Value};
