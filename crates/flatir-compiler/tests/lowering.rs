//! Source-to-execution tests
//!
//! Compile a snippet, write it, read it back and run it.

use flatir_compiler::{CompileError, Compiler};
use flatir_format::{FormatError, Operation, root_scope};
use flatir_vm::{Frame, Interpreter, Value, VmError};

fn eval(source: &str) -> Result<Value, VmError> {
    let bytes = Compiler::new("snippet.rb").compile_to_buffer(source).unwrap();
    let scope = root_scope(&bytes).unwrap();
    Interpreter::new().execute(scope, &mut Frame::top_level())
}

#[test]
fn test_hello() {
    let value = eval("\"hello\"").unwrap();
    assert_eq!(value.as_string().unwrap().as_bytes(), b"hello");
}

#[test]
fn test_locals_and_operators() {
    let source = "\
a = \"foo\"
b = a + \"bar\" # concatenation
b == \"foobar\"
";
    assert_eq!(eval(source).unwrap(), Value::Bool(true));
    assert_eq!(eval("\"a\" != \"b\"").unwrap(), Value::Bool(true));
    assert_eq!(eval("\"a\".eql?(\"a\")").unwrap(), Value::Bool(true));
}

#[test]
fn test_return_stops_execution() {
    let source = "\
x = \"first\"
return x
x = \"second\"
";
    assert_eq!(eval(source).unwrap().inspect(), "\"first\"");
}

#[test]
fn test_literals_are_frozen() {
    let err = eval("s = \"a\"\ns << \"b\"").unwrap_err();
    assert!(matches!(err, VmError::Frozen(_)));

    // `+` makes a fresh, mutable string
    let source = "\
s = \"a\" + \"\"
s << \"b\"
s
";
    assert_eq!(eval(source).unwrap().inspect(), "\"ab\"");
}

#[test]
fn test_self_is_main() {
    assert_eq!(eval("self").unwrap().inspect(), "main");
    assert_eq!(eval("self.equal?(self)").unwrap(), Value::Bool(true));
}

#[test]
fn test_frozen_string_literal_magic_comment() {
    let source = "# frozen_string_literal: true\n\"x\"";
    let bytes = Compiler::new("magic.rb").compile_to_buffer(source).unwrap();
    let scope = root_scope(&bytes).unwrap();
    let ret = scope.instr(scope.instrs_len().unwrap() - 1).unwrap();
    assert_eq!(ret.operation().unwrap(), Operation::Return);
    assert_eq!(
        ret.operand(0).unwrap().as_frozen_string().unwrap().line().unwrap(),
        2
    );
}

#[test]
fn test_unmapped_constructs_rejected_at_write() {
    for source in ["nil", "1", "self.length", "self.m(\"a\", \"b\")"] {
        let err = Compiler::new("t.rb").compile_to_buffer(source).unwrap_err();
        assert!(
            matches!(
                err,
                CompileError::Format(
                    FormatError::UnsupportedOperand(_) | FormatError::UnsupportedOperation(_)
                )
            ),
            "{source}: {err}"
        );
    }
}

#[test]
fn test_unknown_method() {
    let err = eval("self.frobnicate(self)").unwrap_err();
    assert_eq!(
        err.to_string(),
        "NoMethodError: undefined method `frobnicate' for main"
    );
}
