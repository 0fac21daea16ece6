//! End-to-end execution tests
//!
//! Scopes are built as IR, written to a buffer and executed from the
//! buffer (in memory or memory-mapped from disk).

use flatir_format::schema;
use flatir_format::{
    FlatBuf, FrozenString, Instr, MappedScope, Operand, Scope, TemporaryVariable, persist,
    root_scope, write_scope,
};
use flatir_vm::{Frame, Interpreter, RubyModule, Value, VmError};

fn hello_scope() -> Scope {
    Scope::builder("hello")
        .location("hello.rb", 1)
        .instruction(Instr::line_number(1))
        .instruction(Instr::receive_self())
        .instruction(Instr::copy(
            TemporaryVariable(0),
            Operand::FrozenString(FrozenString::utf8("hello").at("hello.rb", 1)),
        ))
        .instruction(Instr::return_value(Operand::temp(0)))
        .temp_variables(1)
        .build()
}

fn greeting_scope() -> Scope {
    Scope::builder("greeting")
        .instruction(Instr::receive_self())
        .instruction(Instr::line_number(1))
        .instruction(Instr::copy(
            TemporaryVariable(0),
            Operand::StringLiteral(FrozenString::utf8("hello, ")),
        ))
        .instruction(Instr::line_number(2))
        .instruction(Instr::call_1obj(
            TemporaryVariable(1),
            "+",
            Operand::temp(0),
            Operand::FrozenString(FrozenString::utf8("world")),
        ))
        .instruction(Instr::call_1obj(
            TemporaryVariable(2),
            "==",
            Operand::temp(1),
            Operand::FrozenString(FrozenString::utf8("hello, world")),
        ))
        .instruction(Instr::copy(TemporaryVariable(3), Operand::ScopeModule))
        .instruction(Instr::return_value(Operand::temp(1)))
        .temp_variables(4)
        .build()
}

#[test]
fn test_hello_returns_string() {
    let bytes = write_scope(&hello_scope()).unwrap();
    let scope = root_scope(&bytes).unwrap();

    // Any receiver will do
    for self_value in [Value::Nil, Value::Integer(42), Frame::top_level().self_value().clone()] {
        let mut frame = Frame::builder().self_value(self_value).build();
        let value = Interpreter::new().execute(scope, &mut frame).unwrap();
        assert_eq!(value.as_string().unwrap().as_bytes(), b"hello");
        assert_eq!(frame.file(), "hello.rb");
    }
}

#[test]
fn test_execution_is_deterministic() {
    let bytes = write_scope(&greeting_scope()).unwrap();
    let scope = root_scope(&bytes).unwrap();
    let module = RubyModule::new("Object");

    let run = || {
        let mut frame = Frame::builder().module(module.clone()).build();
        Interpreter::new().run(scope, &mut frame).unwrap()
    };
    let first = run();
    let second = run();

    assert_eq!(first.value, second.value);
    assert_eq!(first.temps, second.temps);
    assert_eq!(first.value.inspect(), "\"hello, world\"");
    assert_eq!(first.temps[2], Value::Bool(true));
}

#[test]
fn test_unknown_operation_tag_is_fatal() {
    let mut bytes = write_scope(&hello_scope()).unwrap();
    let pos = {
        let scope = root_scope(&bytes).unwrap();
        // The trailing `return`; its tag is non-zero so it is stored
        let instr = scope.instr(3).unwrap();
        FlatBuf::new(&bytes)
            .field_offset(instr.location(), schema::instruction::OPERATION)
            .unwrap()
            .unwrap()
    };
    bytes[pos] = 0x7f;

    let scope = root_scope(&bytes).unwrap();
    let err = Interpreter::new()
        .execute(scope, &mut Frame::top_level())
        .unwrap_err();
    assert!(matches!(
        err,
        VmError::UnexpectedInstruction { tag: 0x7f, ipc: 3, .. }
    ));
    assert!(err.is_decode_error());
}

#[test]
fn test_unknown_operand_tag_is_fatal() {
    let mut bytes = write_scope(&hello_scope()).unwrap();
    let pos = {
        let scope = root_scope(&bytes).unwrap();
        let operand = scope.instr(3).unwrap().operand(0).unwrap();
        FlatBuf::new(&bytes)
            .field_offset(operand.location(), schema::operand::OPERAND_TYPE)
            .unwrap()
            .unwrap()
    };
    bytes[pos] = 9;

    let scope = root_scope(&bytes).unwrap();
    let err = Interpreter::new()
        .execute(scope, &mut Frame::top_level())
        .unwrap_err();
    assert!(matches!(err, VmError::UnexpectedOperand { tag: 9, ipc: 3, .. }));
}

#[test]
fn test_oversized_temp_count_is_rejected() {
    let mut bytes = write_scope(&hello_scope()).unwrap();
    let pos = {
        let scope = root_scope(&bytes).unwrap();
        FlatBuf::new(&bytes)
            .field_offset(scope.location(), schema::scope::TEMP_VARIABLES)
            .unwrap()
            .unwrap()
    };
    bytes[pos..pos + 4].copy_from_slice(&u32::MAX.to_le_bytes());

    let scope = root_scope(&bytes).unwrap();
    assert_eq!(scope.temp_variables().unwrap(), u32::MAX);
    let err = Interpreter::new()
        .execute(scope, &mut Frame::top_level())
        .unwrap_err();
    assert!(matches!(
        err,
        VmError::TooManyTemps { count: u32::MAX, max, .. } if max == schema::scope::MAX_TEMP_VARIABLES
    ));
    assert!(err.is_decode_error());
}

#[test]
fn test_empty_scope_is_fatal() {
    let bytes = write_scope(&Scope::builder("empty").temp_variables(2).build()).unwrap();
    let scope = root_scope(&bytes).unwrap();
    let err = Interpreter::new()
        .execute(scope, &mut Frame::top_level())
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Interpreter fell off the end of `empty` after 0 instructions"
    );
}

#[test]
fn test_lexical_child_executes_independently() {
    let root = Scope::builder("root")
        .lexical_child(hello_scope())
        .lexical_child(greeting_scope())
        .instruction(Instr::return_value(Operand::SelfValue))
        .build();
    let bytes = write_scope(&root).unwrap();
    let view = root_scope(&bytes).unwrap();
    let mut interpreter = Interpreter::new();

    let child = view.lexical_child(1).unwrap();
    let value = interpreter
        .execute(child, &mut Frame::top_level())
        .unwrap();
    assert_eq!(value.inspect(), "\"hello, world\"");

    let value = interpreter
        .execute(view, &mut Frame::top_level())
        .unwrap();
    assert_eq!(value.inspect(), "main");
}

#[test]
fn test_mapped_buffer_executes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("greeting.fir");
    persist(&path, &write_scope(&greeting_scope()).unwrap()).unwrap();

    let mapped = MappedScope::open(&path).unwrap();
    let value = Interpreter::new()
        .execute(mapped.root().unwrap(), &mut Frame::top_level())
        .unwrap();
    assert_eq!(value.inspect(), "\"hello, world\"");
}

#[test]
fn test_shared_buffer_across_threads() {
    let bytes = write_scope(&greeting_scope()).unwrap();

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                s.spawn(|| {
                    let scope = root_scope(&bytes).unwrap();
                    let value = Interpreter::new()
                        .execute(scope, &mut Frame::top_level())
                        .unwrap();
                    let out = value.as_string().unwrap().as_bytes().to_vec();
                    out
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), b"hello, world");
        }
    });
}
