//! Interpreter loop
//!
//! Runs one scope's instruction vector straight from the buffer. Each
//! instruction is fetched and decoded when `ipc` reaches it; nothing about
//! the scope is materialized up front.

use flatir_format::schema::scope::MAX_TEMP_VARIABLES;
use flatir_format::{
    FormatError, FrozenStringView, InstrView, OperandRef, OperandView, Operation, ScopeView,
    Vector,
};
use tracing::{debug, trace};

use crate::context::Frame;
use crate::dispatch::{BuiltinDispatcher, Dispatcher};
use crate::error::{VmError, VmResult};
use crate::string::{Encoding, RubyString};
use crate::value::Value;

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct Completion {
    /// Value handed to `return`
    pub value: Value,
    /// Temp registers as they were when the scope returned
    pub temps: Vec<Value>,
}

/// Result of executing a single instruction
enum InstructionResult {
    /// Continue to next instruction
    Continue,
    /// Leave the scope
    Return(Value),
}

/// Interpreter for flat IR scopes
///
/// The interpreter itself holds no per-run state, so one instance can run
/// any number of scopes one after another.
#[derive(Debug, Default)]
pub struct Interpreter<D: Dispatcher = BuiltinDispatcher> {
    dispatcher: D,
}

impl Interpreter<BuiltinDispatcher> {
    /// Create an interpreter with the builtin methods
    pub fn new() -> Self {
        Self::default()
    }
}

impl<D: Dispatcher> Interpreter<D> {
    /// Create an interpreter with a custom dispatcher
    pub fn with_dispatcher(dispatcher: D) -> Self {
        Self { dispatcher }
    }

    /// The dispatcher
    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Run `scope` and return the value it returns
    pub fn execute(&mut self, scope: ScopeView<'_>, frame: &mut Frame) -> VmResult<Value> {
        Ok(self.run(scope, frame)?.value)
    }

    /// Run `scope`, keeping the final temp registers
    pub fn run(&mut self, scope: ScopeView<'_>, frame: &mut Frame) -> VmResult<Completion> {
        let name = scope.name()?;
        let instrs = scope.instrs()?;
        let count = scope.temp_variables()?;
        if count > MAX_TEMP_VARIABLES {
            return Err(VmError::TooManyTemps {
                scope: name.to_owned(),
                count,
                max: MAX_TEMP_VARIABLES,
            });
        }
        let mut state = RunState {
            name,
            temps: vec![Value::Undefined; count as usize],
            ipc: 0,
        };

        let file = scope.file()?;
        if !file.is_empty() {
            frame.set_file(file);
        }
        debug!(
            scope = name,
            instrs = instrs.len(),
            temps = state.temps.len(),
            "enter scope"
        );

        self.run_loop(&mut state, instrs, frame)
    }

    fn run_loop<'a>(
        &mut self,
        state: &mut RunState<'_>,
        instrs: Vector<'a, InstrView<'a>>,
        frame: &mut Frame,
    ) -> VmResult<Completion> {
        while state.ipc < instrs.len() {
            let instr = instrs.get(state.ipc)?;

            match self.execute_instruction(state, instr, frame)? {
                InstructionResult::Continue => state.ipc += 1,
                InstructionResult::Return(value) => {
                    debug!(
                        scope = state.name,
                        ipc = state.ipc,
                        result = %value.inspect(),
                        "leave scope"
                    );
                    return Ok(Completion {
                        value,
                        temps: std::mem::take(&mut state.temps),
                    });
                }
            }
        }

        Err(VmError::FellOffEnd {
            scope: state.name.to_string(),
            count: instrs.len(),
        })
    }

    fn execute_instruction(
        &mut self,
        state: &mut RunState<'_>,
        instr: InstrView<'_>,
        frame: &mut Frame,
    ) -> VmResult<InstructionResult> {
        let tag = instr.operation_tag()?;
        let operation =
            Operation::from_wire(tag).map_err(|_| state.unexpected_instruction(tag))?;
        trace!(ipc = state.ipc, op = operation.name(), line = frame.line(), "execute");

        match operation {
            Operation::Copy => {
                let value = state.operand(instr, 0, operation, frame)?;
                state.store(instr, operation, value)?;
            }
            Operation::ReceiveSelf => {}
            Operation::LineNumber => frame.set_line(instr.line()?),
            Operation::Call1Obj => {
                let receiver = state.operand(instr, 0, operation, frame)?;
                let arg = state.operand(instr, 1, operation, frame)?;
                let name = instr.name()?.ok_or_else(|| {
                    VmError::malformed(operation.name(), state.ipc, "missing method name")
                })?;
                let value = self.dispatcher.call_one(&receiver, name, &arg, frame)?;
                state.store(instr, operation, value)?;
            }
            Operation::LoadImplicitClosure => {
                state.store(instr, operation, frame.block().clone())?;
            }
            Operation::LoadFrameClosure => {
                state.store(instr, operation, frame.frame_block().clone())?;
            }
            Operation::Return => {
                let value = state.operand(instr, 0, operation, frame)?;
                return Ok(InstructionResult::Return(value));
            }
            // No wire tag decodes to these
            Operation::Call0Obj | Operation::Call | Operation::Jump | Operation::Nop => {
                return Err(state.unexpected_instruction(tag));
            }
        }

        Ok(InstructionResult::Continue)
    }
}

/// Mutable state private to one run
struct RunState<'a> {
    name: &'a str,
    temps: Vec<Value>,
    ipc: usize,
}

impl RunState<'_> {
    fn unexpected_instruction(&self, tag: u8) -> VmError {
        VmError::UnexpectedInstruction {
            tag,
            ipc: self.ipc,
            scope: self.name.to_string(),
        }
    }

    fn unexpected_operand(&self, tag: u8) -> VmError {
        VmError::UnexpectedOperand {
            tag,
            ipc: self.ipc,
            scope: self.name.to_string(),
        }
    }

    /// Evaluate operand `index` of `instr`
    fn operand(
        &self,
        instr: InstrView<'_>,
        index: usize,
        operation: Operation,
        frame: &Frame,
    ) -> VmResult<Value> {
        let operands = instr.operands()?;
        if index >= operands.len() {
            return Err(VmError::malformed(
                operation.name(),
                self.ipc,
                format!("missing operand {index}"),
            ));
        }
        self.evaluate(operands.get(index)?, frame)
    }

    fn evaluate(&self, operand: OperandView<'_>, frame: &Frame) -> VmResult<Value> {
        let tag = operand.operand_type_tag()?;
        if tag == 0 {
            return Err(self.unexpected_operand(tag));
        }
        let kind = operand.kind().map_err(|err| match err {
            FormatError::UnknownOperandType(tag) => self.unexpected_operand(tag),
            other => other.into(),
        })?;

        match kind {
            OperandRef::FrozenString(s) => materialize(s),
            OperandRef::StringLiteral(s) => materialize(s.frozen()?),
            OperandRef::TemporaryVariable(t) => self.read(t.offset()?),
            OperandRef::CurrentScope => Ok(Value::Scope(frame.scope().clone())),
            OperandRef::ScopeModule => Ok(Value::Module(frame.module().clone())),
            OperandRef::SelfValue => Ok(frame.self_value().clone()),
        }
    }

    fn read(&self, index: u32) -> VmResult<Value> {
        self.temps
            .get(index as usize)
            .cloned()
            .ok_or(VmError::TempOutOfRange {
                index,
                len: self.temps.len(),
            })
    }

    /// Store `value` into the result register of `instr`
    fn store(
        &mut self,
        instr: InstrView<'_>,
        operation: Operation,
        value: Value,
    ) -> VmResult<()> {
        let result = instr.result()?.ok_or_else(|| {
            VmError::malformed(operation.name(), self.ipc, "missing result register")
        })?;
        let index = result.offset()?;
        let len = self.temps.len();
        let slot = self
            .temps
            .get_mut(index as usize)
            .ok_or(VmError::TempOutOfRange { index, len })?;
        *slot = value;
        Ok(())
    }
}

/// A fresh frozen string for every evaluation of a literal
fn materialize(s: FrozenStringView<'_>) -> VmResult<Value> {
    let encoding = Encoding::find(s.encoding()?)?;
    Ok(Value::string(RubyString::literal(
        s.bytes()?,
        encoding,
        s.coderange()?,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Block, RubyModule};
    use flatir_format::{
        FrozenString, Instr, Operand, Scope, TemporaryVariable, root_scope, write_scope,
    };

    fn t(offset: u32) -> TemporaryVariable {
        TemporaryVariable(offset)
    }

    fn run_ir(scope: &Scope, frame: &mut Frame) -> VmResult<Completion> {
        let bytes = write_scope(scope).unwrap();
        let view = root_scope(&bytes).unwrap();
        Interpreter::new().run(view, frame)
    }

    #[test]
    fn test_hello() {
        let scope = Scope::builder("hello")
            .instruction(Instr::line_number(1))
            .instruction(Instr::receive_self())
            .instruction(Instr::copy(
                t(0),
                Operand::FrozenString(FrozenString::utf8("hello")),
            ))
            .instruction(Instr::return_value(Operand::temp(0)))
            .temp_variables(1)
            .build();
        let mut frame = Frame::top_level();
        let done = run_ir(&scope, &mut frame).unwrap();

        let s = done.value.as_string().unwrap();
        assert_eq!(s.as_bytes(), b"hello");
        assert_eq!(s.encoding(), Encoding::UTF_8);
        assert!(s.is_frozen());
        assert_eq!(frame.line(), 1);
    }

    #[test]
    fn test_literals_are_fresh() {
        let literal = Operand::StringLiteral(FrozenString::utf8("x"));
        let scope = Scope::builder("fresh")
            .instruction(Instr::copy(t(0), literal.clone()))
            .instruction(Instr::copy(t(1), literal))
            .instruction(Instr::call_1obj(
                t(2),
                "equal?",
                Operand::temp(0),
                Operand::temp(1),
            ))
            .instruction(Instr::return_value(Operand::temp(2)))
            .temp_variables(3)
            .build();
        let done = run_ir(&scope, &mut Frame::top_level()).unwrap();
        assert_eq!(done.value, Value::Bool(false));
        assert_eq!(done.temps[0], done.temps[1]);
    }

    #[test]
    fn test_call_dispatch() {
        let scope = Scope::builder("concat")
            .instruction(Instr::copy(
                t(0),
                Operand::FrozenString(FrozenString::utf8("foo")),
            ))
            .instruction(Instr::call_1obj(
                t(1),
                "+",
                Operand::temp(0),
                Operand::FrozenString(FrozenString::utf8("bar")),
            ))
            .instruction(Instr::return_value(Operand::temp(1)))
            .temp_variables(2)
            .build();
        let done = run_ir(&scope, &mut Frame::top_level()).unwrap();
        assert_eq!(done.value.inspect(), "\"foobar\"");
    }

    #[test]
    fn test_ambient_operands() {
        let module = RubyModule::new("Greeter");
        let block = Block::new("caller", Value::Nil);
        let captured = Block::new("outer", Value::Nil);
        let mut frame = Frame::builder()
            .module(module.clone())
            .block(block.clone())
            .frame_block(captured.clone())
            .build();

        let scope = Scope::builder("ambient")
            .instruction(Instr::copy(t(0), Operand::CurrentScope))
            .instruction(Instr::copy(t(1), Operand::ScopeModule))
            .instruction(Instr::copy(t(2), Operand::SelfValue))
            .instruction(Instr::load_implicit_closure(t(3)))
            .instruction(Instr::load_frame_closure(t(4)))
            .instruction(Instr::return_value(Operand::temp(1)))
            .temp_variables(5)
            .build();
        let done = run_ir(&scope, &mut frame).unwrap();

        assert!(done.value.same(&Value::Module(module)));
        assert!(done.temps[0].same(&Value::Scope(frame.scope().clone())));
        assert!(done.temps[2].same(frame.self_value()));
        assert!(done.temps[3].same(&Value::Block(block)));
        assert!(done.temps[4].same(&Value::Block(captured)));
    }

    #[test]
    fn test_unset_temp_reads_undefined() {
        let scope = Scope::builder("unset")
            .instruction(Instr::return_value(Operand::temp(1)))
            .temp_variables(2)
            .build();
        let done = run_ir(&scope, &mut Frame::top_level()).unwrap();
        assert!(done.value.is_undefined());
    }

    #[test]
    fn test_empty_scope_falls_off_end() {
        let scope = Scope::builder("empty").build();
        let err = run_ir(&scope, &mut Frame::top_level()).unwrap_err();
        assert!(matches!(err, VmError::FellOffEnd { ref scope, count: 0 } if scope == "empty"));
        assert!(!err.is_decode_error());
    }

    #[test]
    fn test_missing_return_falls_off_end() {
        let scope = Scope::builder("no_return")
            .instruction(Instr::line_number(4))
            .instruction(Instr::copy(t(0), Operand::SelfValue))
            .temp_variables(1)
            .build();
        let err = run_ir(&scope, &mut Frame::top_level()).unwrap_err();
        assert!(matches!(err, VmError::FellOffEnd { count: 2, .. }));
    }

    #[test]
    fn test_temp_out_of_range() {
        let scope = Scope::builder("oob")
            .instruction(Instr::copy(t(3), Operand::SelfValue))
            .instruction(Instr::return_value(Operand::temp(3)))
            .temp_variables(1)
            .build();
        let err = run_ir(&scope, &mut Frame::top_level()).unwrap_err();
        assert!(matches!(err, VmError::TempOutOfRange { index: 3, len: 1 }));
    }

    #[test]
    fn test_malformed_instructions() {
        let scope = Scope::builder("no_operand")
            .instruction(Instr::new(Operation::Return))
            .build();
        let err = run_ir(&scope, &mut Frame::top_level()).unwrap_err();
        assert!(matches!(
            err,
            VmError::MalformedInstruction {
                operation: "return",
                ipc: 0,
                ..
            }
        ));

        let mut copy = Instr::copy(t(0), Operand::SelfValue);
        copy.result = None;
        let scope = Scope::builder("no_result")
            .instruction(Instr::receive_self())
            .instruction(copy)
            .temp_variables(1)
            .build();
        let err = run_ir(&scope, &mut Frame::top_level()).unwrap_err();
        assert!(matches!(
            err,
            VmError::MalformedInstruction {
                operation: "copy",
                ipc: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_encoding() {
        let scope = Scope::builder("enc")
            .instruction(Instr::return_value(Operand::FrozenString(
                FrozenString::new("x", "EBCDIC-XYZ"),
            )))
            .build();
        let err = run_ir(&scope, &mut Frame::top_level()).unwrap_err();
        assert!(matches!(err, VmError::UnknownEncoding(name) if name == "EBCDIC-XYZ"));
    }

    struct Recording {
        calls: Vec<String>,
    }

    impl Dispatcher for Recording {
        fn call_one(
            &mut self,
            _receiver: &Value,
            name: &str,
            arg: &Value,
            frame: &Frame,
        ) -> VmResult<Value> {
            self.calls.push(format!("{}:{name}({})", frame.line(), arg.inspect()));
            Ok(Value::Nil)
        }
    }

    #[test]
    fn test_custom_dispatcher() {
        let scope = Scope::builder("calls")
            .instruction(Instr::line_number(7))
            .instruction(Instr::call_1obj(
                t(0),
                "puts",
                Operand::SelfValue,
                Operand::FrozenString(FrozenString::utf8("hi")),
            ))
            .instruction(Instr::return_value(Operand::temp(0)))
            .temp_variables(1)
            .build();
        let bytes = write_scope(&scope).unwrap();
        let mut interpreter = Interpreter::with_dispatcher(Recording { calls: Vec::new() });
        let value = interpreter
            .execute(root_scope(&bytes).unwrap(), &mut Frame::top_level())
            .unwrap();

        assert!(value.is_nil());
        assert_eq!(interpreter.dispatcher().calls, vec!["7:puts(\"hi\")"]);
    }
}
