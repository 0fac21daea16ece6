//! Human-readable listing of a scope buffer
//!
//! Rendering walks the buffer through the lazy views; it never materializes
//! the IR. Unknown tags are printed rather than rejected so that a damaged
//! buffer can still be inspected.

use crate::error::Result;
use crate::instruction::Operation;
use crate::reader::{InstrView, OperandRef, OperandView, ScopeView};
use crate::schema::OperandType;

/// Render `scope` and its lexical children
pub fn render(scope: ScopeView<'_>) -> Result<String> {
    let mut out = String::new();
    render_scope(&mut out, scope, 0)?;
    Ok(out)
}

fn render_scope(out: &mut String, scope: ScopeView<'_>, depth: usize) -> Result<()> {
    let indent = "  ".repeat(depth);
    let file = scope.file()?;
    let location = if file.is_empty() {
        String::new()
    } else {
        format!(" ({}:{})", file, scope.line()?)
    };
    out.push_str(&format!(
        "{indent}scope {:?}{location} temps={} kwargs={} closures={}\n",
        scope.name()?,
        scope.temp_variables()?,
        scope.accepts_keyword_arguments()?,
        scope.nested_closures_len()?,
    ));

    for (ipc, instr) in scope.instrs()?.iter().enumerate() {
        out.push_str(&format!("{indent}  {ipc:04}  {}\n", render_instr(instr?)?));
    }

    for child in scope.lexical_children()?.iter() {
        render_scope(out, child?, depth + 1)?;
    }
    Ok(())
}

fn render_instr(instr: InstrView<'_>) -> Result<String> {
    let tag = instr.operation_tag()?;
    let Ok(operation) = Operation::from_wire(tag) else {
        return Ok(format!("<unknown op {tag:#04x}>"));
    };

    let mut text = String::new();
    if let Some(result) = instr.result()? {
        text.push_str(&format!("%t{} = ", result.offset()?));
    }
    text.push_str(operation.name());
    if operation == Operation::LineNumber {
        text.push_str(&format!(" {}", instr.line()?));
    }
    if let Some(name) = instr.name()? {
        text.push_str(&format!(" :{name}"));
    }

    let operands = instr
        .operands()?
        .iter()
        .map(|operand| render_operand(operand?))
        .collect::<Result<Vec<_>>>()?;
    if !operands.is_empty() {
        text.push(' ');
        text.push_str(&operands.join(", "));
    }
    Ok(text)
}

fn render_operand(operand: OperandView<'_>) -> Result<String> {
    let tag = operand.operand_type_tag()?;
    match OperandType::from_byte(tag) {
        Err(_) => return Ok(format!("<unknown operand {tag}>")),
        Ok(OperandType::None) => return Ok("<none>".to_string()),
        Ok(_) => {}
    }
    Ok(match operand.kind()? {
        OperandRef::FrozenString(s) => {
            format!("frozen({:?})", String::from_utf8_lossy(s.bytes()?))
        }
        OperandRef::StringLiteral(s) => {
            format!("{:?}", String::from_utf8_lossy(s.frozen()?.bytes()?))
        }
        OperandRef::TemporaryVariable(t) => format!("%t{}", t.offset()?),
        OperandRef::CurrentScope => "%current_scope".to_string(),
        OperandRef::ScopeModule => "%scope_module".to_string(),
        OperandRef::SelfValue => "%self".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Instr;
    use crate::operand::{FrozenString, Operand, TemporaryVariable};
    use crate::reader::root_scope;
    use crate::scope::Scope;
    use crate::writer::write_scope;

    #[test]
    fn test_render_listing() {
        let child = Scope::builder("Inner")
            .instruction(Instr::return_value(Operand::ScopeModule))
            .build();
        let scope = Scope::builder("main")
            .location("demo.rb", 1)
            .instruction(Instr::line_number(1))
            .instruction(Instr::receive_self())
            .instruction(Instr::copy(
                TemporaryVariable(0),
                Operand::FrozenString(FrozenString::utf8("hi")),
            ))
            .instruction(Instr::call_1obj(
                TemporaryVariable(1),
                "+",
                Operand::temp(0),
                Operand::StringLiteral(FrozenString::utf8("!")),
            ))
            .instruction(Instr::return_value(Operand::temp(1)))
            .lexical_child(child)
            .temp_variables(2)
            .build();
        let bytes = write_scope(&scope).unwrap();
        let text = render(root_scope(&bytes).unwrap()).unwrap();

        let expected = "\
scope \"main\" (demo.rb:1) temps=2 kwargs=false closures=0
  0000  line_num 1
  0001  recv_self
  0002  %t0 = copy frozen(\"hi\")
  0003  %t1 = call_1o :+ %t0, \"!\"
  0004  return %t1
  scope \"Inner\" temps=0 kwargs=false closures=0
    0000  return %scope_module
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_render_damaged_operand_tags() {
        let scope = Scope::builder("main")
            .instruction(Instr::copy(TemporaryVariable(0), Operand::SelfValue))
            .instruction(Instr::return_value(Operand::temp(0)))
            .temp_variables(1)
            .build();
        let bytes = write_scope(&scope).unwrap();
        let tag_position = |bytes: &[u8]| {
            let buf = crate::buffer::FlatBuf::new(bytes);
            let operand = root_scope(bytes).unwrap().instr(0).unwrap().operand(0).unwrap();
            buf.field_offset(operand.location(), crate::schema::operand::OPERAND_TYPE)
                .unwrap()
                .unwrap()
        };

        let mut cleared = bytes.clone();
        let pos = tag_position(&cleared);
        cleared[pos] = 0;
        let text = render(root_scope(&cleared).unwrap()).unwrap();
        assert!(text.contains("%t0 = copy <none>"), "{text}");
        assert!(text.contains("return %t0"), "{text}");

        let mut unknown = bytes;
        let pos = tag_position(&unknown);
        unknown[pos] = 0x42;
        let text = render(root_scope(&unknown).unwrap()).unwrap();
        assert!(text.contains("%t0 = copy <unknown operand 66>"), "{text}");
    }
}
