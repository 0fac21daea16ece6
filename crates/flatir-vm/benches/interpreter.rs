//! Interpreter Loop Benchmarks
//!
//! Measures straight-line execution from an in-memory buffer, including the
//! per-evaluation string materialization of literals.

use criterion::{Criterion, criterion_group, criterion_main};
use flatir_format::{
    FrozenString, Instr, Operand, Scope, TemporaryVariable, root_scope, write_scope,
};
use flatir_vm::{Frame, Interpreter};
use std::hint::black_box;

/// `n` concatenations of a literal onto a running string
fn concat_scope(n: u32) -> Scope {
    let mut builder = Scope::builder("concat")
        .instruction(Instr::receive_self())
        .instruction(Instr::copy(
            TemporaryVariable(0),
            Operand::StringLiteral(FrozenString::utf8("")),
        ));
    for i in 0..n {
        builder = builder
            .instruction(Instr::line_number(i + 1))
            .instruction(Instr::call_1obj(
                TemporaryVariable(0),
                "+",
                Operand::temp(0),
                Operand::FrozenString(FrozenString::utf8("x")),
            ));
    }
    builder
        .instruction(Instr::return_value(Operand::temp(0)))
        .temp_variables(1)
        .build()
}

/// Benchmark: copy-heavy body with no calls
fn bench_copy_chain(c: &mut Criterion) {
    let mut builder = Scope::builder("copies").instruction(Instr::copy(
        TemporaryVariable(0),
        Operand::SelfValue,
    ));
    for i in 1..256 {
        builder = builder.instruction(Instr::copy(TemporaryVariable(i), Operand::temp(i - 1)));
    }
    let scope = builder
        .instruction(Instr::return_value(Operand::temp(255)))
        .temp_variables(256)
        .build();
    let bytes = write_scope(&scope).unwrap();

    c.bench_function("copy_chain_256", |b| {
        let mut interpreter = Interpreter::new();
        b.iter(|| {
            let scope = root_scope(black_box(&bytes)).unwrap();
            let mut frame = Frame::top_level();
            black_box(interpreter.execute(scope, &mut frame).unwrap())
        })
    });
}

/// Benchmark: builtin dispatch of `String#+`
fn bench_string_concat(c: &mut Criterion) {
    let bytes = write_scope(&concat_scope(100)).unwrap();

    c.bench_function("string_concat_100", |b| {
        let mut interpreter = Interpreter::new();
        b.iter(|| {
            let scope = root_scope(black_box(&bytes)).unwrap();
            let mut frame = Frame::top_level();
            black_box(interpreter.execute(scope, &mut frame).unwrap())
        })
    });
}

criterion_group!(benches, bench_copy_chain, bench_string_concat);
criterion_main!(benches);
