//! Shared test utilities for dfc-ir

use crate::ir::aggregate::{Accumulator, AggregateRef, AggregateSpec};
use crate::ir::circuit::{Circuit, CircuitBuilder};
use crate::ir::expr::{BinaryOp, ExprRef, Expression, LiteralValue, Parameter};
use crate::ir::operator::OperatorKind;
use crate::ir::types::Type;

/// `(i32, Option<F64>)`
pub fn row_type() -> Type {
    Type::tuple(vec![Type::int32(false), Type::double(true)])
}

/// `&(i32, Option<F64>)`, the parameter type of row closures
pub fn row_ref_type() -> Type {
    Type::reference(row_type(), false)
}

/// Nullable DOUBLE literal
pub fn nullable_double(value: Option<f64>) -> ExprRef {
    match value {
        Some(x) => Expression::literal(LiteralValue::Float(x), Type::double(true)).unwrap(),
        None => Expression::null(Type::double(true)).unwrap(),
    }
}

/// A row of [`row_type`]
pub fn row(first: i32, second: Option<f64>) -> ExprRef {
    Expression::tuple_typed(
        row_type(),
        vec![Expression::int32(first), nullable_double(second)],
    )
    .unwrap()
}

/// Row variable `t` of type [`row_ref_type`]
pub fn row_var() -> ExprRef {
    Expression::variable("t", row_ref_type())
}

/// `move |t: &(i32, Option<F64>)| -> i32 { t.0 }`
pub fn project_first() -> ExprRef {
    Expression::closure(
        vec![Parameter::new("t", row_ref_type())],
        Expression::field(row_var(), 0).unwrap(),
    )
}

/// `move |t: &(i32, Option<F64>)| -> bool { (t.0 > 0i32) }`
pub fn positive_first() -> ExprRef {
    let first = Expression::field(row_var(), 0).unwrap();
    Expression::closure(
        vec![Parameter::new("t", row_ref_type())],
        Expression::binary(BinaryOp::Gt, first, Expression::int32(0)).unwrap(),
    )
}

/// Row counter: `0i64`, `|acc, t| acc + 1`, empty result `0i64`
pub fn count_accumulator() -> Accumulator {
    let acc = Expression::variable("acc", Type::int64(false));
    let increment = Expression::closure(
        vec![
            Parameter::new("acc", Type::int64(false)),
            Parameter::new("t", row_ref_type()),
        ],
        Expression::binary(BinaryOp::Add, acc, Expression::int64(1)).unwrap(),
    );
    Accumulator::new(Type::int64(false).zero().unwrap(), increment, None, Expression::int64(0))
        .unwrap()
}

/// Aggregate with a single [`count_accumulator`]
pub fn count_aggregate() -> AggregateRef {
    AggregateSpec::new(vec![count_accumulator()]).unwrap()
}

/// `T -> map(t.0) -> sink V`
pub fn sample_circuit() -> Circuit {
    let mut builder = CircuitBuilder::new("sample");
    let source = builder.source("T", row_type()).unwrap();
    let mapped = builder.map(&source, project_first()).unwrap();
    builder.sink("V", &mapped).unwrap();
    builder.build()
}

/// A source and two maps that share one function instance.
///
/// Returns the circuit and the shared function.
pub fn shared_function_circuit() -> (Circuit, ExprRef) {
    let shared = project_first();
    let mut builder = CircuitBuilder::new("shared");
    let source = builder.source("T", row_type()).unwrap();
    builder.map(&source, shared.clone()).unwrap();
    builder.map(&source, shared.clone()).unwrap();
    (builder.build(), shared)
}

/// `T -> aggregate(count) -> sink C`, plus a declaration
pub fn aggregate_circuit() -> Circuit {
    let mut builder = CircuitBuilder::new("counts");
    builder.add_declaration("ONE", Expression::int64(1));
    let source = builder.source("T", row_type()).unwrap();
    let aggregate = count_aggregate();
    let output_type = Type::zset(aggregate.result_type(), Type::weight());
    let counted = builder
        .add_operator(
            OperatorKind::Aggregate,
            output_type,
            None,
            Some(aggregate),
            vec![source],
        )
        .unwrap();
    builder.sink("C", &counted).unwrap();
    builder.build()
}
