//! Shared test utilities for dfc-compiler

use dfc_ir::test_utils::{positive_first, project_first, row_ref_type, row_type, row_var};
use dfc_ir::{Circuit, CircuitBuilder, ExprRef, Expression, Parameter};

/// `t.0` over the row variable
pub fn first_field() -> ExprRef {
    Expression::field(row_var(), 0).unwrap()
}

/// `move |t: &(i32, Option<F64>)| { body }`
pub fn row_closure(body: ExprRef) -> ExprRef {
    Expression::closure(vec![Parameter::new("t", row_ref_type())], body)
}

/// `T -> map(function) -> sink V`
pub fn map_circuit(name: &str, function: ExprRef) -> Circuit {
    let mut builder = CircuitBuilder::new(name);
    let source = builder.source("T", row_type()).unwrap();
    let mapped = builder.map(&source, function).unwrap();
    builder.sink("V", &mapped).unwrap();
    builder.build()
}

/// `T -> filter(predicate) -> sink V`
pub fn filter_circuit(name: &str, predicate: ExprRef) -> Circuit {
    let mut builder = CircuitBuilder::new(name);
    let source = builder.source("T", row_type()).unwrap();
    let filtered = builder.filter(&source, predicate).unwrap();
    builder.sink("V", &filtered).unwrap();
    builder.build()
}

/// `T -> map(t.0) -> sink V`, plus a filter on `T` nothing reads.
///
/// Operator ids: source 0, map 1, filter 2, sink 3.
pub fn circuit_with_dead_branch() -> Circuit {
    let mut builder = CircuitBuilder::new("dead_branch");
    let source = builder.source("T", row_type()).unwrap();
    let used = builder.map(&source, project_first()).unwrap();
    builder.filter(&source, positive_first()).unwrap();
    builder.sink("V", &used).unwrap();
    builder.build()
}

/// Two sinks fed by maps whose functions are equal but built separately
pub fn duplicated_projection_circuit() -> Circuit {
    let mut builder = CircuitBuilder::new("duplicates");
    let source = builder.source("T", row_type()).unwrap();
    let left = builder.map(&source, project_first()).unwrap();
    let right = builder.map(&source, project_first()).unwrap();
    builder.sink("L", &left).unwrap();
    builder.sink("R", &right).unwrap();
    builder.build()
}
