use super::*;
use crate::test_utils::*;
use dfc_ir::test_utils::sample_circuit;
use dfc_ir::{BinaryOp, CircuitStatistics, ExprKind, Expression, LiteralValue, OperatorId};

fn function_of(circuit: &Circuit, id: u64) -> ExprRef {
    Arc::clone(circuit.operator(OperatorId(id)).unwrap().function().unwrap())
}

fn closure_body(function: &ExprRef) -> ExprRef {
    match function.kind() {
        ExprKind::Closure { body, .. } => Arc::clone(body),
        _ => panic!("not a closure: {function}"),
    }
}

#[test]
fn test_equal_functions_become_one_instance() {
    let circuit = duplicated_projection_circuit();
    assert!(!Arc::ptr_eq(&function_of(&circuit, 1), &function_of(&circuit, 2)));

    let result = Deduplication.run(&circuit).unwrap();
    assert!(Arc::ptr_eq(&function_of(&result, 1), &function_of(&result, 2)));
    // The first occurrence is the canonical one
    assert!(Arc::ptr_eq(
        result.operator(OperatorId(1)).unwrap(),
        circuit.operator(OperatorId(1)).unwrap()
    ));
    assert!(result.validate().is_ok());
}

#[test]
fn test_distinct_node_count_drops() {
    let circuit = duplicated_projection_circuit();
    let before = CircuitStatistics::collect(&circuit).unwrap();
    let result = Deduplication.run(&circuit).unwrap();
    let after = CircuitStatistics::collect(&result).unwrap();

    assert_eq!(before.distinct_expressions, 6);
    assert_eq!(after.distinct_expressions, 3);
    assert_eq!(after.expression_visits, before.expression_visits);
    assert_eq!(after.operators, before.operators);
}

#[test]
fn test_equal_operands_within_one_expression() {
    let body = Expression::binary(BinaryOp::Add, first_field(), first_field()).unwrap();
    let circuit = map_circuit("twice", row_closure(body));

    let result = Deduplication.run(&circuit).unwrap();
    let body = closure_body(&function_of(&result, 1));
    let ExprKind::Binary { left, right, .. } = body.kind() else {
        panic!("body is not a binary expression");
    };
    assert!(Arc::ptr_eq(left, right));
}

#[test]
fn test_different_payloads_stay_apart() {
    let plus = |n: i32| {
        row_closure(Expression::binary(BinaryOp::Add, first_field(), Expression::int32(n)).unwrap())
    };
    let mut builder = dfc_ir::CircuitBuilder::new("apart");
    let source = builder.source("T", dfc_ir::test_utils::row_type()).unwrap();
    let one = builder.map(&source, plus(1)).unwrap();
    let two = builder.map(&source, plus(2)).unwrap();
    builder.sink("A", &one).unwrap();
    builder.sink("B", &two).unwrap();
    let circuit = builder.build();

    let result = Deduplication.run(&circuit).unwrap();
    let (a, b) = (function_of(&result, 1), function_of(&result, 2));
    assert!(!Arc::ptr_eq(&a, &b));
    let (body_a, body_b) = (closure_body(&a), closure_body(&b));
    let (ExprKind::Binary { left: la, .. }, ExprKind::Binary { left: lb, .. }) =
        (body_a.kind(), body_b.kind())
    else {
        panic!("bodies are not binary expressions");
    };
    // `t.0` is shared, the literals are not
    assert!(Arc::ptr_eq(la, lb));
}

#[test]
fn test_nullability_keeps_literals_apart() {
    let nullable_one =
        Expression::literal(LiteralValue::Integer(1), dfc_ir::Type::int32(true)).unwrap();
    let pair = Expression::tuple(vec![Expression::int32(1), nullable_one]);
    let circuit = map_circuit("nullability", row_closure(pair));

    let result = Deduplication.run(&circuit).unwrap();
    let body = closure_body(&function_of(&result, 1));
    let ExprKind::Tuple(fields) = body.kind() else {
        panic!("body is not a tuple");
    };
    assert!(!Arc::ptr_eq(&fields[0], &fields[1]));
}

#[test]
fn test_second_run_changes_nothing() {
    let once = Deduplication.run(&duplicated_projection_circuit()).unwrap();
    let twice = Deduplication.run(&once).unwrap();
    for (a, b) in once.operators().zip(twice.operators()) {
        assert!(Arc::ptr_eq(a, b));
    }
}

#[test]
fn test_already_unique_circuit_is_shared() {
    let circuit = sample_circuit();
    let result = Deduplication.run(&circuit).unwrap();
    for (a, b) in circuit.operators().zip(result.operators()) {
        assert!(Arc::ptr_eq(a, b));
    }
}

#[test]
fn test_signed_zeros_stay_apart() {
    let mut builder = dfc_ir::CircuitBuilder::new("zeros");
    builder.add_declaration("POS", Expression::double(0.0));
    builder.add_declaration("NEG", Expression::double(-0.0));
    let circuit = builder.build();

    let result = Deduplication.run(&circuit).unwrap();
    let rendered: Vec<String> = result.declarations().map(|d| d.to_string()).collect();
    assert_eq!(
        rendered,
        vec!["let POS: F64 = F64::new(0.0);", "let NEG: F64 = F64::new(-0.0);"]
    );
}
