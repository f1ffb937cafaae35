use super::*;
use crate::error::{IrError, IrResult};
use crate::ir::aggregate::AggregateRef;
use crate::ir::circuit::{Circuit, CircuitBuilder, CircuitNode, DeclarationRef, File, FileItem};
use crate::ir::expr::{BinaryOp, ExprKind, ExprRef, Expression};
use crate::ir::operator::{Operator, OperatorId, OperatorKind, OperatorRef};
use crate::ir::types::Type;
use crate::test_utils::*;

/// Records every hook call as a short string
#[derive(Default)]
struct Recorder {
    events: Vec<String>,
    skip_closures: bool,
}

impl InnerVisitor for Recorder {
    fn preorder_type(&mut self, _ty: &Type) -> IrResult<VisitFlow> {
        // Types are noise for these tests
        Ok(VisitFlow::SkipChildren)
    }

    fn preorder_expr(&mut self, expr: &ExprRef) -> IrResult<VisitFlow> {
        self.events.push(format!("pre {}", expr.kind_name()));
        if self.skip_closures && matches!(expr.kind(), ExprKind::Closure { .. }) {
            return Ok(VisitFlow::SkipChildren);
        }
        Ok(VisitFlow::Continue)
    }

    fn postorder_expr(&mut self, expr: &ExprRef) -> IrResult<()> {
        self.events.push(format!("post {}", expr.kind_name()));
        Ok(())
    }

    fn preorder_aggregate(&mut self, _aggregate: &AggregateRef) -> IrResult<VisitFlow> {
        self.events.push("pre aggregate".into());
        Ok(VisitFlow::Continue)
    }

    fn postorder_aggregate(&mut self, _aggregate: &AggregateRef) -> IrResult<()> {
        self.events.push("post aggregate".into());
        Ok(())
    }
}

#[test]
fn test_walk_expr_preorder_and_postorder() {
    let mut recorder = Recorder::default();
    walk_expr(&mut recorder, &positive_first()).unwrap();
    assert_eq!(
        recorder.events,
        vec![
            "pre closure",
            "pre binary",
            "pre field",
            "pre variable",
            "post variable",
            "post field",
            "pre literal",
            "post literal",
            "post binary",
            "post closure",
        ]
    );
}

#[test]
fn test_skip_children_skips_postorder() {
    let mut recorder = Recorder {
        skip_closures: true,
        ..Default::default()
    };
    walk_expr(&mut recorder, &positive_first()).unwrap();
    assert_eq!(recorder.events, vec!["pre closure"]);
}

#[test]
fn test_walk_type_visits_nested_types() {
    #[derive(Default)]
    struct Types(Vec<String>);
    impl InnerVisitor for Types {
        fn postorder_type(&mut self, ty: &Type) -> IrResult<()> {
            self.0.push(ty.to_string());
            Ok(())
        }
    }
    let mut types = Types::default();
    walk_type(&mut types, &Type::zset(row_type(), Type::weight())).unwrap();
    assert_eq!(
        types.0,
        vec![
            "i32",
            "Option<F64>",
            "(i32, Option<F64>)",
            "i64",
            "OrdZSet<(i32, Option<F64>), i64>"
        ]
    );
}

#[test]
fn test_delegate_visits_aggregate_then_function() {
    let mut builder = CircuitBuilder::new("both");
    let source = builder.source("T", row_type()).unwrap();
    let aggregate = count_aggregate();
    builder
        .add_operator(
            OperatorKind::Aggregate,
            Type::zset(aggregate.result_type(), Type::weight()),
            Some(Expression::int32(7)),
            Some(aggregate),
            vec![source],
        )
        .unwrap();
    let circuit = builder.build();

    let mut recorder = Recorder {
        skip_closures: true,
        ..Default::default()
    };
    visit_circuit_expressions(&circuit, &mut recorder).unwrap();
    assert_eq!(
        recorder.events,
        vec![
            "pre aggregate",
            "pre literal",
            "post literal",
            "pre closure",
            "pre literal",
            "post literal",
            "post aggregate",
            "pre literal",
            "post literal",
        ]
    );
}

#[test]
fn test_delegate_visits_declarations() {
    let mut recorder = Recorder::default();
    visit_circuit_expressions(&aggregate_circuit(), &mut recorder).unwrap();
    assert_eq!(&recorder.events[..2], &["pre literal", "post literal"]);
    assert_eq!(recorder.events[2], "pre aggregate");
}

#[test]
fn test_hook_error_aborts_walk() {
    struct FailOnVariable(usize);
    impl InnerVisitor for FailOnVariable {
        fn preorder_expr(&mut self, expr: &ExprRef) -> IrResult<VisitFlow> {
            self.0 += 1;
            if matches!(expr.kind(), ExprKind::Variable(_)) {
                return Err(IrError::traversal("fail", "variables are not allowed"));
            }
            Ok(VisitFlow::Continue)
        }
    }
    let mut visitor = FailOnVariable(0);
    let err = visit_circuit_expressions(&sample_circuit(), &mut visitor).unwrap_err();
    assert!(matches!(err, IrError::TraversalFailed { .. }));
    assert_eq!(err.to_string(), "[IR003] Visitor 'fail' failed: variables are not allowed");
    // closure, field, variable; nothing after the failure
    assert_eq!(visitor.0, 3);
}

struct Identity;
impl CircuitRewrite for Identity {}

#[test]
fn test_clone_identity_reuses_every_node() {
    let circuit = aggregate_circuit();
    let cloned = CloneVisitor::new(Identity).apply(&circuit).unwrap();
    assert_eq!(cloned.name(), circuit.name());
    assert_eq!(cloned.len(), circuit.len());
    for (old, new) in circuit.nodes().iter().zip(cloned.nodes()) {
        match (old, new) {
            (CircuitNode::Operator(a), CircuitNode::Operator(b)) => assert!(Arc::ptr_eq(a, b)),
            (CircuitNode::Declaration(a), CircuitNode::Declaration(b)) => {
                assert!(Arc::ptr_eq(a, b))
            }
            _ => panic!("node kinds out of order"),
        }
    }
}

/// Replaces the source operator, forcing every reader to be rebuilt
struct RenameSource;
impl CircuitRewrite for RenameSource {
    fn rewrite_operator(
        &mut self,
        op: &OperatorRef,
        inputs: Vec<OperatorRef>,
    ) -> IrResult<Option<OperatorRef>> {
        if let OperatorKind::Source { .. } = op.kind() {
            return Operator::new(
                op.id(),
                OperatorKind::Source { name: "U".into() },
                op.output_type().clone(),
                None,
                None,
                vec![],
            )
            .map(Some);
        }
        rebuild_with_inputs(op, inputs).map(Some)
    }
}

#[test]
fn test_clone_rewires_readers_of_replaced_operator() {
    let (circuit, _) = shared_function_circuit();
    let rewritten = CloneVisitor::new(RenameSource).apply(&circuit).unwrap();
    let ops: Vec<&OperatorRef> = rewritten.operators().collect();
    assert_eq!(ops.len(), 3);
    assert_eq!(ops[0].kind(), &OperatorKind::Source { name: "U".into() });
    // Both maps read the one new source
    assert!(Arc::ptr_eq(&ops[1].inputs()[0], ops[0]));
    assert!(Arc::ptr_eq(&ops[2].inputs()[0], ops[0]));
    assert!(rewritten.validate().is_ok());
    // The original is untouched
    let original_source = circuit.operator(OperatorId(0)).unwrap();
    assert_eq!(original_source.kind(), &OperatorKind::Source { name: "T".into() });
}

#[test]
fn test_clone_repeated_node_short_circuits() {
    struct Counting(usize);
    impl CircuitRewrite for Counting {
        fn rewrite_operator(
            &mut self,
            op: &OperatorRef,
            inputs: Vec<OperatorRef>,
        ) -> IrResult<Option<OperatorRef>> {
            self.0 += 1;
            rebuild_with_inputs(op, inputs).map(Some)
        }
    }
    let sample = sample_circuit();
    let mut nodes = sample.nodes().to_vec();
    nodes.push(nodes[0].clone());
    let repeated = Circuit::new("repeated", nodes);

    let mut visitor = CloneVisitor::new(Counting(0));
    let cloned = visitor.apply(&repeated).unwrap();
    assert_eq!(cloned.len(), 4);
    assert_eq!(visitor.into_rewrite().0, 3);
}

#[test]
fn test_clone_removing_a_read_operator_fails() {
    struct DropSources;
    impl CircuitRewrite for DropSources {
        fn rewrite_operator(
            &mut self,
            op: &OperatorRef,
            inputs: Vec<OperatorRef>,
        ) -> IrResult<Option<OperatorRef>> {
            if matches!(op.kind(), OperatorKind::Source { .. }) {
                return Ok(None);
            }
            rebuild_with_inputs(op, inputs).map(Some)
        }
    }
    let err = CloneVisitor::new(DropSources)
        .apply(&sample_circuit())
        .unwrap_err();
    assert!(matches!(err, IrError::TraversalFailed { .. }));
    assert!(err.to_string().contains("removed"));
}

#[test]
fn test_clone_dropped_chain_reads_dropped_inputs() {
    // Dropping everything but the source: the map and the sink read dropped
    // operators and are dropped themselves
    struct KeepSources;
    impl CircuitRewrite for KeepSources {
        fn keep_operator(&mut self, op: &OperatorRef) -> IrResult<bool> {
            Ok(matches!(op.kind(), OperatorKind::Source { .. }))
        }
    }
    let cloned = CloneVisitor::new(KeepSources).apply(&sample_circuit()).unwrap();
    let ids: Vec<OperatorId> = cloned.operators().map(|op| op.id()).collect();
    assert_eq!(ids, vec![OperatorId(0)]);
}

#[test]
fn test_clone_kept_reader_of_dropped_operator_fails() {
    struct DropMaps;
    impl CircuitRewrite for DropMaps {
        fn keep_operator(&mut self, op: &OperatorRef) -> IrResult<bool> {
            Ok(!matches!(op.kind(), OperatorKind::Map))
        }
    }
    let err = CloneVisitor::new(DropMaps)
        .apply(&sample_circuit())
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "[IR003] Visitor 'circuit rewrite' failed: stream2 reads stream1 which was removed"
    );
}

#[test]
fn test_function_rewriter_preserves_sharing() {
    let (circuit, shared) = shared_function_circuit();
    let mut calls = 0;
    let rewritten = rewrite_functions(&circuit, |expr: &ExprRef| -> IrResult<ExprRef> {
        calls += 1;
        // Rebuild into a fresh allocation
        let children = expr.children().into_iter().cloned().collect();
        expr.with_children(children)
    })
    .unwrap();
    assert_eq!(calls, 1);

    let ops: Vec<&OperatorRef> = rewritten.operators().collect();
    assert_eq!(ops.len(), 3);
    let ids: Vec<u64> = ops.iter().map(|op| op.id().0).collect();
    assert_eq!(ids, vec![0, 1, 2]);
    let first = ops[1].function().unwrap();
    let second = ops[2].function().unwrap();
    assert!(Arc::ptr_eq(first, second));
    assert!(!Arc::ptr_eq(first, &shared));
    assert!(first.same(&shared));
}

#[test]
fn test_function_rewriter_identity_keeps_operators() {
    let circuit = aggregate_circuit();
    let rewritten = rewrite_functions(&circuit, |expr: &ExprRef| -> IrResult<ExprRef> {
        Ok(Arc::clone(expr))
    })
    .unwrap();
    for (a, b) in circuit.operators().zip(rewritten.operators()) {
        assert!(Arc::ptr_eq(a, b));
    }
}

#[test]
fn test_function_rewriter_rewrites_declarations() {
    let circuit = aggregate_circuit();
    let rewritten = rewrite_functions(&circuit, |expr: &ExprRef| -> IrResult<ExprRef> {
        Ok(match expr.as_literal() {
            Some(_) if expr.ty().same(&Type::int64(false)) => Expression::int64(2),
            _ => Arc::clone(expr),
        })
    })
    .unwrap();
    let decl: &DeclarationRef = rewritten.declarations().next().unwrap();
    assert_eq!(decl.to_string(), "let ONE: i64 = 2i64;");
}

#[test]
fn test_function_rewriter_error_discards_result() {
    let (circuit, _) = shared_function_circuit();
    let result = rewrite_functions(&circuit, |_: &ExprRef| -> IrResult<ExprRef> {
        Err(IrError::traversal("broken", "no"))
    });
    assert!(matches!(result, Err(IrError::TraversalFailed { .. })));
}

/// Swaps the operands of every addition
struct SwapAdd;
impl InnerRewrite for SwapAdd {
    fn post_rewrite(&mut self, expr: ExprRef) -> IrResult<ExprRef> {
        match expr.kind() {
            ExprKind::Binary {
                op: BinaryOp::Add,
                left,
                right,
            } => Expression::binary(BinaryOp::Add, right.clone(), left.clone()),
            _ => Ok(expr),
        }
    }
}

#[test]
fn test_inner_rewriter_keeps_unchanged_subtrees() {
    let mut rewriter = InnerRewriter::new(SwapAdd);
    let closure = project_first();
    let same = rewriter.rewrite(&closure).unwrap();
    assert!(Arc::ptr_eq(&same, &closure));
    assert_eq!(rewriter.replaced(), 0);
}

#[test]
fn test_inner_rewriter_shares_rewritten_nodes() {
    let shared = Expression::binary(BinaryOp::Add, Expression::int32(1), Expression::int32(2))
        .unwrap();
    let outer = Expression::binary(BinaryOp::Mul, shared.clone(), shared).unwrap();

    let mut rewriter = InnerRewriter::new(SwapAdd);
    let rewritten = rewriter.rewrite(&outer).unwrap();
    assert_eq!(rewritten.to_string(), "((2i32 + 1i32) * (2i32 + 1i32))");
    let children = rewritten.children();
    assert!(Arc::ptr_eq(children[0], children[1]));
}

#[test]
fn test_clone_file() {
    let file = File::new(vec![
        FileItem::Declaration(crate::ir::circuit::Declaration::new(
            "X",
            Expression::bool(true),
        )),
        FileItem::Circuit(sample_circuit()),
        FileItem::Circuit(aggregate_circuit()),
    ]);
    let cloned = CloneVisitor::new(Identity).apply_file(&file).unwrap();
    assert_eq!(cloned.items().len(), 3);
    let names: Vec<&str> = cloned.circuits().map(|c| c.name()).collect();
    assert_eq!(names, vec!["sample", "counts"]);
}

#[test]
fn test_statistics() {
    let (circuit, _) = shared_function_circuit();
    let stats = CircuitStatistics::collect(&circuit).unwrap();
    assert_eq!(stats.operators, 3);
    assert_eq!(stats.declarations, 0);
    // closure, field, variable reached through both maps
    assert_eq!(stats.expression_visits, 6);
    assert_eq!(stats.distinct_expressions, 3);

    let stats = CircuitStatistics::collect(&aggregate_circuit()).unwrap();
    assert_eq!(stats.aggregates, 1);
    assert_eq!(stats.declarations, 1);
}

#[test]
fn test_rewrite_map_is_keyed_by_identity() {
    let a = Expression::int32(1);
    let b = Expression::int32(1);
    let mut map: RewriteMap<Expression> = RewriteMap::new();
    map.insert(&a, Expression::int32(2));
    assert!(map.contains(&a));
    assert!(!map.contains(&b));
    assert!(map.contains(&Arc::clone(&a)));
    assert_eq!(map.len(), 1);
    assert_eq!(map.replaced(), 1);
}
