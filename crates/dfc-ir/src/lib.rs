//! dfc-ir: circuit intermediate representation for the dataflow compiler
//!
//! This crate provides the typed IR a relational query is lowered into
//! (types, expressions, ZSet literals, aggregates, operators and circuits),
//! the two-layer visitor framework that traverses and rewrites it, and the
//! renderers the backends consume.

pub(crate) mod error;
pub mod ir;
pub(crate) mod jit;
pub(crate) mod render;
pub mod visit;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

pub use error::{IrError, IrResult};
pub use ir::aggregate::{Accumulator, AggregateRef, AggregateSpec};
pub use ir::circuit::{
    Circuit, CircuitBuilder, CircuitGraph, CircuitNode, Declaration, DeclarationRef, File,
    FileItem,
};
pub use ir::expr::{BinaryOp, ExprKind, ExprRef, Expression, LiteralValue, Parameter};
pub use ir::operator::{Arity, Operator, OperatorId, OperatorKind, OperatorRef};
pub use ir::types::{FloatBitWidth, IntBitWidth, ScalarKind, Type, TypeKind};
pub use ir::zset::ZSetLiteral;
pub use jit::{JitColumn, JitRowType, JitScalarType};
pub use render::{render_circuit, render_file, CircuitPrinter};
pub use visit::{
    rebuild_with_inputs, rewrite_functions, visit_circuit_expressions, walk_aggregate,
    walk_circuit, walk_declaration, walk_expr, walk_file, walk_operator, walk_type,
    CircuitDelegateVisitor, CircuitRewrite, CircuitStatistics, CircuitVisitor, CloneVisitor,
    ExpressionTransform, FunctionRewriter, InnerRewrite, InnerRewriter, InnerVisitor, NodeKey,
    RewriteMap, VisitFlow,
};
