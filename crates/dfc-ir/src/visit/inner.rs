//! Visitor over inner nodes: types, expressions and aggregates

use super::VisitFlow;
use crate::error::IrResult;
use crate::ir::aggregate::AggregateRef;
use crate::ir::expr::ExprRef;
use crate::ir::types::Type;

/// Hooks called while walking inner nodes.
///
/// Every hook has a no-op default, so implementors override only the node
/// categories they care about. Drive a visitor with [`walk_type`],
/// [`walk_expr`] or [`walk_aggregate`].
pub trait InnerVisitor {
    /// Before the nested types of `ty`
    fn preorder_type(&mut self, _ty: &Type) -> IrResult<VisitFlow> {
        Ok(VisitFlow::Continue)
    }

    /// After the nested types of `ty`
    fn postorder_type(&mut self, _ty: &Type) -> IrResult<()> {
        Ok(())
    }

    /// Before the type and sub-expressions of `expr`
    fn preorder_expr(&mut self, _expr: &ExprRef) -> IrResult<VisitFlow> {
        Ok(VisitFlow::Continue)
    }

    /// After the type and sub-expressions of `expr`
    fn postorder_expr(&mut self, _expr: &ExprRef) -> IrResult<()> {
        Ok(())
    }

    /// Before the accumulators of `aggregate`
    fn preorder_aggregate(&mut self, _aggregate: &AggregateRef) -> IrResult<VisitFlow> {
        Ok(VisitFlow::Continue)
    }

    /// After the accumulators of `aggregate`
    fn postorder_aggregate(&mut self, _aggregate: &AggregateRef) -> IrResult<()> {
        Ok(())
    }
}

/// Walk `ty` and its nested types depth-first
pub fn walk_type<V: InnerVisitor + ?Sized>(visitor: &mut V, ty: &Type) -> IrResult<()> {
    if visitor.preorder_type(ty)? == VisitFlow::SkipChildren {
        return Ok(());
    }
    for child in ty.children() {
        walk_type(visitor, child)?;
    }
    visitor.postorder_type(ty)
}

/// Walk `expr`: its type first, then its sub-expressions in order
pub fn walk_expr<V: InnerVisitor + ?Sized>(visitor: &mut V, expr: &ExprRef) -> IrResult<()> {
    if visitor.preorder_expr(expr)? == VisitFlow::SkipChildren {
        return Ok(());
    }
    walk_type(visitor, expr.ty())?;
    for child in expr.children() {
        walk_expr(visitor, child)?;
    }
    visitor.postorder_expr(expr)
}

/// Walk every expression of every accumulator of `aggregate`
pub fn walk_aggregate<V: InnerVisitor + ?Sized>(
    visitor: &mut V,
    aggregate: &AggregateRef,
) -> IrResult<()> {
    if visitor.preorder_aggregate(aggregate)? == VisitFlow::SkipChildren {
        return Ok(());
    }
    for expr in aggregate.children() {
        walk_expr(visitor, expr)?;
    }
    visitor.postorder_aggregate(aggregate)
}
