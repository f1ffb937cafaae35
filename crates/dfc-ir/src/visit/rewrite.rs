//! Expression-level rewrites lifted to whole circuits

use super::clone::{CircuitRewrite, CloneVisitor};
use super::RewriteMap;
use crate::error::IrResult;
use crate::ir::circuit::{Circuit, DeclarationRef};
use crate::ir::expr::{ExprRef, Expression};
use crate::ir::operator::OperatorRef;
use std::sync::Arc;

/// A transformation from one expression to another
pub trait ExpressionTransform {
    /// Transform `expr`; returning `expr` itself means "unchanged"
    fn transform(&mut self, expr: &ExprRef) -> IrResult<ExprRef>;
}

impl<F> ExpressionTransform for F
where
    F: FnMut(&ExprRef) -> IrResult<ExprRef>,
{
    fn transform(&mut self, expr: &ExprRef) -> IrResult<ExprRef> {
        self(expr)
    }
}

/// Applies an [`ExpressionTransform`] to every operator function and every
/// declaration value.
///
/// Results are memoised by identity: a function shared by several operators
/// is transformed once and every operator receives the same result.
/// Graph connectivity is left alone apart from following replaced inputs.
pub struct FunctionRewriter<T> {
    transform: T,
    memo: RewriteMap<Expression>,
}

impl<T: ExpressionTransform> FunctionRewriter<T> {
    /// Rewriter applying `transform`
    pub fn new(transform: T) -> Self {
        Self {
            transform,
            memo: RewriteMap::new(),
        }
    }

    fn apply(&mut self, expr: &ExprRef) -> IrResult<ExprRef> {
        if let Some(done) = self.memo.get(expr) {
            return Ok(Arc::clone(done));
        }
        let result = self.transform.transform(expr)?;
        self.memo.insert(expr, Arc::clone(&result));
        Ok(result)
    }

    /// The transform, with whatever state it accumulated
    pub fn into_inner(self) -> T {
        self.transform
    }
}

impl<T: ExpressionTransform> CircuitRewrite for FunctionRewriter<T> {
    fn name(&self) -> &str {
        "function rewriter"
    }

    fn rewrite_operator(
        &mut self,
        op: &OperatorRef,
        inputs: Vec<OperatorRef>,
    ) -> IrResult<Option<OperatorRef>> {
        let function = op.function().map(|f| self.apply(f)).transpose()?;
        let same_function = match (op.function(), &function) {
            (Some(old), Some(new)) => Arc::ptr_eq(old, new),
            _ => true,
        };
        if same_function && op.has_inputs(&inputs) {
            return Ok(Some(Arc::clone(op)));
        }
        op.with_parts(function, op.aggregate().cloned(), inputs)
            .map(Some)
    }

    fn rewrite_declaration(&mut self, decl: &DeclarationRef) -> IrResult<Option<DeclarationRef>> {
        let value = self.apply(decl.value())?;
        if Arc::ptr_eq(&value, decl.value()) {
            Ok(Some(Arc::clone(decl)))
        } else {
            Ok(Some(decl.with_value(value)))
        }
    }
}

/// Rewrite every function and declaration of `circuit` with `transform`
pub fn rewrite_functions<T: ExpressionTransform>(
    circuit: &Circuit,
    transform: T,
) -> IrResult<Circuit> {
    CloneVisitor::new(FunctionRewriter::new(transform)).apply(circuit)
}

/// Node-level hooks of an [`InnerRewriter`]
pub trait InnerRewrite {
    /// Called before the children of `expr` are rewritten. Returning a node
    /// replaces the whole subtree without visiting it.
    fn pre_rewrite(&mut self, _expr: &ExprRef) -> IrResult<Option<ExprRef>> {
        Ok(None)
    }

    /// Called with `expr` rebuilt over its rewritten children (or `expr`
    /// itself when no child changed)
    fn post_rewrite(&mut self, expr: ExprRef) -> IrResult<ExprRef> {
        Ok(expr)
    }
}

/// Bottom-up expression rebuilder.
///
/// Children are rewritten first; a node whose children all come back
/// unchanged is kept by identity, otherwise it is rebuilt through the
/// checked constructors. Every result is memoised by the identity of the
/// original node, so shared subtrees stay shared.
pub struct InnerRewriter<R> {
    rewrite: R,
    memo: RewriteMap<Expression>,
}

impl<R: InnerRewrite> InnerRewriter<R> {
    /// Rewriter driven by `rewrite`
    pub fn new(rewrite: R) -> Self {
        Self {
            rewrite,
            memo: RewriteMap::new(),
        }
    }

    /// Rewrite `expr` and everything below it
    pub fn rewrite(&mut self, expr: &ExprRef) -> IrResult<ExprRef> {
        if let Some(done) = self.memo.get(expr) {
            return Ok(Arc::clone(done));
        }
        let result = match self.rewrite.pre_rewrite(expr)? {
            Some(replaced) => replaced,
            None => {
                let old_children = expr.children();
                let mut children = Vec::with_capacity(old_children.len());
                for child in &old_children {
                    children.push(self.rewrite(child)?);
                }
                let unchanged = old_children
                    .iter()
                    .zip(children.iter())
                    .all(|(old, new)| Arc::ptr_eq(old, new));
                let rebuilt = if unchanged {
                    Arc::clone(expr)
                } else {
                    expr.with_children(children)?
                };
                self.rewrite.post_rewrite(rebuilt)?
            }
        };
        self.memo.insert(expr, Arc::clone(&result));
        Ok(result)
    }

    /// Number of nodes rewritten to something new
    pub fn replaced(&self) -> usize {
        self.memo.replaced()
    }

    /// The hooks, with whatever state they accumulated
    pub fn into_inner(self) -> R {
        self.rewrite
    }
}

impl<R: InnerRewrite> ExpressionTransform for InnerRewriter<R> {
    fn transform(&mut self, expr: &ExprRef) -> IrResult<ExprRef> {
        self.rewrite(expr)
    }
}
