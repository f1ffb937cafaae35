//! Compile-time evaluation of constant sub-expressions

use super::CircuitPass;
use dfc_ir::{
    BinaryOp, Circuit, CloneVisitor, ExprKind, ExprRef, Expression, FunctionRewriter,
    InnerRewrite, InnerRewriter, IrResult, LiteralValue,
};
use std::sync::Arc;

/// Folds constant sub-expressions of every function and declaration.
///
/// Two rewrites are applied bottom-up, so folds cascade:
/// - a binary operation over two non-null integer or boolean literals
///   becomes a literal of the operation's type;
/// - a field access on a tuple construction becomes the selected field.
///
/// Integer operations that overflow the operand type, and division by
/// zero, are left in place.
pub struct ConstantFolding;

impl ConstantFolding {
    /// Pass name
    pub const NAME: &'static str = "constant_fold";
}

impl CircuitPass for ConstantFolding {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "Evaluates operations on literals and projections of tuple constructions"
    }

    fn run(&self, circuit: &Circuit) -> IrResult<Circuit> {
        let mut visitor =
            CloneVisitor::new(FunctionRewriter::new(InnerRewriter::new(Folder::default())));
        let result = visitor.apply(circuit)?;
        let folder = visitor.into_rewrite().into_inner().into_inner();
        log::debug!(
            "{}: folded {} expressions in circuit '{}'",
            Self::NAME,
            folder.folded,
            circuit.name()
        );
        Ok(result)
    }
}

#[derive(Default)]
struct Folder {
    folded: usize,
}

impl InnerRewrite for Folder {
    fn post_rewrite(&mut self, expr: ExprRef) -> IrResult<ExprRef> {
        let folded = match expr.kind() {
            ExprKind::Binary { op, left, right } => fold_binary(*op, left, right, &expr),
            ExprKind::Field { tuple, index } => fold_field(tuple, *index, &expr),
            _ => None,
        };
        match folded {
            Some(replacement) => {
                log::trace!("{}: {} => {}", ConstantFolding::NAME, expr, replacement);
                self.folded += 1;
                Ok(replacement)
            }
            None => Ok(expr),
        }
    }
}

fn fold_binary(op: BinaryOp, left: &ExprRef, right: &ExprRef, expr: &ExprRef) -> Option<ExprRef> {
    let value = evaluate(op, left.as_literal()?, right.as_literal()?)?;
    // A result outside the operand width fails literal construction
    Expression::literal(value, expr.ty().clone()).ok()
}

fn evaluate(op: BinaryOp, left: &LiteralValue, right: &LiteralValue) -> Option<LiteralValue> {
    match (left, right) {
        (LiteralValue::Integer(a), LiteralValue::Integer(b)) => {
            let (a, b) = (*a, *b);
            match op {
                BinaryOp::Add => a.checked_add(b).map(LiteralValue::Integer),
                BinaryOp::Sub => a.checked_sub(b).map(LiteralValue::Integer),
                BinaryOp::Mul => a.checked_mul(b).map(LiteralValue::Integer),
                BinaryOp::Div => a.checked_div(b).map(LiteralValue::Integer),
                BinaryOp::Eq => Some(LiteralValue::Bool(a == b)),
                BinaryOp::NotEq => Some(LiteralValue::Bool(a != b)),
                BinaryOp::Lt => Some(LiteralValue::Bool(a < b)),
                BinaryOp::LtEq => Some(LiteralValue::Bool(a <= b)),
                BinaryOp::Gt => Some(LiteralValue::Bool(a > b)),
                BinaryOp::GtEq => Some(LiteralValue::Bool(a >= b)),
                BinaryOp::And | BinaryOp::Or => None,
            }
        }
        (LiteralValue::Bool(a), LiteralValue::Bool(b)) => match op {
            BinaryOp::And => Some(LiteralValue::Bool(*a && *b)),
            BinaryOp::Or => Some(LiteralValue::Bool(*a || *b)),
            BinaryOp::Eq => Some(LiteralValue::Bool(a == b)),
            BinaryOp::NotEq => Some(LiteralValue::Bool(a != b)),
            _ => None,
        },
        _ => None,
    }
}

fn fold_field(tuple: &ExprRef, index: usize, expr: &ExprRef) -> Option<ExprRef> {
    let target = match tuple.kind() {
        ExprKind::Deref(inner) => inner,
        _ => tuple,
    };
    let ExprKind::Tuple(fields) = target.kind() else {
        return None;
    };
    let field = fields.get(index)?;
    // Fields read through a nullable tuple are nullable; keep those accesses
    if field.ty().same(expr.ty()) {
        Some(Arc::clone(field))
    } else {
        None
    }
}

#[cfg(test)]
#[path = "constant_fold_test.rs"]
mod tests;
