//! Lifting an inner visitor to a whole circuit

use super::circuit::{walk_circuit, CircuitVisitor};
use super::inner::{walk_aggregate, walk_expr, InnerVisitor};
use crate::error::IrResult;
use crate::ir::circuit::{Circuit, DeclarationRef};
use crate::ir::operator::OperatorRef;

/// Circuit visitor that drives an inner visitor over every operator's
/// aggregate (when present) and then its function (when present), and over
/// the value of every declaration.
pub struct CircuitDelegateVisitor<'a, V: InnerVisitor + ?Sized> {
    inner: &'a mut V,
}

impl<'a, V: InnerVisitor + ?Sized> CircuitDelegateVisitor<'a, V> {
    /// Delegate to `inner`
    pub fn new(inner: &'a mut V) -> Self {
        Self { inner }
    }
}

impl<V: InnerVisitor + ?Sized> CircuitVisitor for CircuitDelegateVisitor<'_, V> {
    fn postorder_operator(&mut self, op: &OperatorRef) -> IrResult<()> {
        if let Some(aggregate) = op.aggregate() {
            walk_aggregate(&mut *self.inner, aggregate)?;
        }
        if let Some(function) = op.function() {
            walk_expr(&mut *self.inner, function)?;
        }
        Ok(())
    }

    fn postorder_declaration(&mut self, decl: &DeclarationRef) -> IrResult<()> {
        walk_expr(&mut *self.inner, decl.value())
    }
}

/// Run `inner` over every expression of `circuit`
pub fn visit_circuit_expressions<V: InnerVisitor + ?Sized>(
    circuit: &Circuit,
    inner: &mut V,
) -> IrResult<()> {
    walk_circuit(&mut CircuitDelegateVisitor::new(inner), circuit)
}
