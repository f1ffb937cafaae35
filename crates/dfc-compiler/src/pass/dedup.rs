//! Hash-consing of expression nodes

use super::CircuitPass;
use dfc_ir::{
    Circuit, CloneVisitor, ExprRef, FunctionRewriter, InnerRewrite, InnerRewriter, IrResult, Type,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Makes structurally equal expressions physically shared.
///
/// Expressions are canonicalised bottom-up across every function and
/// declaration of the circuit. Once a node's children are canonical, the
/// node is replaced by the first canonical node it is `shallow_same` as.
/// Operators whose functions become shared are rebuilt; the graph shape is
/// unchanged.
pub struct Deduplication;

impl Deduplication {
    /// Pass name
    pub const NAME: &'static str = "dedup";
}

impl CircuitPass for Deduplication {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "Shares structurally equal sub-expressions across the circuit"
    }

    fn run(&self, circuit: &Circuit) -> IrResult<Circuit> {
        let mut visitor = CloneVisitor::new(FunctionRewriter::new(InnerRewriter::new(
            HashConsing::default(),
        )));
        let result = visitor.apply(circuit)?;
        let table = visitor.into_rewrite().into_inner().into_inner();
        log::debug!(
            "{}: {} canonical expressions, {} duplicates merged in circuit '{}'",
            Self::NAME,
            table.canonical.values().map(Vec::len).sum::<usize>(),
            table.merged,
            circuit.name()
        );
        Ok(result)
    }
}

/// Canonical nodes bucketed by kind and type
#[derive(Default)]
struct HashConsing {
    canonical: HashMap<(&'static str, Type), Vec<ExprRef>>,
    merged: usize,
}

impl InnerRewrite for HashConsing {
    fn post_rewrite(&mut self, expr: ExprRef) -> IrResult<ExprRef> {
        let bucket = self
            .canonical
            .entry((expr.kind_name(), expr.ty().clone()))
            .or_default();
        if let Some(existing) = bucket.iter().find(|c| c.shallow_same(&expr)) {
            if !Arc::ptr_eq(existing, &expr) {
                log::trace!("{}: merged {}", Deduplication::NAME, expr);
                self.merged += 1;
            }
            return Ok(Arc::clone(existing));
        }
        bucket.push(Arc::clone(&expr));
        Ok(expr)
    }
}

#[cfg(test)]
#[path = "dedup_test.rs"]
mod tests;
