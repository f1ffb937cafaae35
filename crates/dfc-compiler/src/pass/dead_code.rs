//! Dead operator elimination

use super::CircuitPass;
use dfc_ir::{Circuit, CircuitRewrite, CloneVisitor, IrResult, OperatorId, OperatorRef};
use std::collections::HashSet;

/// Removes every operator whose output cannot reach a sink.
///
/// Survivors keep their relative order and ids; declarations are kept.
pub struct DeadCodeElimination;

impl DeadCodeElimination {
    /// Pass name
    pub const NAME: &'static str = "dead_code";
}

impl CircuitPass for DeadCodeElimination {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "Removes operators whose output never reaches a sink"
    }

    fn run(&self, circuit: &Circuit) -> IrResult<Circuit> {
        let graph = circuit.graph()?;
        let live = graph.reaching(circuit.sinks().map(|sink| sink.id()));
        let total = circuit.operators().count();
        if live.is_empty() && total > 0 {
            log::warn!(
                "Circuit '{}' has no sinks; removing all {} operators",
                circuit.name(),
                total
            );
        }
        log::debug!(
            "{}: {} of {} operators live in circuit '{}'",
            Self::NAME,
            live.len(),
            total,
            circuit.name()
        );
        CloneVisitor::new(KeepLive { live }).apply(circuit)
    }
}

struct KeepLive {
    live: HashSet<OperatorId>,
}

impl CircuitRewrite for KeepLive {
    fn name(&self) -> &str {
        DeadCodeElimination::NAME
    }

    fn keep_operator(&mut self, op: &OperatorRef) -> IrResult<bool> {
        Ok(self.live.contains(&op.id()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use dfc_ir::test_utils::{aggregate_circuit, project_first, row_type, sample_circuit};
    use dfc_ir::{CircuitBuilder, ExprRef, Expression, Parameter, Type};
    use std::sync::Arc;

    /// `move |x: &i32| -> bool { true }`
    fn keep_all_ints() -> ExprRef {
        Expression::closure(
            vec![Parameter::new("x", Type::reference(Type::int32(false), false))],
            Expression::bool(true),
        )
    }

    #[test]
    fn test_removes_unreachable_branch() {
        let circuit = circuit_with_dead_branch();
        let result = DeadCodeElimination.run(&circuit).unwrap();
        let ids: Vec<u64> = result.operators().map(|op| op.id().0).collect();
        assert_eq!(ids, vec![0, 1, 3]);
        assert!(result.validate().is_ok());
    }

    #[test]
    fn test_live_operators_are_shared() {
        let circuit = circuit_with_dead_branch();
        let result = DeadCodeElimination.run(&circuit).unwrap();
        for op in result.operators() {
            let original = circuit.operator(op.id()).unwrap();
            assert!(Arc::ptr_eq(op, original));
        }
    }

    #[test]
    fn test_fully_live_circuit_unchanged() {
        let circuit = sample_circuit();
        let result = DeadCodeElimination.run(&circuit).unwrap();
        assert_eq!(result.len(), circuit.len());
        assert_eq!(result.to_string(), circuit.to_string());
    }

    #[test]
    fn test_declarations_survive() {
        let circuit = aggregate_circuit();
        let result = DeadCodeElimination.run(&circuit).unwrap();
        assert_eq!(result.declarations().count(), 1);
        assert_eq!(result.operators().count(), 3);
    }

    #[test]
    fn test_no_sinks_removes_everything() {
        let (circuit, _) = dfc_ir::test_utils::shared_function_circuit();
        let result = DeadCodeElimination.run(&circuit).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.name(), "shared");
    }

    #[test]
    fn test_dead_chain_removed_with_live_branch() {
        let mut builder = CircuitBuilder::new("dead_chain");
        let source = builder.source("T", row_type()).unwrap();
        builder.sink("OUT", &source).unwrap();
        let mapped = builder.map(&source, project_first()).unwrap();
        builder.filter(&mapped, keep_all_ints()).unwrap();
        let circuit = builder.build();

        let result = DeadCodeElimination.run(&circuit).unwrap();
        let ids: Vec<u64> = result.operators().map(|op| op.id().0).collect();
        assert_eq!(ids, vec![0, 1]);
        assert!(result.validate().is_ok());
    }
}
