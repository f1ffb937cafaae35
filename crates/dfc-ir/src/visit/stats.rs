//! Node counts of a circuit

use super::delegate::visit_circuit_expressions;
use super::inner::InnerVisitor;
use super::{NodeKey, VisitFlow};
use crate::error::IrResult;
use crate::ir::aggregate::AggregateRef;
use crate::ir::circuit::Circuit;
use crate::ir::expr::ExprRef;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Size summary of a circuit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CircuitStatistics {
    /// Operators
    pub operators: usize,
    /// Top-level declarations
    pub declarations: usize,
    /// Aggregates attached to operators
    pub aggregates: usize,
    /// Expression nodes reached, counting a shared node once per path
    pub expression_visits: usize,
    /// Physically distinct expression nodes
    pub distinct_expressions: usize,
}

impl CircuitStatistics {
    /// Count the nodes of `circuit`
    pub fn collect(circuit: &Circuit) -> IrResult<Self> {
        let mut counter = ExpressionCounter::default();
        visit_circuit_expressions(circuit, &mut counter)?;
        Ok(Self {
            operators: circuit.operators().count(),
            declarations: circuit.declarations().count(),
            aggregates: counter.aggregates,
            expression_visits: counter.visits,
            distinct_expressions: counter.seen.len(),
        })
    }
}

impl fmt::Display for CircuitStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} operators, {} declarations, {} aggregates, {} expressions ({} distinct)",
            self.operators,
            self.declarations,
            self.aggregates,
            self.expression_visits,
            self.distinct_expressions
        )
    }
}

#[derive(Default)]
struct ExpressionCounter {
    visits: usize,
    aggregates: usize,
    seen: HashSet<NodeKey>,
}

impl InnerVisitor for ExpressionCounter {
    fn preorder_expr(&mut self, expr: &ExprRef) -> IrResult<VisitFlow> {
        self.visits += 1;
        self.seen.insert(NodeKey::of(expr));
        Ok(VisitFlow::Continue)
    }

    fn preorder_aggregate(&mut self, _aggregate: &AggregateRef) -> IrResult<VisitFlow> {
        self.aggregates += 1;
        Ok(VisitFlow::Continue)
    }
}
