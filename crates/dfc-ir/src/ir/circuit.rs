//! Circuits, declarations, and files
//!
//! A circuit is an ordered list of top-level nodes. The order is kept
//! verbatim by construction and by every pass; it is the traversal and
//! rendering order. Operators reference their inputs through `Arc`, so the
//! circuit is a DAG in which sharing by identity is meaningful.

use super::aggregate::AggregateRef;
use super::expr::{ExprRef, Expression};
use super::operator::{Operator, OperatorId, OperatorKind, OperatorRef};
use super::types::Type;
use super::zset::ZSetLiteral;
use crate::error::{IrError, IrResult};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Shared handle to a declaration
pub type DeclarationRef = Arc<Declaration>;

/// A named constant visible to every operator of a circuit
#[derive(Debug)]
pub struct Declaration {
    name: String,
    value: ExprRef,
}

impl Declaration {
    /// Create a declaration
    pub fn new(name: impl Into<String>, value: ExprRef) -> DeclarationRef {
        Arc::new(Self {
            name: name.into(),
            value,
        })
    }

    /// Declared name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bound value
    pub fn value(&self) -> &ExprRef {
        &self.value
    }

    /// Type of the bound value
    pub fn ty(&self) -> &Type {
        self.value.ty()
    }

    /// Replacement bound to `value`
    pub fn with_value(&self, value: ExprRef) -> DeclarationRef {
        Self::new(self.name.clone(), value)
    }

    /// Variable expression referring to this declaration
    pub fn reference(&self) -> ExprRef {
        Expression::variable(self.name.clone(), self.value.ty().clone())
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "let {}: {} = {};", self.name, self.value.ty(), self.value)
    }
}

/// A top-level node of a circuit
#[derive(Debug, Clone)]
pub enum CircuitNode {
    /// Named constant
    Declaration(DeclarationRef),
    /// Graph node
    Operator(OperatorRef),
}

/// A named operator graph
#[derive(Debug, Clone)]
pub struct Circuit {
    name: String,
    nodes: Vec<CircuitNode>,
}

impl Circuit {
    /// Create a circuit from its nodes, in order.
    ///
    /// No checks are made beyond those of the nodes' own constructors; see
    /// [`Circuit::validate`].
    pub fn new(name: impl Into<String>, nodes: Vec<CircuitNode>) -> Self {
        Self {
            name: name.into(),
            nodes,
        }
    }

    /// Circuit name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Top-level nodes in insertion order
    pub fn nodes(&self) -> &[CircuitNode] {
        &self.nodes
    }

    /// Operators in insertion order
    pub fn operators(&self) -> impl Iterator<Item = &OperatorRef> + '_ {
        self.nodes.iter().filter_map(|node| match node {
            CircuitNode::Operator(op) => Some(op),
            CircuitNode::Declaration(_) => None,
        })
    }

    /// Declarations in insertion order
    pub fn declarations(&self) -> impl Iterator<Item = &DeclarationRef> + '_ {
        self.nodes.iter().filter_map(|node| match node {
            CircuitNode::Declaration(decl) => Some(decl),
            CircuitNode::Operator(_) => None,
        })
    }

    /// Look up an operator by id
    pub fn operator(&self, id: OperatorId) -> Option<&OperatorRef> {
        self.operators().find(|op| op.id() == id)
    }

    /// Sink operators in insertion order
    pub fn sinks(&self) -> impl Iterator<Item = &OperatorRef> + '_ {
        self.operators().filter(|op| op.sink_name().is_some())
    }

    /// Number of top-level nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the circuit has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Dependency graph of the operators
    pub fn graph(&self) -> IrResult<CircuitGraph> {
        CircuitGraph::build(self)
    }

    /// Check that operator ids are unique and that every input is an
    /// operator of this circuit that appears earlier in the node order.
    pub fn validate(&self) -> IrResult<()> {
        let mut declared: HashMap<OperatorId, &OperatorRef> = HashMap::new();
        for op in self.operators() {
            for input in op.inputs() {
                match declared.get(&input.id()) {
                    Some(known) if Arc::ptr_eq(known, input) => {}
                    Some(_) => {
                        return Err(IrError::invariant(format!(
                            "{} reads a stale copy of {} in circuit '{}'",
                            op.id(),
                            input.id(),
                            self.name
                        )))
                    }
                    None => {
                        return Err(IrError::invariant(format!(
                            "{} reads {} before it is defined in circuit '{}'",
                            op.id(),
                            input.id(),
                            self.name
                        )))
                    }
                }
            }
            if declared.insert(op.id(), op).is_some() {
                return Err(IrError::invariant(format!(
                    "duplicate operator id {} in circuit '{}'",
                    op.id(),
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// Builds a circuit, allocating sequential operator ids
#[derive(Debug)]
pub struct CircuitBuilder {
    name: String,
    nodes: Vec<CircuitNode>,
    next_id: u64,
}

impl CircuitBuilder {
    /// Start an empty circuit
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            next_id: 0,
        }
    }

    /// Append an operator with the next free id
    pub fn add_operator(
        &mut self,
        kind: OperatorKind,
        output_type: Type,
        function: Option<ExprRef>,
        aggregate: Option<AggregateRef>,
        inputs: Vec<OperatorRef>,
    ) -> IrResult<OperatorRef> {
        let id = OperatorId(self.next_id);
        let op = Operator::new(id, kind, output_type, function, aggregate, inputs)?;
        self.next_id += 1;
        self.nodes.push(CircuitNode::Operator(Arc::clone(&op)));
        Ok(op)
    }

    /// Append a declaration
    pub fn add_declaration(&mut self, name: impl Into<String>, value: ExprRef) -> DeclarationRef {
        let decl = Declaration::new(name, value);
        self.nodes.push(CircuitNode::Declaration(Arc::clone(&decl)));
        decl
    }

    /// Input relation of rows of `row_type`
    pub fn source(&mut self, name: impl Into<String>, row_type: Type) -> IrResult<OperatorRef> {
        self.add_operator(
            OperatorKind::Source { name: name.into() },
            Type::zset(row_type, Type::weight()),
            None,
            None,
            Vec::new(),
        )
    }

    /// Constant relation holding `data`
    pub fn constant(&mut self, data: ZSetLiteral) -> IrResult<OperatorRef> {
        let output_type = data.zset_type().clone();
        self.add_operator(
            OperatorKind::Constant,
            output_type,
            Some(Expression::zset(data)),
            None,
            Vec::new(),
        )
    }

    /// Apply the closure `function` to every row of `input`
    pub fn map(&mut self, input: &OperatorRef, function: ExprRef) -> IrResult<OperatorRef> {
        let row_type = function
            .ty()
            .function_signature()
            .map(|(_, result)| result.clone())
            .ok_or_else(|| {
                IrError::invariant(format!("map needs a closure, got {}", function.ty()))
            })?;
        let weight = input
            .output_type()
            .zset_weight()
            .cloned()
            .unwrap_or_else(Type::weight);
        self.add_operator(
            OperatorKind::Map,
            Type::zset(row_type, weight),
            Some(function),
            None,
            vec![Arc::clone(input)],
        )
    }

    /// Keep the rows of `input` for which `predicate` holds
    pub fn filter(&mut self, input: &OperatorRef, predicate: ExprRef) -> IrResult<OperatorRef> {
        self.add_operator(
            OperatorKind::Filter,
            input.output_type().clone(),
            Some(predicate),
            None,
            vec![Arc::clone(input)],
        )
    }

    /// Output relation fed by `input`
    pub fn sink(&mut self, name: impl Into<String>, input: &OperatorRef) -> IrResult<OperatorRef> {
        self.add_operator(
            OperatorKind::Sink { name: name.into() },
            input.output_type().clone(),
            None,
            None,
            vec![Arc::clone(input)],
        )
    }

    /// Finish the circuit
    pub fn build(self) -> Circuit {
        Circuit::new(self.name, self.nodes)
    }
}

/// Dependency view of a circuit's operators.
///
/// Edges run from an input to the operator that reads it, so a topological
/// order lists inputs first.
#[derive(Debug)]
pub struct CircuitGraph {
    graph: DiGraph<OperatorId, ()>,
    node_map: HashMap<OperatorId, NodeIndex>,
}

impl CircuitGraph {
    /// Build the graph of `circuit`
    pub fn build(circuit: &Circuit) -> IrResult<Self> {
        let mut graph = DiGraph::new();
        let mut node_map = HashMap::new();
        for op in circuit.operators() {
            let idx = graph.add_node(op.id());
            if node_map.insert(op.id(), idx).is_some() {
                return Err(IrError::invariant(format!(
                    "duplicate operator id {} in circuit '{}'",
                    op.id(),
                    circuit.name()
                )));
            }
        }
        for op in circuit.operators() {
            let to = node_map[&op.id()];
            for input in op.inputs() {
                let from = *node_map.get(&input.id()).ok_or_else(|| {
                    IrError::invariant(format!(
                        "{} reads {} which is not part of circuit '{}'",
                        op.id(),
                        input.id(),
                        circuit.name()
                    ))
                })?;
                graph.add_edge(from, to, ());
            }
        }
        Ok(Self { graph, node_map })
    }

    /// Number of operators
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Whether the graph has no operators
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Direct inputs of `id`
    pub fn dependencies(&self, id: OperatorId) -> Vec<OperatorId> {
        self.neighbors(id, petgraph::Direction::Incoming)
    }

    /// Operators reading `id` directly
    pub fn dependents(&self, id: OperatorId) -> Vec<OperatorId> {
        self.neighbors(id, petgraph::Direction::Outgoing)
    }

    fn neighbors(&self, id: OperatorId, direction: petgraph::Direction) -> Vec<OperatorId> {
        let Some(&idx) = self.node_map.get(&id) else {
            return Vec::new();
        };
        let mut ids: Vec<OperatorId> = self
            .graph
            .edges_directed(idx, direction)
            .map(|e| match direction {
                petgraph::Direction::Incoming => self.graph[e.source()],
                petgraph::Direction::Outgoing => self.graph[e.target()],
            })
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Operators with every input before its readers
    pub fn topological_order(&self) -> IrResult<Vec<OperatorId>> {
        toposort(&self.graph, None)
            .map(|order| order.into_iter().map(|idx| self.graph[idx]).collect())
            .map_err(|cycle| {
                IrError::invariant(format!(
                    "circuit contains a cycle through {}",
                    self.graph[cycle.node_id()]
                ))
            })
    }

    /// Operators from which at least one of `roots` can be reached,
    /// roots included
    pub fn reaching(&self, roots: impl IntoIterator<Item = OperatorId>) -> HashSet<OperatorId> {
        let mut visited = HashSet::new();
        let mut stack: Vec<NodeIndex> = roots
            .into_iter()
            .filter_map(|id| self.node_map.get(&id).copied())
            .collect();
        while let Some(idx) = stack.pop() {
            if !visited.insert(idx) {
                continue;
            }
            for edge in self
                .graph
                .edges_directed(idx, petgraph::Direction::Incoming)
            {
                stack.push(edge.source());
            }
        }
        visited.into_iter().map(|idx| self.graph[idx]).collect()
    }
}

/// A top-level item of a file
#[derive(Debug, Clone)]
pub enum FileItem {
    /// Declaration shared by the circuits of the file
    Declaration(DeclarationRef),
    /// A circuit
    Circuit(Circuit),
}

/// An ordered collection of declarations and circuits
#[derive(Debug, Clone, Default)]
pub struct File {
    items: Vec<FileItem>,
}

impl File {
    /// Create a file from its items, in order
    pub fn new(items: Vec<FileItem>) -> Self {
        Self { items }
    }

    /// Items in order
    pub fn items(&self) -> &[FileItem] {
        &self.items
    }

    /// Circuits in order
    pub fn circuits(&self) -> impl Iterator<Item = &Circuit> + '_ {
        self.items.iter().filter_map(|item| match item {
            FileItem::Circuit(c) => Some(c),
            FileItem::Declaration(_) => None,
        })
    }
}

#[cfg(test)]
#[path = "circuit_test.rs"]
mod tests;
