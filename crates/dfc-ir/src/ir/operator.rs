//! Circuit operators
//!
//! An operator is a node of the circuit DAG. It owns its function and
//! aggregate and holds shared references to its inputs. Operators are never
//! mutated: rewrites build a replacement with the same [`OperatorId`].

use super::aggregate::AggregateRef;
use super::expr::ExprRef;
use super::types::Type;
use crate::error::{IrError, IrResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Shared handle to an operator
pub type OperatorRef = Arc<Operator>;

/// Stable identifier of an operator within a circuit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperatorId(pub u64);

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream{}", self.0)
    }
}

/// Number of inputs an operator kind accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many inputs
    Exact(usize),
    /// At least this many inputs
    AtLeast(usize),
}

impl Arity {
    fn accepts(self, n: usize) -> bool {
        match self {
            Arity::Exact(k) => n == k,
            Arity::AtLeast(k) => n >= k,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(k) => write!(f, "{k}"),
            Arity::AtLeast(k) => write!(f, "at least {k}"),
        }
    }
}

/// Operator kinds
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    /// Named input relation
    Source { name: String },
    /// Named output relation
    Sink { name: String },
    /// Constant ZSet; the function is the ZSet literal
    Constant,
    /// Row-wise projection
    Map,
    /// Row-wise predicate
    Filter,
    /// Row to zero or more rows
    FlatMap,
    /// Row to (key, value) pair
    Index,
    /// Equi-join of two indexed inputs
    Join,
    /// Sum of all inputs
    Sum,
    /// First input minus second
    Subtract,
    /// Negate every weight
    Negate,
    /// Clamp weights to 1
    Distinct,
    /// Running sum over time
    Integrate,
    /// Change since the previous step
    Differentiate,
    /// Group-by aggregation
    Aggregate,
    /// Aggregation maintained incrementally
    IncrementalAggregate,
    /// Aggregation over a sliding window
    WindowAggregate,
}

impl OperatorKind {
    /// Method name used when rendering the operator
    pub fn operation(&self) -> &'static str {
        match self {
            OperatorKind::Source { .. } => "add_source",
            OperatorKind::Sink { .. } => "output",
            OperatorKind::Constant => "add_source",
            OperatorKind::Map => "map",
            OperatorKind::Filter => "filter",
            OperatorKind::FlatMap => "flat_map",
            OperatorKind::Index => "index_with",
            OperatorKind::Join => "join",
            OperatorKind::Sum => "sum",
            OperatorKind::Subtract => "minus",
            OperatorKind::Negate => "neg",
            OperatorKind::Distinct => "distinct",
            OperatorKind::Integrate => "integrate",
            OperatorKind::Differentiate => "differentiate",
            OperatorKind::Aggregate => "aggregate",
            OperatorKind::IncrementalAggregate => "aggregate_incremental",
            OperatorKind::WindowAggregate => "window",
        }
    }

    /// Whether this kind may carry an aggregate
    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            OperatorKind::Aggregate
                | OperatorKind::IncrementalAggregate
                | OperatorKind::WindowAggregate
        )
    }

    /// Whether this kind cannot be built without a function
    pub fn requires_function(&self) -> bool {
        matches!(
            self,
            OperatorKind::Constant
                | OperatorKind::Map
                | OperatorKind::Filter
                | OperatorKind::FlatMap
                | OperatorKind::Index
                | OperatorKind::Join
        )
    }

    /// Accepted number of inputs
    pub fn arity(&self) -> Arity {
        match self {
            OperatorKind::Source { .. } | OperatorKind::Constant => Arity::Exact(0),
            OperatorKind::Join | OperatorKind::Subtract => Arity::Exact(2),
            OperatorKind::Sum => Arity::AtLeast(1),
            _ => Arity::Exact(1),
        }
    }

    /// Kinds whose output has the type of every input
    fn preserves_type(&self) -> bool {
        matches!(
            self,
            OperatorKind::Sink { .. }
                | OperatorKind::Filter
                | OperatorKind::Sum
                | OperatorKind::Subtract
                | OperatorKind::Negate
                | OperatorKind::Distinct
                | OperatorKind::Integrate
                | OperatorKind::Differentiate
        )
    }
}

/// A node of the circuit graph
#[derive(Debug)]
pub struct Operator {
    id: OperatorId,
    kind: OperatorKind,
    output_type: Type,
    function: Option<ExprRef>,
    aggregate: Option<AggregateRef>,
    inputs: Vec<OperatorRef>,
}

impl Operator {
    /// Build an operator, checking arity, the presence of function and
    /// aggregate, and the types that the kind constrains.
    pub fn new(
        id: OperatorId,
        kind: OperatorKind,
        output_type: Type,
        function: Option<ExprRef>,
        aggregate: Option<AggregateRef>,
        inputs: Vec<OperatorRef>,
    ) -> IrResult<OperatorRef> {
        let op = Self {
            id,
            kind,
            output_type,
            function,
            aggregate,
            inputs,
        };
        op.check()?;
        Ok(Arc::new(op))
    }

    fn check(&self) -> IrResult<()> {
        let arity = self.kind.arity();
        if !arity.accepts(self.inputs.len()) {
            return Err(IrError::invariant(format!(
                "{} operator {} takes {arity} inputs, got {}",
                self.kind.operation(),
                self.id,
                self.inputs.len()
            )));
        }
        if self.kind.requires_function() && self.function.is_none() {
            return Err(IrError::invariant(format!(
                "{} operator {} needs a function",
                self.kind.operation(),
                self.id
            )));
        }
        if self.aggregate.is_some() && !self.kind.is_aggregate() {
            return Err(IrError::invariant(format!(
                "{} operator {} cannot carry an aggregate",
                self.kind.operation(),
                self.id
            )));
        }
        if self.kind.is_aggregate() && self.aggregate.is_none() && self.function.is_none() {
            return Err(IrError::invariant(format!(
                "{} operator {} needs an aggregate or a function",
                self.kind.operation(),
                self.id
            )));
        }

        if let Some(function) = &self.function {
            match self.kind {
                OperatorKind::Constant => {
                    if function.as_zset().is_none() {
                        return Err(IrError::invariant(format!(
                            "constant operator {} needs a ZSet literal, got {}",
                            self.id,
                            function.kind_name()
                        )));
                    }
                    if !function.ty().same(&self.output_type) {
                        return Err(IrError::type_mismatch(
                            format!("constant operator {}", self.id),
                            &self.output_type,
                            function.ty(),
                        ));
                    }
                }
                OperatorKind::Filter => {
                    let returns_bool = function
                        .ty()
                        .function_signature()
                        .is_some_and(|(_, result)| result.is_bool());
                    if !returns_bool {
                        return Err(IrError::invariant(format!(
                            "filter operator {} needs a predicate, got {}",
                            self.id,
                            function.ty()
                        )));
                    }
                }
                _ => {}
            }
        }

        if self.kind.preserves_type() {
            for input in &self.inputs {
                if !input.output_type.same(&self.output_type) {
                    return Err(IrError::type_mismatch(
                        format!(
                            "input {} of {} operator {}",
                            input.id,
                            self.kind.operation(),
                            self.id
                        ),
                        &self.output_type,
                        &input.output_type,
                    ));
                }
            }
        }
        Ok(())
    }

    /// Stable identifier
    pub fn id(&self) -> OperatorId {
        self.id
    }

    /// Operator kind
    pub fn kind(&self) -> &OperatorKind {
        &self.kind
    }

    /// Type of the stream this operator produces
    pub fn output_type(&self) -> &Type {
        &self.output_type
    }

    /// Attached function
    pub fn function(&self) -> Option<&ExprRef> {
        self.function.as_ref()
    }

    /// Attached aggregate
    pub fn aggregate(&self) -> Option<&AggregateRef> {
        self.aggregate.as_ref()
    }

    /// Input operators in argument order
    pub fn inputs(&self) -> &[OperatorRef] {
        &self.inputs
    }

    /// Sink name, if this is a sink
    pub fn sink_name(&self) -> Option<&str> {
        match &self.kind {
            OperatorKind::Sink { name } => Some(name),
            _ => None,
        }
    }

    /// Replacement with a different function
    pub fn with_function(&self, function: ExprRef) -> IrResult<OperatorRef> {
        self.with_parts(Some(function), self.aggregate.clone(), self.inputs.clone())
    }

    /// Replacement reading from different inputs
    pub fn with_inputs(&self, inputs: Vec<OperatorRef>) -> IrResult<OperatorRef> {
        self.with_parts(self.function.clone(), self.aggregate.clone(), inputs)
    }

    /// Replacement with the same id, kind and output type
    pub fn with_parts(
        &self,
        function: Option<ExprRef>,
        aggregate: Option<AggregateRef>,
        inputs: Vec<OperatorRef>,
    ) -> IrResult<OperatorRef> {
        Self::new(
            self.id,
            self.kind.clone(),
            self.output_type.clone(),
            function,
            aggregate,
            inputs,
        )
    }

    /// True when `inputs` are physically the operator's current inputs
    pub fn has_inputs(&self, inputs: &[OperatorRef]) -> bool {
        self.inputs.len() == inputs.len()
            && self
                .inputs
                .iter()
                .zip(inputs.iter())
                .all(|(a, b)| Arc::ptr_eq(a, b))
    }
}

/// Renders `let streamN: T = input.operation(args);`
impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "let {}: {} = ", self.id, self.output_type)?;
        let mut args: Vec<String> = Vec::new();
        match self.inputs.split_first() {
            Some((first, rest)) => {
                write!(f, "{}.", first.id)?;
                args.extend(rest.iter().map(|i| i.id.to_string()));
            }
            None => f.write_str("circuit.")?,
        }
        match &self.kind {
            OperatorKind::Source { name } | OperatorKind::Sink { name } => {
                args.push(format!("{name:?}"))
            }
            _ => {}
        }
        if let Some(aggregate) = &self.aggregate {
            args.push(aggregate.to_string());
        }
        if let Some(function) = &self.function {
            args.push(function.to_string());
        }
        write!(f, "{}({});", self.kind.operation(), args.join(", "))
    }
}

#[cfg(test)]
#[path = "operator_test.rs"]
mod tests;
