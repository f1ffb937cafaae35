//! Aggregate specifications attached to aggregation operators

use super::expr::ExprRef;
use super::types::Type;
use crate::error::{IrError, IrResult};
use std::fmt;
use std::sync::Arc;

/// Shared handle to an aggregate specification
pub type AggregateRef = Arc<AggregateSpec>;

/// One accumulator of an aggregate: a fold over the rows of a group.
#[derive(Debug)]
pub struct Accumulator {
    zero: ExprRef,
    increment: ExprRef,
    post_process: Option<ExprRef>,
    empty_result: ExprRef,
    row_type: Type,
}

impl Accumulator {
    /// Create an accumulator.
    ///
    /// - `zero` seeds the fold.
    /// - `increment` is a closure `|acc, row| -> acc` whose accumulator
    ///   parameter and result both have the type of `zero`.
    /// - `post_process`, when present, is a closure `|acc| -> result`.
    /// - `empty_result` is produced for an empty group and has the result
    ///   type (the type of `zero` without post-processing).
    pub fn new(
        zero: ExprRef,
        increment: ExprRef,
        post_process: Option<ExprRef>,
        empty_result: ExprRef,
    ) -> IrResult<Self> {
        let acc_ty = zero.ty();
        let (params, result) = increment.ty().function_signature().ok_or_else(|| {
            IrError::invariant(format!(
                "accumulator increment must be a closure, got {}",
                increment.ty()
            ))
        })?;
        if params.len() != 2 {
            return Err(IrError::invariant(format!(
                "accumulator increment takes (accumulator, row), got {} parameters",
                params.len()
            )));
        }
        let row_type = params[1].clone();
        if !params[0].same(acc_ty) {
            return Err(IrError::type_mismatch(
                "accumulator increment parameter",
                acc_ty,
                &params[0],
            ));
        }
        if !result.same(acc_ty) {
            return Err(IrError::type_mismatch(
                "accumulator increment result",
                acc_ty,
                result,
            ));
        }

        let result_ty = match &post_process {
            Some(post) => {
                let (post_params, post_result) =
                    post.ty().function_signature().ok_or_else(|| {
                        IrError::invariant(format!(
                            "accumulator post-processing must be a closure, got {}",
                            post.ty()
                        ))
                    })?;
                if post_params.len() != 1 || !post_params[0].same(acc_ty) {
                    return Err(IrError::type_mismatch(
                        "accumulator post-processing parameter",
                        &Type::function(vec![acc_ty.clone()], post_result.clone()),
                        post.ty(),
                    ));
                }
                post_result
            }
            None => acc_ty,
        };
        if !empty_result.ty().same(result_ty) {
            return Err(IrError::type_mismatch(
                "accumulator empty-group result",
                result_ty,
                empty_result.ty(),
            ));
        }

        Ok(Self {
            zero,
            increment,
            post_process,
            empty_result,
            row_type,
        })
    }

    /// Initial accumulator value
    pub fn zero(&self) -> &ExprRef {
        &self.zero
    }

    /// Fold step
    pub fn increment(&self) -> &ExprRef {
        &self.increment
    }

    /// Optional final transformation
    pub fn post_process(&self) -> Option<&ExprRef> {
        self.post_process.as_ref()
    }

    /// Value for an empty group
    pub fn empty_result(&self) -> &ExprRef {
        &self.empty_result
    }

    /// Row type consumed by the increment closure
    pub fn row_type(&self) -> &Type {
        &self.row_type
    }

    /// Type of the value this accumulator contributes to the output
    pub fn result_type(&self) -> &Type {
        self.empty_result.ty()
    }

    /// Sub-expressions in traversal order
    pub fn children(&self) -> Vec<&ExprRef> {
        let mut children = vec![&self.zero, &self.increment];
        if let Some(post) = &self.post_process {
            children.push(post);
        }
        children.push(&self.empty_result);
        children
    }
}

/// Aggregation performed by an aggregate operator: one or more accumulators
/// over the same row type.
#[derive(Debug)]
pub struct AggregateSpec {
    components: Vec<Accumulator>,
}

impl AggregateSpec {
    /// Create an aggregate from its accumulators
    pub fn new(components: Vec<Accumulator>) -> IrResult<AggregateRef> {
        let first = components
            .first()
            .ok_or_else(|| IrError::invariant("aggregate needs at least one accumulator"))?;
        let row_ty = first.row_type();
        for component in &components[1..] {
            if !component.row_type().same(row_ty) {
                return Err(IrError::type_mismatch(
                    "aggregate row type",
                    row_ty,
                    component.row_type(),
                ));
            }
        }
        Ok(Arc::new(Self { components }))
    }

    /// Accumulators in declaration order
    pub fn components(&self) -> &[Accumulator] {
        &self.components
    }

    /// Row type shared by all accumulators
    pub fn row_type(&self) -> &Type {
        self.components[0].row_type()
    }

    /// Tuple of the accumulators' result types
    pub fn result_type(&self) -> Type {
        Type::tuple(
            self.components
                .iter()
                .map(|c| c.result_type().clone())
                .collect(),
        )
    }

    /// All sub-expressions, accumulator by accumulator
    pub fn children(&self) -> Vec<&ExprRef> {
        self.components.iter().flat_map(|c| c.children()).collect()
    }
}

impl fmt::Display for AggregateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Fold::new(")?;
        for (i, c) in self.components.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "[{}, {}", c.zero, c.increment)?;
            if let Some(post) = &c.post_process {
                write!(f, ", {post}")?;
            }
            write!(f, ", {}]", c.empty_result)?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::expr::{Expression, Parameter};
    use crate::test_utils::*;

    #[test]
    fn test_count_aggregate_shape() {
        let aggregate = count_aggregate();
        assert!(aggregate.result_type().same(&Type::tuple(vec![Type::int64(false)])));
        assert!(aggregate.row_type().same(&row_ref_type()));
        // zero, increment, empty result
        assert_eq!(aggregate.children().len(), 3);
    }

    #[test]
    fn test_increment_must_fold_into_accumulator() {
        let increment = Expression::closure(
            vec![
                Parameter::new("acc", Type::int32(false)),
                Parameter::new("t", row_ref_type()),
            ],
            Expression::int32(0),
        );
        let err = Accumulator::new(Expression::int64(0), increment, None, Expression::int64(0))
            .unwrap_err();
        assert!(matches!(err, IrError::TypeMismatch { .. }));

        let err = Accumulator::new(
            Expression::int64(0),
            Expression::int64(1),
            None,
            Expression::int64(0),
        )
        .unwrap_err();
        assert!(matches!(err, IrError::InvariantViolation { .. }));
    }

    #[test]
    fn test_post_process_sets_result_type() {
        let base = count_accumulator();
        let post = Expression::closure(
            vec![Parameter::new("acc", Type::int64(false))],
            Expression::bool(true),
        );
        let accumulator = Accumulator::new(
            base.zero().clone(),
            base.increment().clone(),
            Some(post.clone()),
            Expression::bool(false),
        )
        .unwrap();
        assert!(accumulator.result_type().same(&Type::bool(false)));
        assert_eq!(accumulator.children().len(), 4);

        // The empty-group result must have the post-processed type
        let err = Accumulator::new(
            base.zero().clone(),
            base.increment().clone(),
            Some(post),
            Expression::int64(0),
        )
        .unwrap_err();
        assert!(matches!(err, IrError::TypeMismatch { .. }));
    }

    #[test]
    fn test_accumulators_over_different_rows_rejected() {
        let other_row = Type::reference(Type::int32(false), false);
        let increment = Expression::closure(
            vec![
                Parameter::new("acc", Type::int64(false)),
                Parameter::new("x", other_row.clone()),
            ],
            Expression::variable("acc", Type::int64(false)),
        );
        let other =
            Accumulator::new(Expression::int64(0), increment, None, Expression::int64(0)).unwrap();
        assert!(other.row_type().same(&other_row));
        assert!(count_accumulator().row_type().same(&row_ref_type()));

        let err = AggregateSpec::new(vec![count_accumulator(), other]).unwrap_err();
        assert!(matches!(err, IrError::TypeMismatch { .. }));
    }

    #[test]
    fn test_aggregate_needs_accumulators() {
        assert!(AggregateSpec::new(vec![]).is_err());
    }
}
