//! Typed expression tree for the circuit IR
//!
//! Expressions are immutable and shared through [`ExprRef`]. Every node's type
//! is computed by its constructor from the children it is given, and the
//! constructors reject ill-typed combinations, so an `ExprRef` that exists is
//! well typed.

use super::types::{ScalarKind, Type};
use super::zset::ZSetLiteral;
use crate::error::{IrError, IrResult};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Shared handle to an expression node
pub type ExprRef = Arc<Expression>;

/// A literal value in the IR.
///
/// Equality compares floats by their total order, so `-0.0` and `0.0`
/// differ and NaN equals itself.
#[derive(Debug, Clone, Serialize)]
pub enum LiteralValue {
    /// Null literal
    Null,
    /// Boolean literal
    Bool(bool),
    /// Integer literal
    Integer(i64),
    /// Float literal
    Float(f64),
    /// Decimal literal in its canonical textual form
    Decimal(String),
    /// String literal
    String(String),
    /// Days since the epoch
    Date(i32),
    /// Milliseconds since the epoch
    Timestamp(i64),
}

impl PartialEq for LiteralValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (LiteralValue::Null, LiteralValue::Null) => true,
            (LiteralValue::Bool(a), LiteralValue::Bool(b)) => a == b,
            (LiteralValue::Integer(a), LiteralValue::Integer(b)) => a == b,
            (LiteralValue::Float(a), LiteralValue::Float(b)) => a.total_cmp(b).is_eq(),
            (LiteralValue::Decimal(a), LiteralValue::Decimal(b)) => a == b,
            (LiteralValue::String(a), LiteralValue::String(b)) => a == b,
            (LiteralValue::Date(a), LiteralValue::Date(b)) => a == b,
            (LiteralValue::Timestamp(a), LiteralValue::Timestamp(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for LiteralValue {}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinaryOp {
    /// Addition (+)
    Add,
    /// Subtraction (-)
    Sub,
    /// Multiplication (*)
    Mul,
    /// Division (/)
    Div,
    /// Equality (==)
    Eq,
    /// Inequality (!=)
    NotEq,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    LtEq,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    GtEq,
    /// Logical AND
    And,
    /// Logical OR
    Or,
}

impl BinaryOp {
    /// Check if this is an arithmetic operator
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div
        )
    }

    /// Check if this is a comparison operator
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Lt
                | BinaryOp::LtEq
                | BinaryOp::Gt
                | BinaryOp::GtEq
        )
    }

    /// Check if this is a logical operator
    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        };
        f.write_str(s)
    }
}

/// A closure parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Parameter name as it appears in the body
    pub name: String,
    /// Declared type
    pub ty: Type,
}

impl Parameter {
    /// Create a parameter
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Node kinds of the expression tree
#[derive(Debug)]
pub enum ExprKind {
    /// Scalar literal
    Literal(LiteralValue),
    /// Constant weighted multiset
    ZSet(ZSetLiteral),
    /// Tuple construction
    Tuple(Vec<ExprRef>),
    /// Borrow of a value: wraps `T` and produces `&T`
    Deref(ExprRef),
    /// Reference to a closure parameter or declaration
    Variable(String),
    /// Tuple field access (`t.0`)
    Field { tuple: ExprRef, index: usize },
    /// Lambda with typed parameters
    Closure {
        params: Vec<Parameter>,
        body: ExprRef,
    },
    /// Binary operation
    Binary {
        op: BinaryOp,
        left: ExprRef,
        right: ExprRef,
    },
}

/// An expression node and its type
#[derive(Debug)]
pub struct Expression {
    kind: ExprKind,
    ty: Type,
}

impl Expression {
    fn new(kind: ExprKind, ty: Type) -> ExprRef {
        Arc::new(Self { kind, ty })
    }

    /// Literal of the given type.
    ///
    /// NULL requires a nullable type; every other value must match the
    /// scalar kind of `ty`.
    pub fn literal(value: LiteralValue, ty: Type) -> IrResult<ExprRef> {
        check_literal(&value, &ty)?;
        Ok(Self::new(ExprKind::Literal(value), ty))
    }

    /// NULL of a nullable type
    pub fn null(ty: Type) -> IrResult<ExprRef> {
        Self::literal(LiteralValue::Null, ty)
    }

    /// Non-nullable BOOLEAN literal
    pub fn bool(value: bool) -> ExprRef {
        Self::new(ExprKind::Literal(LiteralValue::Bool(value)), Type::bool(false))
    }

    /// Non-nullable INTEGER literal
    pub fn int32(value: i32) -> ExprRef {
        Self::new(
            ExprKind::Literal(LiteralValue::Integer(i64::from(value))),
            Type::int32(false),
        )
    }

    /// Non-nullable BIGINT literal
    pub fn int64(value: i64) -> ExprRef {
        Self::new(
            ExprKind::Literal(LiteralValue::Integer(value)),
            Type::int64(false),
        )
    }

    /// Non-nullable DOUBLE literal
    pub fn double(value: f64) -> ExprRef {
        Self::new(
            ExprKind::Literal(LiteralValue::Float(value)),
            Type::double(false),
        )
    }

    /// Non-nullable VARCHAR literal
    pub fn string(value: impl Into<String>) -> ExprRef {
        Self::new(
            ExprKind::Literal(LiteralValue::String(value.into())),
            Type::string(false),
        )
    }

    /// Wrap a finished ZSet literal
    pub fn zset(literal: ZSetLiteral) -> ExprRef {
        let ty = literal.zset_type().clone();
        Self::new(ExprKind::ZSet(literal), ty)
    }

    /// Tuple whose type is inferred from its fields
    pub fn tuple(fields: Vec<ExprRef>) -> ExprRef {
        let ty = Type::tuple(fields.iter().map(|f| f.ty.clone()).collect());
        Self::new(ExprKind::Tuple(fields), ty)
    }

    /// Tuple with a declared type.
    ///
    /// The field count and every field type must match `ty` exactly.
    pub fn tuple_typed(ty: Type, fields: Vec<ExprRef>) -> IrResult<ExprRef> {
        let declared = ty.tuple_fields().ok_or_else(|| {
            IrError::invariant(format!("tuple expression needs a tuple type, got {ty}"))
        })?;
        if declared.len() != fields.len() {
            let actual = Type::tuple(fields.iter().map(|f| f.ty.clone()).collect());
            return Err(IrError::type_mismatch("tuple arity", &ty, &actual));
        }
        for (i, (field_ty, field)) in declared.iter().zip(fields.iter()).enumerate() {
            if !field_ty.same(&field.ty) {
                return Err(IrError::type_mismatch(
                    format!("tuple field {i}"),
                    field_ty,
                    &field.ty,
                ));
            }
        }
        Ok(Self::new(ExprKind::Tuple(fields), ty))
    }

    /// Borrow of `arg`; the result type is a reference to the argument type
    pub fn deref(arg: ExprRef) -> ExprRef {
        let ty = Type::reference(arg.ty.clone(), false);
        Self::new(ExprKind::Deref(arg), ty)
    }

    /// Reference to a named value of type `ty`
    pub fn variable(name: impl Into<String>, ty: Type) -> ExprRef {
        Self::new(ExprKind::Variable(name.into()), ty)
    }

    /// Field `index` of a tuple (or of a reference to a tuple).
    ///
    /// Fields of a nullable tuple are nullable.
    pub fn field(tuple: ExprRef, index: usize) -> IrResult<ExprRef> {
        let base = tuple.ty.ref_inner().unwrap_or(&tuple.ty);
        let fields = base.tuple_fields().ok_or_else(|| {
            IrError::invariant(format!("field access .{index} on non-tuple type {base}"))
        })?;
        let field_ty = fields.get(index).ok_or_else(|| {
            IrError::invariant(format!("field index {index} out of range for {base}"))
        })?;
        let ty = if base.is_nullable() {
            field_ty.with_nullable(true)?
        } else {
            field_ty.clone()
        };
        Ok(Self::new(ExprKind::Field { tuple, index }, ty))
    }

    /// Closure over `params`; its type is the matching function type
    pub fn closure(params: Vec<Parameter>, body: ExprRef) -> ExprRef {
        let ty = Type::function(
            params.iter().map(|p| p.ty.clone()).collect(),
            body.ty.clone(),
        );
        Self::new(ExprKind::Closure { params, body }, ty)
    }

    /// Binary operation.
    ///
    /// Both operands must have the same type up to nullability. Arithmetic
    /// needs numeric operands, AND/OR need booleans, comparisons produce a
    /// boolean. The result is nullable when either operand is.
    pub fn binary(op: BinaryOp, left: ExprRef, right: ExprRef) -> IrResult<ExprRef> {
        let ty = binary_result_type(op, &left.ty, &right.ty)?;
        Ok(Self::new(ExprKind::Binary { op, left, right }, ty))
    }

    /// Node kind and children
    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    /// Type fixed at construction
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// The ZSet literal, if this is one
    pub fn as_zset(&self) -> Option<&ZSetLiteral> {
        match &self.kind {
            ExprKind::ZSet(z) => Some(z),
            _ => None,
        }
    }

    /// The literal value, if this is a scalar literal
    pub fn as_literal(&self) -> Option<&LiteralValue> {
        match &self.kind {
            ExprKind::Literal(v) => Some(v),
            _ => None,
        }
    }

    /// Literals, ZSet literals, and tuples built only from constants
    pub fn is_constant(&self) -> bool {
        match &self.kind {
            ExprKind::Literal(_) | ExprKind::ZSet(_) => true,
            ExprKind::Tuple(fields) => fields.iter().all(|f| f.is_constant()),
            _ => false,
        }
    }

    /// Direct sub-expressions in traversal order
    pub fn children(&self) -> Vec<&ExprRef> {
        match &self.kind {
            ExprKind::Literal(_) | ExprKind::Variable(_) => Vec::new(),
            ExprKind::ZSet(z) => z.iter().map(|(e, _)| e).collect(),
            ExprKind::Tuple(fields) => fields.iter().collect(),
            ExprKind::Deref(arg) => vec![arg],
            ExprKind::Field { tuple, .. } => vec![tuple],
            ExprKind::Closure { body, .. } => vec![body],
            ExprKind::Binary { left, right, .. } => vec![left, right],
        }
    }

    /// Rebuild this node over new children, given in [`children`](Self::children)
    /// order.
    ///
    /// The rebuilt node goes through the checked constructor of its kind, so
    /// children whose types no longer fit are rejected.
    pub fn with_children(self: &Arc<Self>, children: Vec<ExprRef>) -> IrResult<ExprRef> {
        let expected = self.children().len();
        if children.len() != expected {
            return Err(IrError::invariant(format!(
                "rebuilding {} with {} children, expected {expected}",
                self.kind_name(),
                children.len()
            )));
        }
        let mut next = children.into_iter();
        let mut child = || {
            next.next()
                .ok_or_else(|| IrError::invariant("missing child while rebuilding expression"))
        };
        match &self.kind {
            ExprKind::Literal(_) | ExprKind::Variable(_) => Ok(Arc::clone(self)),
            ExprKind::ZSet(z) => {
                let mut rebuilt = ZSetLiteral::new(z.zset_type().clone())?;
                for (_, weight) in z.iter() {
                    rebuilt.add(child()?, weight)?;
                }
                Ok(Self::zset(rebuilt))
            }
            ExprKind::Tuple(fields) => {
                let fields = (0..fields.len())
                    .map(|_| child())
                    .collect::<IrResult<Vec<_>>>()?;
                Self::tuple_typed(self.ty.clone(), fields)
            }
            ExprKind::Deref(_) => Ok(Self::deref(child()?)),
            ExprKind::Field { index, .. } => Self::field(child()?, *index),
            ExprKind::Closure { params, .. } => Ok(Self::closure(params.clone(), child()?)),
            ExprKind::Binary { op, .. } => {
                let left = child()?;
                let right = child()?;
                Self::binary(*op, left, right)
            }
        }
    }

    /// Deep structural comparison of two expression trees
    pub fn same(&self, other: &Expression) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        if !self.ty.same(&other.ty) {
            return false;
        }
        match (&self.kind, &other.kind) {
            (ExprKind::Literal(a), ExprKind::Literal(b)) => a == b,
            (ExprKind::ZSet(a), ExprKind::ZSet(b)) => a.same(b),
            (ExprKind::Tuple(a), ExprKind::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.same(y))
            }
            (ExprKind::Deref(a), ExprKind::Deref(b)) => a.same(b),
            (ExprKind::Variable(a), ExprKind::Variable(b)) => a == b,
            (
                ExprKind::Field {
                    tuple: ta,
                    index: ia,
                },
                ExprKind::Field {
                    tuple: tb,
                    index: ib,
                },
            ) => ia == ib && ta.same(tb),
            (
                ExprKind::Closure {
                    params: pa,
                    body: ba,
                },
                ExprKind::Closure {
                    params: pb,
                    body: bb,
                },
            ) => pa == pb && ba.same(bb),
            (
                ExprKind::Binary {
                    op: oa,
                    left: la,
                    right: ra,
                },
                ExprKind::Binary {
                    op: ob,
                    left: lb,
                    right: rb,
                },
            ) => oa == ob && la.same(lb) && ra.same(rb),
            _ => false,
        }
    }

    /// Shallow comparison: same kind, same type, same immediate payload, and
    /// children that are the *same nodes* (by identity).
    ///
    /// Two trees whose children have already been made canonical are equal
    /// exactly when their roots are `shallow_same`.
    pub fn shallow_same(&self, other: &Expression) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        if !self.ty.same(&other.ty) {
            return false;
        }
        match (&self.kind, &other.kind) {
            (ExprKind::Literal(a), ExprKind::Literal(b)) => a == b,
            (ExprKind::ZSet(a), ExprKind::ZSet(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .zip(b.iter())
                        .all(|((ea, wa), (eb, wb))| wa == wb && Arc::ptr_eq(ea, eb))
            }
            (ExprKind::Tuple(a), ExprKind::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| Arc::ptr_eq(x, y))
            }
            (ExprKind::Deref(a), ExprKind::Deref(b)) => Arc::ptr_eq(a, b),
            (ExprKind::Variable(a), ExprKind::Variable(b)) => a == b,
            (
                ExprKind::Field {
                    tuple: ta,
                    index: ia,
                },
                ExprKind::Field {
                    tuple: tb,
                    index: ib,
                },
            ) => ia == ib && Arc::ptr_eq(ta, tb),
            (
                ExprKind::Closure {
                    params: pa,
                    body: ba,
                },
                ExprKind::Closure {
                    params: pb,
                    body: bb,
                },
            ) => pa == pb && Arc::ptr_eq(ba, bb),
            (
                ExprKind::Binary {
                    op: oa,
                    left: la,
                    right: ra,
                },
                ExprKind::Binary {
                    op: ob,
                    left: lb,
                    right: rb,
                },
            ) => oa == ob && Arc::ptr_eq(la, lb) && Arc::ptr_eq(ra, rb),
            _ => false,
        }
    }

    /// Short name of the node kind, for diagnostics
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ExprKind::Literal(_) => "literal",
            ExprKind::ZSet(_) => "zset",
            ExprKind::Tuple(_) => "tuple",
            ExprKind::Deref(_) => "deref",
            ExprKind::Variable(_) => "variable",
            ExprKind::Field { .. } => "field",
            ExprKind::Closure { .. } => "closure",
            ExprKind::Binary { .. } => "binary",
        }
    }
}

fn check_literal(value: &LiteralValue, ty: &Type) -> IrResult<()> {
    if matches!(value, LiteralValue::Null) {
        if ty.is_nullable() {
            return Ok(());
        }
        return Err(IrError::invariant(format!(
            "NULL literal of non-nullable type {ty}"
        )));
    }
    let fits = match (value, ty.as_scalar()) {
        (LiteralValue::Bool(_), Some(ScalarKind::Bool)) => true,
        (LiteralValue::Integer(v), Some(ScalarKind::Integer { bits })) => {
            let bits = bits.bits();
            bits == 64 || (*v >= -(1i64 << (bits - 1)) && *v < (1i64 << (bits - 1)))
        }
        (LiteralValue::Float(_), Some(ScalarKind::Float { .. })) => true,
        (LiteralValue::Decimal(_), Some(ScalarKind::Decimal)) => true,
        (LiteralValue::String(_), Some(ScalarKind::String)) => true,
        (LiteralValue::Date(_), Some(ScalarKind::Date)) => true,
        (LiteralValue::Timestamp(_), Some(ScalarKind::Timestamp)) => true,
        _ => false,
    };
    if fits {
        Ok(())
    } else {
        Err(IrError::invariant(format!(
            "literal {value:?} cannot have type {ty}"
        )))
    }
}

fn binary_result_type(op: BinaryOp, left: &Type, right: &Type) -> IrResult<Type> {
    if !left.same_ignoring_nullability(right) {
        return Err(IrError::type_mismatch(
            format!("right operand of '{op}'"),
            left,
            right,
        ));
    }
    let nullable = left.is_nullable() || right.is_nullable();
    if op.is_arithmetic() {
        if !left.is_numeric() {
            return Err(IrError::invariant(format!(
                "operator '{op}' needs numeric operands, got {left}"
            )));
        }
        return left.with_nullable(nullable);
    }
    if op.is_logical() && !left.is_bool() {
        return Err(IrError::type_mismatch(
            format!("left operand of '{op}'"),
            &Type::bool(left.is_nullable()),
            left,
        ));
    }
    Ok(Type::bool(nullable))
}

fn write_literal(f: &mut fmt::Formatter<'_>, value: &LiteralValue, ty: &Type) -> fmt::Result {
    if matches!(value, LiteralValue::Null) {
        return f.write_str("None");
    }
    if ty.is_nullable() {
        f.write_str("Some(")?;
    }
    match value {
        LiteralValue::Null => {}
        LiteralValue::Bool(b) => write!(f, "{b}")?,
        LiteralValue::Integer(i) => {
            let suffix = ty.as_scalar().map(ScalarKind::short_name).unwrap_or("i64");
            write!(f, "{i}{suffix}")?
        }
        LiteralValue::Float(x) => {
            let wrapper = if ty.width() == Some(32) { "F32" } else { "F64" };
            write!(f, "{wrapper}::new({x:?})")?
        }
        LiteralValue::Decimal(d) => write!(f, "dec!({d})")?,
        LiteralValue::String(s) => write!(f, "String::from({s:?})")?,
        LiteralValue::Date(d) => write!(f, "Date::new({d})")?,
        LiteralValue::Timestamp(t) => write!(f, "Timestamp::new({t})")?,
    }
    if ty.is_nullable() {
        f.write_str(")")?;
    }
    Ok(())
}

/// Renders the expression as target-runtime source.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Literal(value) => write_literal(f, value, &self.ty),
            ExprKind::ZSet(z) => write!(f, "{z}"),
            ExprKind::Tuple(fields) => {
                f.write_str("(")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{field}")?;
                }
                if fields.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            ExprKind::Deref(arg) => write!(f, "&{arg}"),
            ExprKind::Variable(name) => f.write_str(name),
            ExprKind::Field { tuple, index } => write!(f, "{tuple}.{index}"),
            ExprKind::Closure { params, body } => {
                f.write_str("move |")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", p.name, p.ty)?;
                }
                write!(f, "| -> {} {{ {body} }}", body.ty)
            }
            ExprKind::Binary { op, left, right } => write!(f, "({left} {op} {right})"),
        }
    }
}

#[cfg(test)]
#[path = "expr_test.rs"]
mod tests;
