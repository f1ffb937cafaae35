//! Static types of the circuit IR

use crate::error::{IrError, IrResult};
use crate::ir::expr::{ExprRef, Expression, LiteralValue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Valid bit widths for integer types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IntBitWidth {
    /// 8-bit (TINYINT)
    I8,
    /// 16-bit (SMALLINT)
    I16,
    /// 32-bit (INTEGER)
    I32,
    /// 64-bit (BIGINT)
    I64,
}

impl IntBitWidth {
    /// Number of bits
    pub fn bits(self) -> u32 {
        match self {
            IntBitWidth::I8 => 8,
            IntBitWidth::I16 => 16,
            IntBitWidth::I32 => 32,
            IntBitWidth::I64 => 64,
        }
    }
}

impl fmt::Display for IntBitWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

/// Valid bit widths for floating-point types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FloatBitWidth {
    /// 32-bit (REAL)
    F32,
    /// 64-bit (DOUBLE)
    F64,
}

impl FloatBitWidth {
    /// Number of bits
    pub fn bits(self) -> u32 {
        match self {
            FloatBitWidth::F32 => 32,
            FloatBitWidth::F64 => 64,
        }
    }
}

impl fmt::Display for FloatBitWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

/// Scalar kinds known to the IR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    /// BOOLEAN
    Bool,
    /// Signed integers
    Integer { bits: IntBitWidth },
    /// REAL / DOUBLE
    Float { bits: FloatBitWidth },
    /// Exact numeric
    Decimal,
    /// Character data
    String,
    /// DATE, days since the epoch
    Date,
    /// TIMESTAMP, milliseconds since the epoch
    Timestamp,
}

impl ScalarKind {
    /// Returns true for integer, floating-point and decimal kinds
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ScalarKind::Integer { .. } | ScalarKind::Float { .. } | ScalarKind::Decimal
        )
    }

    /// Storage width in bits, when the kind has a fixed width
    pub fn width(self) -> Option<u32> {
        match self {
            ScalarKind::Bool => Some(1),
            ScalarKind::Integer { bits } => Some(bits.bits()),
            ScalarKind::Float { bits } => Some(bits.bits()),
            ScalarKind::Decimal => Some(128),
            ScalarKind::Date => Some(32),
            ScalarKind::Timestamp => Some(64),
            ScalarKind::String => None,
        }
    }

    /// Short mnemonic used when generating identifiers
    pub fn short_name(self) -> &'static str {
        match self {
            ScalarKind::Bool => "b",
            ScalarKind::Integer {
                bits: IntBitWidth::I8,
            } => "i8",
            ScalarKind::Integer {
                bits: IntBitWidth::I16,
            } => "i16",
            ScalarKind::Integer {
                bits: IntBitWidth::I32,
            } => "i32",
            ScalarKind::Integer {
                bits: IntBitWidth::I64,
            } => "i64",
            ScalarKind::Float {
                bits: FloatBitWidth::F32,
            } => "f",
            ScalarKind::Float {
                bits: FloatBitWidth::F64,
            } => "d",
            ScalarKind::Decimal => "decimal",
            ScalarKind::String => "s",
            ScalarKind::Date => "Date",
            ScalarKind::Timestamp => "Timestamp",
        }
    }

    /// Name of the type in the target runtime
    fn runtime_name(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Integer {
                bits: IntBitWidth::I8,
            } => "i8",
            ScalarKind::Integer {
                bits: IntBitWidth::I16,
            } => "i16",
            ScalarKind::Integer {
                bits: IntBitWidth::I32,
            } => "i32",
            ScalarKind::Integer {
                bits: IntBitWidth::I64,
            } => "i64",
            ScalarKind::Float {
                bits: FloatBitWidth::F32,
            } => "F32",
            ScalarKind::Float {
                bits: FloatBitWidth::F64,
            } => "F64",
            ScalarKind::Decimal => "Decimal",
            ScalarKind::String => "String",
            ScalarKind::Date => "Date",
            ScalarKind::Timestamp => "Timestamp",
        }
    }
}

/// Discriminant of a [`Type`] together with its nested types
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum TypeKind {
    /// Scalar value
    Scalar(ScalarKind),
    /// Fixed-size tuple; the field count is set at construction
    Tuple(Vec<Type>),
    /// Reference to a value of the wrapped type
    Ref { inner: Box<Type>, mutable: bool },
    /// Weighted multiset of elements
    ZSet { element: Box<Type>, weight: Box<Type> },
    /// Closure signature
    Function { params: Vec<Type>, result: Box<Type> },
}

/// A static type: a [`TypeKind`] plus a nullability flag.
///
/// Types are plain values. Equality is structural and ignores where or how
/// a type was built; [`Type::same`] is the named form of that comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Type {
    kind: TypeKind,
    nullable: bool,
}

impl Type {
    /// Scalar type
    pub fn scalar(kind: ScalarKind, nullable: bool) -> Self {
        Self {
            kind: TypeKind::Scalar(kind),
            nullable,
        }
    }

    /// BOOLEAN
    pub fn bool(nullable: bool) -> Self {
        Self::scalar(ScalarKind::Bool, nullable)
    }

    /// Integer of the given width
    pub fn integer(bits: IntBitWidth, nullable: bool) -> Self {
        Self::scalar(ScalarKind::Integer { bits }, nullable)
    }

    /// INTEGER
    pub fn int32(nullable: bool) -> Self {
        Self::integer(IntBitWidth::I32, nullable)
    }

    /// BIGINT
    pub fn int64(nullable: bool) -> Self {
        Self::integer(IntBitWidth::I64, nullable)
    }

    /// REAL
    pub fn float(nullable: bool) -> Self {
        Self::scalar(
            ScalarKind::Float {
                bits: FloatBitWidth::F32,
            },
            nullable,
        )
    }

    /// DOUBLE
    pub fn double(nullable: bool) -> Self {
        Self::scalar(
            ScalarKind::Float {
                bits: FloatBitWidth::F64,
            },
            nullable,
        )
    }

    /// VARCHAR
    pub fn string(nullable: bool) -> Self {
        Self::scalar(ScalarKind::String, nullable)
    }

    /// Non-nullable tuple with the given field types
    pub fn tuple(fields: Vec<Type>) -> Self {
        Self {
            kind: TypeKind::Tuple(fields),
            nullable: false,
        }
    }

    /// Reference to `inner`. References are never nullable.
    pub fn reference(inner: Type, mutable: bool) -> Self {
        Self {
            kind: TypeKind::Ref {
                inner: Box::new(inner),
                mutable,
            },
            nullable: false,
        }
    }

    /// ZSet of `element` values with multiplicities of type `weight`
    pub fn zset(element: Type, weight: Type) -> Self {
        Self {
            kind: TypeKind::ZSet {
                element: Box::new(element),
                weight: Box::new(weight),
            },
            nullable: false,
        }
    }

    /// The weight type used by circuits unless told otherwise
    pub fn weight() -> Self {
        Self::int64(false)
    }

    /// Closure signature
    pub fn function(params: Vec<Type>, result: Type) -> Self {
        Self {
            kind: TypeKind::Function {
                params,
                result: Box::new(result),
            },
            nullable: false,
        }
    }

    /// Discriminant and nested types
    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    /// Whether values of this type may be NULL
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Structural comparison: discriminant, nullability, and nested types
    /// recursively.
    pub fn same(&self, other: &Type) -> bool {
        if self.nullable != other.nullable {
            return false;
        }
        match (&self.kind, &other.kind) {
            (TypeKind::Scalar(a), TypeKind::Scalar(b)) => a == b,
            (TypeKind::Tuple(a), TypeKind::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.same(y))
            }
            (
                TypeKind::Ref {
                    inner: a,
                    mutable: ma,
                },
                TypeKind::Ref {
                    inner: b,
                    mutable: mb,
                },
            ) => ma == mb && a.same(b),
            (
                TypeKind::ZSet {
                    element: ea,
                    weight: wa,
                },
                TypeKind::ZSet {
                    element: eb,
                    weight: wb,
                },
            ) => ea.same(eb) && wa.same(wb),
            (
                TypeKind::Function {
                    params: pa,
                    result: ra,
                },
                TypeKind::Function {
                    params: pb,
                    result: rb,
                },
            ) => {
                pa.len() == pb.len()
                    && pa.iter().zip(pb.iter()).all(|(x, y)| x.same(y))
                    && ra.same(rb)
            }
            _ => false,
        }
    }

    /// Structural comparison that ignores the outermost nullability flag
    pub fn same_ignoring_nullability(&self, other: &Type) -> bool {
        self.clone().nullable_unchecked(other.nullable).same(other)
    }

    /// Return this type with the given nullability.
    ///
    /// Returns an unchanged copy when the flag already matches. Reference
    /// types cannot be made nullable.
    pub fn with_nullable(&self, nullable: bool) -> IrResult<Type> {
        if self.nullable == nullable {
            return Ok(self.clone());
        }
        if nullable && matches!(self.kind, TypeKind::Ref { .. }) {
            return Err(IrError::invariant(format!(
                "reference types cannot be null: {self}"
            )));
        }
        Ok(self.clone().nullable_unchecked(nullable))
    }

    fn nullable_unchecked(mut self, nullable: bool) -> Type {
        self.nullable = nullable;
        self
    }

    /// The scalar kind, if this is a scalar type
    pub fn as_scalar(&self) -> Option<ScalarKind> {
        match self.kind {
            TypeKind::Scalar(kind) => Some(kind),
            _ => None,
        }
    }

    /// Returns true for numeric scalar types
    pub fn is_numeric(&self) -> bool {
        self.as_scalar().is_some_and(ScalarKind::is_numeric)
    }

    /// Returns true for BOOLEAN (nullable or not)
    pub fn is_bool(&self) -> bool {
        self.as_scalar() == Some(ScalarKind::Bool)
    }

    /// Field types, if this is a tuple type
    pub fn tuple_fields(&self) -> Option<&[Type]> {
        match &self.kind {
            TypeKind::Tuple(fields) => Some(fields),
            _ => None,
        }
    }

    /// Wrapped type, if this is a reference type
    pub fn ref_inner(&self) -> Option<&Type> {
        match &self.kind {
            TypeKind::Ref { inner, .. } => Some(inner),
            _ => None,
        }
    }

    /// Element type, if this is a ZSet type
    pub fn zset_element(&self) -> Option<&Type> {
        match &self.kind {
            TypeKind::ZSet { element, .. } => Some(element),
            _ => None,
        }
    }

    /// Weight type, if this is a ZSet type
    pub fn zset_weight(&self) -> Option<&Type> {
        match &self.kind {
            TypeKind::ZSet { weight, .. } => Some(weight),
            _ => None,
        }
    }

    /// Parameter and result types, if this is a function type
    pub fn function_signature(&self) -> Option<(&[Type], &Type)> {
        match &self.kind {
            TypeKind::Function { params, result } => Some((params, result)),
            _ => None,
        }
    }

    /// Storage width of a scalar type in bits
    pub fn width(&self) -> Option<u32> {
        self.as_scalar().and_then(ScalarKind::width)
    }

    /// Nested types in declaration order
    pub fn children(&self) -> Vec<&Type> {
        match &self.kind {
            TypeKind::Scalar(_) => Vec::new(),
            TypeKind::Tuple(fields) => fields.iter().collect(),
            TypeKind::Ref { inner, .. } => vec![inner.as_ref()],
            TypeKind::ZSet { element, weight } => vec![element.as_ref(), weight.as_ref()],
            TypeKind::Function { params, result } => {
                params.iter().chain(std::iter::once(result.as_ref())).collect()
            }
        }
    }

    /// Canonical zero of a numeric type, keeping its nullability.
    ///
    /// Used to seed aggregate accumulators.
    pub fn zero(&self) -> IrResult<ExprRef> {
        self.numeric_constant(0)
    }

    /// Canonical one of a numeric type, keeping its nullability
    pub fn one(&self) -> IrResult<ExprRef> {
        self.numeric_constant(1)
    }

    fn numeric_constant(&self, n: i8) -> IrResult<ExprRef> {
        let value = match self.as_scalar() {
            Some(ScalarKind::Integer { .. }) => LiteralValue::Integer(i64::from(n)),
            Some(ScalarKind::Float { .. }) => LiteralValue::Float(f64::from(n)),
            Some(ScalarKind::Decimal) => LiteralValue::Decimal(n.to_string()),
            _ => {
                return Err(IrError::invariant(format!(
                    "type {self} is not numeric and has no constant {n}"
                )))
            }
        };
        Expression::literal(value, self.clone())
    }
}

/// Renders the type in the syntax of the target runtime.
impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            f.write_str("Option<")?;
        }
        match &self.kind {
            TypeKind::Scalar(kind) => f.write_str(kind.runtime_name())?,
            TypeKind::Tuple(fields) => {
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
                f.write_str(")")?;
            }
            TypeKind::Ref { inner, mutable } => {
                let prefix = if *mutable { "&mut " } else { "&" };
                write!(f, "{prefix}{inner}")?;
            }
            TypeKind::ZSet { element, weight } => write!(f, "OrdZSet<{element}, {weight}>")?,
            TypeKind::Function { params, result } => {
                f.write_str("fn(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, ") -> {result}")?;
            }
        }
        if self.nullable {
            f.write_str(">")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
