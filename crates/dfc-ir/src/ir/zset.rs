//! Constant weighted multisets (ZSet literals)

use super::expr::{ExprKind, ExprRef, Expression, LiteralValue};
use super::types::Type;
use crate::error::{IrError, IrResult};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Value identity of a constant element.
///
/// Elements are keyed by value so that two separately built literals with
/// the same value address the same entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum ConstantKey {
    Null,
    Bool(bool),
    Integer(i64),
    Float(FloatKey),
    Decimal(String),
    String(String),
    Date(i32),
    Timestamp(i64),
    Tuple(Vec<ConstantKey>),
    ZSet(Vec<(ConstantKey, i64)>),
}

/// Total order over floats so they can be used as map keys
#[derive(Debug, Clone, Copy)]
struct FloatKey(f64);

impl PartialEq for FloatKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for FloatKey {}

impl PartialOrd for FloatKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

fn constant_key(expr: &Expression) -> IrResult<ConstantKey> {
    match expr.kind() {
        ExprKind::Literal(value) => Ok(match value {
            LiteralValue::Null => ConstantKey::Null,
            LiteralValue::Bool(b) => ConstantKey::Bool(*b),
            LiteralValue::Integer(i) => ConstantKey::Integer(*i),
            LiteralValue::Float(x) => ConstantKey::Float(FloatKey(*x)),
            LiteralValue::Decimal(d) => ConstantKey::Decimal(d.clone()),
            LiteralValue::String(s) => ConstantKey::String(s.clone()),
            LiteralValue::Date(d) => ConstantKey::Date(*d),
            LiteralValue::Timestamp(t) => ConstantKey::Timestamp(*t),
        }),
        ExprKind::Tuple(fields) => fields
            .iter()
            .map(|f| constant_key(f))
            .collect::<IrResult<Vec<_>>>()
            .map(ConstantKey::Tuple),
        ExprKind::ZSet(z) => Ok(ConstantKey::ZSet(
            z.data
                .iter()
                .map(|(key, (_, weight))| (key.clone(), *weight))
                .collect(),
        )),
        _ => Err(IrError::invariant(format!(
            "ZSet elements must be constants, got {} {expr}",
            expr.kind_name()
        ))),
    }
}

/// A constant ZSet: each distinct element maps to a non-zero weight.
///
/// All elements share the declared element type. Entries whose weight sums
/// to zero are removed, so an entry with weight 0 never exists. Iteration is
/// ordered by element value.
#[derive(Debug, Clone)]
pub struct ZSetLiteral {
    zset_type: Type,
    element_type: Type,
    weight_type: Type,
    data: BTreeMap<ConstantKey, (ExprRef, i64)>,
}

impl ZSetLiteral {
    /// Empty ZSet of the given ZSet type
    pub fn new(zset_type: Type) -> IrResult<Self> {
        let (Some(element_type), Some(weight_type)) =
            (zset_type.zset_element(), zset_type.zset_weight())
        else {
            return Err(IrError::invariant(format!(
                "ZSet literal needs a ZSet type, got {zset_type}"
            )));
        };
        Ok(Self {
            element_type: element_type.clone(),
            weight_type: weight_type.clone(),
            zset_type,
            data: BTreeMap::new(),
        })
    }

    /// Empty ZSet of `element_type` with the default weight type
    pub fn empty(element_type: Type) -> Self {
        Self {
            zset_type: Type::zset(element_type.clone(), Type::weight()),
            element_type,
            weight_type: Type::weight(),
            data: BTreeMap::new(),
        }
    }

    /// ZSet holding each of `elements` once.
    ///
    /// The element type is taken from the first element, so `elements` cannot
    /// be empty; use [`ZSetLiteral::empty`] for an empty ZSet.
    pub fn from_elements(elements: Vec<ExprRef>) -> IrResult<Self> {
        let first = elements.first().ok_or_else(|| {
            IrError::invariant("cannot infer the element type of an empty ZSet literal")
        })?;
        let mut zset = Self::empty(first.ty().clone());
        for element in elements {
            zset.insert(element)?;
        }
        Ok(zset)
    }

    /// Declared ZSet type
    pub fn zset_type(&self) -> &Type {
        &self.zset_type
    }

    /// Declared element type
    pub fn element_type(&self) -> &Type {
        &self.element_type
    }

    /// Declared weight type
    pub fn weight_type(&self) -> &Type {
        &self.weight_type
    }

    /// Add `element` with weight 1
    pub fn insert(&mut self, element: ExprRef) -> IrResult<()> {
        self.add(element, 1)
    }

    /// Add `weight` to the weight of `element`.
    ///
    /// The element must be a constant of the declared element type. When the
    /// accumulated weight reaches zero the entry is removed.
    pub fn add(&mut self, element: ExprRef, weight: i64) -> IrResult<()> {
        if !element.ty().same(self.element_type()) {
            return Err(IrError::type_mismatch(
                "ZSet element",
                self.element_type(),
                element.ty(),
            ));
        }
        let key = constant_key(&element)?;
        match self.data.get_mut(&key) {
            Some((_, existing)) => {
                let sum = existing.checked_add(weight).ok_or_else(|| {
                    IrError::invariant(format!("ZSet weight overflow adding {weight} to {element}"))
                })?;
                if sum == 0 {
                    self.data.remove(&key);
                } else {
                    *existing = sum;
                }
            }
            None if weight != 0 => {
                self.data.insert(key, (element, weight));
            }
            None => {}
        }
        Ok(())
    }

    /// Fold every entry of `other` into this ZSet.
    ///
    /// Both ZSets must have the same declared type.
    pub fn merge(&mut self, other: &ZSetLiteral) -> IrResult<()> {
        if !self.zset_type.same(&other.zset_type) {
            return Err(IrError::type_mismatch(
                "ZSet merge",
                &self.zset_type,
                &other.zset_type,
            ));
        }
        for (element, weight) in other.iter() {
            self.add(element.clone(), weight)?;
        }
        Ok(())
    }

    /// Copy of this ZSet with every weight negated.
    ///
    /// Fails when a weight is `i64::MIN`.
    pub fn negate(&self) -> IrResult<ZSetLiteral> {
        let data = self
            .data
            .iter()
            .map(|(key, (element, weight))| {
                let negated = weight.checked_neg().ok_or_else(|| {
                    IrError::invariant(format!(
                        "ZSet weight overflow negating {weight} of {element}"
                    ))
                })?;
                Ok((key.clone(), (element.clone(), negated)))
            })
            .collect::<IrResult<_>>()?;
        Ok(ZSetLiteral {
            zset_type: self.zset_type.clone(),
            element_type: self.element_type.clone(),
            weight_type: self.weight_type.clone(),
            data,
        })
    }

    /// Weight of `element`, or `None` when it is absent
    pub fn weight(&self, element: &Expression) -> Option<i64> {
        let key = constant_key(element).ok()?;
        self.data.get(&key).map(|(_, weight)| *weight)
    }

    /// Number of distinct elements (not the sum of weights)
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the ZSet has no elements
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Entries ordered by element value
    pub fn iter(&self) -> impl Iterator<Item = (&ExprRef, i64)> + '_ {
        self.data.values().map(|(element, weight)| (element, *weight))
    }

    /// Same declared type, same elements (by value), same weights
    pub fn same(&self, other: &ZSetLiteral) -> bool {
        self.zset_type.same(&other.zset_type)
            && self.data.len() == other.data.len()
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|((ka, (_, wa)), (kb, (_, wb)))| ka == kb && wa == wb)
    }
}

impl PartialEq for ZSetLiteral {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl fmt::Display for ZSetLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.data.is_empty() {
            return write!(f, "zset!(<{}>)", self.element_type());
        }
        f.write_str("zset!(")?;
        for (i, (element, weight)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{element} => {weight}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
#[path = "zset_test.rs"]
mod tests;
