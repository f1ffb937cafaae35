//! Row descriptions for the JIT backend
//!
//! A row is described as an ordered list of scalar columns, each with its
//! nullability. The JSON form is what the JIT consumes.

use crate::error::{IrError, IrResult};
use crate::ir::types::{FloatBitWidth, IntBitWidth, ScalarKind, Type};
use serde::Serialize;
use std::fmt;

/// Scalar column types understood by the JIT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum JitScalarType {
    /// Zero-sized placeholder column
    Unit,
    Bool,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    String,
    Decimal,
    Date,
    Timestamp,
}

impl From<ScalarKind> for JitScalarType {
    fn from(kind: ScalarKind) -> Self {
        match kind {
            ScalarKind::Bool => JitScalarType::Bool,
            ScalarKind::Integer { bits } => match bits {
                IntBitWidth::I8 => JitScalarType::I8,
                IntBitWidth::I16 => JitScalarType::I16,
                IntBitWidth::I32 => JitScalarType::I32,
                IntBitWidth::I64 => JitScalarType::I64,
            },
            ScalarKind::Float { bits } => match bits {
                FloatBitWidth::F32 => JitScalarType::F32,
                FloatBitWidth::F64 => JitScalarType::F64,
            },
            ScalarKind::Decimal => JitScalarType::Decimal,
            ScalarKind::String => JitScalarType::String,
            ScalarKind::Date => JitScalarType::Date,
            ScalarKind::Timestamp => JitScalarType::Timestamp,
        }
    }
}

impl fmt::Display for JitScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One column of a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JitColumn {
    /// Whether the column may hold NULL
    pub nullable: bool,
    /// Column type
    pub ty: JitScalarType,
}

/// Layout of a row, identified by the id the backend assigns to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JitRowType {
    #[serde(skip)]
    id: u64,
    columns: Vec<JitColumn>,
}

impl JitRowType {
    /// Describe the tuple type `ty`.
    ///
    /// A tuple without fields becomes a single non-nullable `Unit` column.
    /// Only the nullability of the fields is recorded; that of the tuple
    /// itself is not part of the layout.
    pub fn new(id: u64, ty: &Type) -> IrResult<Self> {
        let fields = ty.tuple_fields().ok_or_else(|| {
            IrError::invariant(format!("JIT row type needs a tuple type, got {ty}"))
        })?;
        if fields.is_empty() {
            return Ok(Self {
                id,
                columns: vec![JitColumn {
                    nullable: false,
                    ty: JitScalarType::Unit,
                }],
            });
        }
        let columns = fields
            .iter()
            .enumerate()
            .map(|(i, field)| {
                let kind = field.as_scalar().ok_or_else(|| {
                    IrError::invariant(format!(
                        "JIT row column {i} must be a scalar, got {field}"
                    ))
                })?;
                Ok(JitColumn {
                    nullable: field.is_nullable(),
                    ty: kind.into(),
                })
            })
            .collect::<IrResult<Vec<_>>>()?;
        Ok(Self { id, columns })
    }

    /// Backend-assigned id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Columns in field order
    pub fn columns(&self) -> &[JitColumn] {
        &self.columns
    }

    /// `{"columns": [{"nullable": .., "ty": ..}, ..]}`
    pub fn to_json(&self) -> serde_json::Value {
        let columns: Vec<serde_json::Value> = self
            .columns
            .iter()
            .map(|c| serde_json::json!({ "nullable": c.nullable, "ty": c.ty }))
            .collect();
        serde_json::json!({ "columns": columns })
    }
}

impl fmt::Display for JitRowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", column.ty)?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::row_type;
    use serde_json::json;

    #[test]
    fn test_row_type_columns() {
        let row = JitRowType::new(7, &row_type()).unwrap();
        assert_eq!(row.id(), 7);
        assert_eq!(
            row.columns(),
            &[
                JitColumn {
                    nullable: false,
                    ty: JitScalarType::I32
                },
                JitColumn {
                    nullable: true,
                    ty: JitScalarType::F64
                },
            ]
        );
        assert_eq!(row.to_string(), "[I32, F64]");
        assert_eq!(
            row.to_json(),
            json!({"columns": [
                {"nullable": false, "ty": "I32"},
                {"nullable": true, "ty": "F64"}
            ]})
        );
    }

    #[test]
    fn test_empty_tuple_is_unit_column() {
        let row = JitRowType::new(0, &Type::tuple(vec![])).unwrap();
        assert_eq!(
            row.to_json(),
            json!({"columns": [{"nullable": false, "ty": "Unit"}]})
        );
    }

    #[test]
    fn test_nullable_empty_tuple_ignores_tuple_nullability() {
        let ty = Type::tuple(vec![]).with_nullable(true).unwrap();
        let row = JitRowType::new(0, &ty).unwrap();
        assert_eq!(
            row.columns(),
            &[JitColumn {
                nullable: false,
                ty: JitScalarType::Unit
            }]
        );
    }

    #[test]
    fn test_non_tuple_and_nested_columns_rejected() {
        assert!(matches!(
            JitRowType::new(0, &Type::int32(false)),
            Err(IrError::InvariantViolation { .. })
        ));
        let nested = Type::tuple(vec![Type::tuple(vec![Type::bool(false)])]);
        assert!(matches!(
            JitRowType::new(0, &nested),
            Err(IrError::InvariantViolation { .. })
        ));
    }

    #[test]
    fn test_serialize_matches_to_json() {
        let row = JitRowType::new(1, &row_type()).unwrap();
        assert_eq!(serde_json::to_value(&row).unwrap(), row.to_json());
    }
}
