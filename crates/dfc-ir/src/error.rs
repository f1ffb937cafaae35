//! Error types for dfc-ir

use crate::ir::types::Type;
use thiserror::Error;

/// IR error type
///
/// Every error is fatal for the construction or pass that raised it: the IR
/// never repairs a node or substitutes a default.
#[derive(Error, Debug)]
pub enum IrError {
    /// IR001: Declared and actual types disagree
    #[error("[IR001] Type mismatch in {context}: expected {expected}, found {actual}")]
    TypeMismatch {
        context: String,
        expected: Type,
        actual: Type,
    },

    /// IR002: A structural invariant was violated outside ordinary type checking
    #[error("[IR002] Invariant violated: {message}")]
    InvariantViolation { message: String },

    /// IR003: A visitor hook aborted the traversal
    #[error("[IR003] Visitor '{visitor}' failed: {message}")]
    TraversalFailed { visitor: String, message: String },
}

impl IrError {
    pub(crate) fn type_mismatch(context: impl Into<String>, expected: &Type, actual: &Type) -> Self {
        IrError::TypeMismatch {
            context: context.into(),
            expected: expected.clone(),
            actual: actual.clone(),
        }
    }

    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        IrError::InvariantViolation {
            message: message.into(),
        }
    }

    /// Build the error a visitor hook returns to abort its pass
    pub fn traversal(visitor: impl Into<String>, message: impl Into<String>) -> Self {
        IrError::TraversalFailed {
            visitor: visitor.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for IrError
pub type IrResult<T> = Result<T, IrError>;
