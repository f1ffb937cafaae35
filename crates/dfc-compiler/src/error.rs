//! Error types for dfc-compiler

use dfc_ir::IrError;
use thiserror::Error;

/// Errors raised while configuring or running the pass pipeline
#[derive(Error, Debug)]
pub enum CompilerError {
    /// DC001: Options file not found
    #[error("[DC001] Compiler options not found: {path}")]
    ConfigNotFound { path: String },

    /// DC002: Options file could not be read
    #[error("[DC002] Failed to read {path}: {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// DC003: Options are not valid YAML for [`CompilerOptions`](crate::CompilerOptions)
    #[error("[DC003] Failed to parse compiler options: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// DC004: A pass name that no built-in pass answers to
    #[error("[DC004] Unknown pass '{name}' (available: {available})")]
    UnknownPass { name: String, available: String },

    /// DC005: A pass returned an error; its partial result was discarded
    #[error("[DC005] Pass '{pass}' failed: {source}")]
    PassFailed {
        pass: String,
        #[source]
        source: IrError,
    },

    /// DC006: A pass produced a circuit that does not validate
    #[error("[DC006] Circuit produced by pass '{pass}' is malformed: {source}")]
    VerificationFailed {
        pass: String,
        #[source]
        source: IrError,
    },

    /// IR error outside of any pass
    #[error(transparent)]
    Ir(#[from] IrError),
}

/// Result alias for dfc-compiler
pub type CompilerResult<T> = Result<T, CompilerError>;
