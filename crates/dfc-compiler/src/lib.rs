//! dfc-compiler: rewrite passes over the dataflow circuit IR
//!
//! This crate provides the YAML-configurable pass pipeline that runs on top
//! of `dfc-ir`: a pass trait, a manager that chains passes and verifies
//! their output, and the built-in dead code, constant folding and
//! deduplication passes.

pub(crate) mod config;
pub(crate) mod error;
pub(crate) mod pass;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

pub use config::CompilerOptions;
pub use error::{CompilerError, CompilerResult};
pub use pass::constant_fold::ConstantFolding;
pub use pass::dead_code::DeadCodeElimination;
pub use pass::dedup::Deduplication;
pub use pass::{pass_by_name, CircuitPass, PassManager, DEFAULT_PASSES};
