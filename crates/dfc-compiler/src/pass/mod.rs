//! Pass infrastructure: circuit-to-circuit rewrites run in sequence

pub mod constant_fold;
pub mod dead_code;
pub mod dedup;

use crate::config::CompilerOptions;
use crate::error::{CompilerError, CompilerResult};
use dfc_ir::{Circuit, CircuitStatistics, IrResult};
use log::Level;

/// Names of the built-in passes, in the order they run by default
pub const DEFAULT_PASSES: &[&str] = &[
    dead_code::DeadCodeElimination::NAME,
    constant_fold::ConstantFolding::NAME,
    dedup::Deduplication::NAME,
];

/// A rewrite from one circuit to another.
///
/// A pass never modifies its input; unchanged nodes are shared with the
/// output by identity.
pub trait CircuitPass: Send + Sync {
    /// Pass name (used in options and logs)
    fn name(&self) -> &'static str;
    /// Human-readable description
    fn description(&self) -> &'static str;
    /// Produce the rewritten circuit
    fn run(&self, circuit: &Circuit) -> IrResult<Circuit>;
}

/// Built-in pass answering to `name`
pub fn pass_by_name(name: &str) -> Option<Box<dyn CircuitPass>> {
    match name {
        dead_code::DeadCodeElimination::NAME => Some(Box::new(dead_code::DeadCodeElimination)),
        constant_fold::ConstantFolding::NAME => Some(Box::new(constant_fold::ConstantFolding)),
        dedup::Deduplication::NAME => Some(Box::new(dedup::Deduplication)),
        _ => None,
    }
}

/// Runs a sequence of passes, each consuming the previous one's output
pub struct PassManager {
    passes: Vec<Box<dyn CircuitPass>>,
    verify: bool,
    log_level: Level,
}

impl PassManager {
    /// A PassManager running every built-in pass with verification on
    pub fn with_defaults() -> Self {
        Self {
            passes: vec![
                Box::new(dead_code::DeadCodeElimination),
                Box::new(constant_fold::ConstantFolding),
                Box::new(dedup::Deduplication),
            ],
            verify: true,
            log_level: Level::Debug,
        }
    }

    /// A PassManager running the passes named in `options`, in that order
    pub fn from_options(options: &CompilerOptions) -> CompilerResult<Self> {
        let passes = options
            .passes
            .iter()
            .map(|name| {
                pass_by_name(name).ok_or_else(|| CompilerError::UnknownPass {
                    name: name.clone(),
                    available: DEFAULT_PASSES.join(", "),
                })
            })
            .collect::<CompilerResult<Vec<_>>>()?;
        Ok(Self {
            passes,
            verify: options.verify,
            log_level: if options.log_statistics {
                Level::Info
            } else {
                Level::Debug
            },
        })
    }

    /// Run all passes over `circuit`.
    ///
    /// The first failing pass aborts the pipeline. With verification on, the
    /// input and the output of every pass must pass [`Circuit::validate`].
    pub fn run(&self, circuit: &Circuit) -> CompilerResult<Circuit> {
        if self.verify {
            circuit.validate()?;
        }
        let mut current = circuit.clone();
        for pass in &self.passes {
            log::debug!("Running pass '{}' on circuit '{}'", pass.name(), current.name());
            let next = pass
                .run(&current)
                .map_err(|source| CompilerError::PassFailed {
                    pass: pass.name().to_string(),
                    source,
                })?;
            if self.verify {
                next.validate()
                    .map_err(|source| CompilerError::VerificationFailed {
                        pass: pass.name().to_string(),
                        source,
                    })?;
            }
            if log::log_enabled!(self.log_level) {
                let before = CircuitStatistics::collect(&current)?;
                let after = CircuitStatistics::collect(&next)?;
                log::log!(
                    self.log_level,
                    "Pass '{}': {} -> {}",
                    pass.name(),
                    before,
                    after
                );
            }
            current = next;
        }
        Ok(current)
    }

    /// List the passes in run order
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Name and description of every pass, in run order
    pub fn describe(&self) -> Vec<(&'static str, &'static str)> {
        self.passes
            .iter()
            .map(|p| (p.name(), p.description()))
            .collect()
    }
}

impl Default for PassManager {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
