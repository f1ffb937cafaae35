//! Compiler options and their YAML form

use crate::error::{CompilerError, CompilerResult};
use crate::pass::DEFAULT_PASSES;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Options controlling which passes run and how the pipeline reports.
///
/// ```yaml
/// passes: [dead_code, constant_fold, dedup]
/// verify: true
/// log_statistics: false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerOptions {
    /// Passes to run, in order
    #[serde(default = "default_passes")]
    pub passes: Vec<String>,

    /// Validate the circuit before the pipeline and after every pass
    #[serde(default = "default_true")]
    pub verify: bool,

    /// Log per-pass node counts at info level instead of debug
    #[serde(default)]
    pub log_statistics: bool,
}

fn default_passes() -> Vec<String> {
    DEFAULT_PASSES.iter().map(|name| name.to_string()).collect()
}

fn default_true() -> bool {
    true
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            passes: default_passes(),
            verify: true,
            log_statistics: false,
        }
    }
}

impl CompilerOptions {
    /// Parse options from YAML text. An empty document yields the defaults.
    pub fn from_yaml_str(yaml: &str) -> CompilerResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load options from a YAML file
    pub fn load(path: &Path) -> CompilerResult<Self> {
        if !path.exists() {
            return Err(CompilerError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CompilerError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let options = Self::from_yaml_str(&content)?;
        log::debug!(
            "Loaded compiler options from {}: passes [{}]",
            path.display(),
            options.passes.join(", ")
        );
        Ok(options)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
