//! # Engine Configuration
//!
//! TOML configuration for the collaborating parts of the engine. Every
//! section and field is optional; an empty document yields the defaults.
//!
//! ```toml
//! [limits]
//! max_block_count = 100000
//! max_depth = 50
//!
//! [addressing]
//! policy = "content_addressed"
//!
//! [validation]
//! dangling_edge_severity = "info"
//!
//! [executor]
//! max_commands = 500
//! ```

use crate::addressing::{ContentAddressing, IdPolicy};
use crate::graph::ContentGraph;
use crate::primitives::DEFAULT_MAX_COMMANDS;
use crate::ucl::UclExecutor;
use crate::validation::{ResourceLimits, ValidationEngine, ValidationSeverity};
use crate::UcpError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub limits: ResourceLimits,
    pub addressing: AddressingConfig,
    pub validation: ValidationConfig,
    pub executor: ExecutorConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AddressingConfig {
    pub policy: IdPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    /// `warning` or `info`.
    pub dangling_edge_severity: ValidationSeverity,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            dangling_edge_severity: ValidationSeverity::Warning,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutorConfig {
    /// Upper bound on commands per execution run.
    pub max_commands: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_commands: DEFAULT_MAX_COMMANDS,
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, UcpError> {
        let config: Self = toml::from_str(source).map_err(|e| UcpError::Config(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, UcpError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| UcpError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    fn check(&self) -> Result<(), UcpError> {
        if self.validation.dangling_edge_severity == ValidationSeverity::Error {
            return Err(UcpError::Config(
                "dangling_edge_severity must be \"warning\" or \"info\"".to_string(),
            ));
        }
        if self.executor.max_commands == 0 {
            return Err(UcpError::Config(
                "max_commands must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// An empty graph using the configured id policy.
    #[must_use]
    pub fn graph(&self) -> ContentGraph {
        ContentGraph::with_addressing(ContentAddressing::new(self.addressing.policy))
    }

    #[must_use]
    pub fn validator(&self) -> ValidationEngine {
        ValidationEngine::new(self.limits)
            .with_dangling_edge_severity(self.validation.dangling_edge_severity)
    }

    #[must_use]
    pub fn executor(&self) -> UclExecutor {
        UclExecutor::new()
            .with_validator(self.validator())
            .with_max_commands(self.executor.max_commands)
    }
}
