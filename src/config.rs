//! Runtime configuration, persisted as TOML.
//!
//! Every field has a serde default, so a partial (or empty) file is valid.
//! Command-line flags override values read from the file.

use std::path::Path;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::StateVectorBackend;
use crate::backend::statevector::{DEFAULT_MAX_REGISTERS, REGISTER_CEILING};
use crate::circuit::Strategy;
use crate::qpu::ExecutionConfig;

/// Errors from configuration files.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(qrbs::config::read),
        help("Ensure the config file exists and is valid TOML.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}")]
    #[diagnostic(
        code(qrbs::config::parse),
        help("Check the TOML syntax. Valid strategies are cf, fuzzy and bayes. {message}")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(qrbs::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config value for `{field}`: {message}")]
    #[diagnostic(code(qrbs::config::invalid), help("{hint}"))]
    Invalid {
        field: &'static str,
        message: String,
        hint: String,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Execution settings for the `qrbs` tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrbsConfig {
    /// Uncertainty encoding.
    #[serde(default)]
    pub strategy: Strategy,
    /// Sampled trials per island; 0 for exact distributions.
    #[serde(default)]
    pub trials: u64,
    /// Register limit of the reference simulator.
    #[serde(default = "default_max_registers")]
    pub max_registers: usize,
    /// Seed for sampled runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Compile independent islands in parallel.
    #[serde(default = "default_parallel_compile")]
    pub parallel_compile: bool,
}

fn default_max_registers() -> usize {
    DEFAULT_MAX_REGISTERS
}
fn default_parallel_compile() -> bool {
    true
}

impl Default for QrbsConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            trials: 0,
            max_registers: default_max_registers(),
            seed: None,
            parallel_compile: default_parallel_compile(),
        }
    }
}

impl QrbsConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that the TOML types cannot express.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_registers == 0 || self.max_registers > REGISTER_CEILING {
            return Err(ConfigError::Invalid {
                field: "max_registers",
                message: format!("{} is outside 1..={REGISTER_CEILING}", self.max_registers),
                hint: format!(
                    "The simulator stores 2^n amplitudes; use at most {REGISTER_CEILING} registers."
                ),
            });
        }
        Ok(())
    }

    /// Save to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    pub fn to_execution_config(&self) -> ExecutionConfig {
        ExecutionConfig {
            strategy: self.strategy,
            trials: self.trials,
            parallel_compile: self.parallel_compile,
        }
    }

    /// The reference simulator configured by this file.
    pub fn to_backend(&self) -> StateVectorBackend {
        let backend = StateVectorBackend::new(self.max_registers);
        match self.seed {
            Some(seed) => backend.with_seed(seed),
            None => backend,
        }
    }
}
