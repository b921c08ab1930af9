//! Runtime configuration
//!
//! Loaded from JSON. Every field has a default, so `{}` is a valid
//! configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use lineage_core::LineageError;
use lineage_society::{default_limits, predict_population, GenerationLimit};

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(#[from] LineageError),
}

/// Top-level configuration
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub bootstrap: BootstrapConfig,
    pub logging: LogConfig,
}

impl RuntimeConfig {
    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = serde_json::from_str(json)?;
        config.bootstrap.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Population bootstrap configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Policy per generation; its length is the number of generations
    pub limits: Vec<GenerationLimit>,
    /// `population[0]` roots, then optional desired counts per generation
    pub population: Vec<usize>,
    /// Seed for deterministic key generation
    pub seed: u64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        BootstrapConfig {
            limits: default_limits(),
            population: vec![1],
            seed: 0,
        }
    }
}

impl BootstrapConfig {
    pub fn validate(&self) -> Result<(), LineageError> {
        if self.limits.is_empty() {
            return Err(LineageError::InvalidArgument("no generation limits".into()));
        }
        match self.population.first() {
            None => Err(LineageError::InvalidArgument("population is empty".into())),
            Some(0) => Err(LineageError::InvalidArgument(
                "at least one root identity required".into(),
            )),
            Some(_) => Ok(()),
        }
    }

    /// Population per generation after validating desired counts
    pub fn plan(&self) -> Result<Vec<usize>, LineageError> {
        self.validate()?;
        predict_population(&self.limits, &self.population)
    }

    pub fn generations(&self) -> usize {
        self.limits.len()
    }
}

/// Logging configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive, e.g. `info` or `lineage_chain=debug`
    pub level: String,
    /// Emit JSON lines instead of compact text
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: "info".into(),
            json: false,
        }
    }
}
