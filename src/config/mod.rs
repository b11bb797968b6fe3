//! Configuration module for riskserve.
//!
//! Structured configuration loading from environment variables, organized by
//! concern: Serving and Observability.

mod observability_config;
mod serving_config;

pub use observability_config::ObservabilityEnvConfig;
pub use serving_config::{
    DEFAULT_IRIS_MODEL_PATHS, DEFAULT_MODEL_PATHS, ServingEnvConfig, check_ratio_epsilon,
    parse_paths,
};

use crate::domain::ml::tier_ladder::TierLadder;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // Serving (from ServingEnvConfig)
    pub model_paths: Vec<PathBuf>,
    pub iris_model_paths: Vec<PathBuf>,
    pub ratio_epsilon: f64,
    pub bind_address: String,
    pub port: u16,
    pub tier_ladder: TierLadder,

    // Observability (from ObservabilityEnvConfig)
    pub observability_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let serving = ServingEnvConfig::from_env().context("Failed to load serving config")?;
        let observability =
            ObservabilityEnvConfig::from_env().context("Failed to load observability config")?;

        Ok(Self {
            model_paths: serving.model_paths,
            iris_model_paths: serving.iris_model_paths,
            ratio_epsilon: serving.ratio_epsilon,
            bind_address: serving.bind_address,
            port: serving.port,
            tier_ladder: serving.tier_ladder,
            observability_enabled: observability.enabled,
        })
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}
