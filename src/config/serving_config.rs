//! Serving configuration parsing from environment variables.
//!
//! This module handles model artifact locations, feature derivation tuning,
//! the listener address and the tier ladder.

use crate::domain::ml::tier_ladder::{HIGH_RISK, TierLadder};
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_MODEL_PATHS: &str =
    "models/liquidity_model.json,notebooks/tuned_liquidity_model.json";
pub const DEFAULT_IRIS_MODEL_PATHS: &str = "models/iris_model.json,model.json";

/// Serving environment configuration
#[derive(Debug, Clone)]
pub struct ServingEnvConfig {
    pub model_paths: Vec<PathBuf>,
    pub iris_model_paths: Vec<PathBuf>,
    pub ratio_epsilon: f64,
    pub bind_address: String,
    pub port: u16,
    pub tier_ladder: TierLadder,
}

impl ServingEnvConfig {
    pub fn from_env() -> Result<Self> {
        let ratio_epsilon = check_ratio_epsilon(Self::parse_f64("RATIO_EPSILON", 0.0)?)
            .context("Invalid RATIO_EPSILON")?;

        Ok(Self {
            model_paths: parse_paths(
                &env::var("MODEL_PATHS").unwrap_or_else(|_| DEFAULT_MODEL_PATHS.to_string()),
            ),
            iris_model_paths: parse_paths(
                &env::var("IRIS_MODEL_PATHS")
                    .unwrap_or_else(|_| DEFAULT_IRIS_MODEL_PATHS.to_string()),
            ),
            ratio_epsilon,
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse::<u16>()
                .context("Failed to parse PORT")?,
            tier_ladder: Self::load_ladder()?,
        })
    }

    /// TIER_LADDER_FILE wins over TIER_THRESHOLDS; neither means the default ladder.
    fn load_ladder() -> Result<TierLadder> {
        if let Ok(path) = env::var("TIER_LADDER_FILE") {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read TIER_LADDER_FILE {}", path))?;
            return TierLadder::from_toml_str(&content)
                .with_context(|| format!("Invalid tier ladder in {}", path));
        }

        if let Ok(rungs) = env::var("TIER_THRESHOLDS") {
            let floor = env::var("TIER_FLOOR").unwrap_or_else(|_| HIGH_RISK.to_string());
            return TierLadder::parse_rungs(&rungs, &floor)
                .context("Failed to parse TIER_THRESHOLDS");
        }

        Ok(TierLadder::liquidity_default())
    }

    fn parse_f64(key: &str, default: f64) -> Result<f64> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<f64>()
            .context(format!("Failed to parse {}", key))
    }
}

/// Denominator tolerance shared by serving and training
pub fn check_ratio_epsilon(value: f64) -> Result<f64> {
    if !value.is_finite() || value < 0.0 {
        anyhow::bail!("ratio epsilon must be a finite, non-negative number, got {}", value);
    }
    Ok(value)
}

/// Comma-separated candidate list, blanks dropped, order kept
pub fn parse_paths(value: &str) -> Vec<PathBuf> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}
