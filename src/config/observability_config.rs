//! Observability toggles.

use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct ObservabilityEnvConfig {
    /// Exposes `/metrics` when true; metrics are collected either way
    pub enabled: bool,
}

impl ObservabilityEnvConfig {
    pub fn from_env() -> Result<Self> {
        let enabled = match env::var("OBSERVABILITY_ENABLED") {
            Ok(value) => parse_flag(&value)
                .with_context(|| format!("Failed to parse OBSERVABILITY_ENABLED={}", value))?,
            Err(_) => true,
        };
        Ok(Self { enabled })
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => anyhow::bail!("expected true/false, got '{}'", other),
    }
}
