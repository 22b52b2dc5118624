//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {value}")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load a TOML file, apply `GATEWAY_*` environment overrides, validate.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: GatewayConfig = toml::from_str(&content)?;
    finish(config, |var| std::env::var(var).ok())
}

/// Defaults plus environment overrides, for running without a file.
pub fn load_from_env() -> Result<GatewayConfig, ConfigError> {
    finish(GatewayConfig::default(), |var| std::env::var(var).ok())
}

fn finish(
    mut config: GatewayConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<GatewayConfig, ConfigError> {
    apply_env_overrides(&mut config, env)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overrides read through `env` so tests need not touch the process
/// environment.
pub fn apply_env_overrides(
    config: &mut GatewayConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(url) = env("GATEWAY_RPC_URL") {
        config.blockchain.rpc_url = url;
    }
    if let Some(raw) = env("GATEWAY_CHAIN_ID") {
        config.blockchain.chain_id = raw.trim().parse().map_err(|_| ConfigError::Env {
            var: "GATEWAY_CHAIN_ID",
            value: raw.clone(),
        })?;
    }
    if let Some(raw) = env("GATEWAY_DEBUG") {
        config.debug = match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" | "" => false,
            _ => {
                return Err(ConfigError::Env {
                    var: "GATEWAY_DEBUG",
                    value: raw,
                })
            }
        };
    }
    if let Some(addr) = env("GATEWAY_BIND_ADDRESS") {
        config.listener.bind_address = addr;
    }
    Ok(())
}
