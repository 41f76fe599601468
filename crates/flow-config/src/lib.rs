//! Configuration module for the multi-step transaction flow.
//!
//! This module provides structures and utilities for managing flow
//! configuration. It supports loading configuration from TOML files and
//! validates every value before an orchestrator is built from it.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files for better organization:
//! - Use `include = ["file1.toml", "file2.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)

mod loader;

use flow_types::{networks::deserialize_networks, ConfirmationPolicy, NetworksConfig};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		let message = err.message().to_string();
		ConfigError::Parse(message)
	}
}

/// Main configuration structure for a transaction flow.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Flow identity and global submission overrides.
	pub flow: FlowConfig,
	/// Confirmation polling settings.
	#[serde(default)]
	pub confirmation: ConfirmationConfig,
	/// Per-network confirmation depth.
	#[serde(default, deserialize_with = "deserialize_networks")]
	pub networks: NetworksConfig,
}

/// Flow identity and the global override flags.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FlowConfig {
	/// Identifier used in logs.
	pub id: String,
	/// Blocks every submission while set.
	#[serde(default)]
	pub disabled: bool,
	/// UI-only: show every step as loading. Has no effect on state.
	#[serde(default)]
	pub force_loading: bool,
	/// Label shown while `force_loading` is set.
	#[serde(default)]
	pub force_loading_label: Option<String>,
}

/// Settings for waiting on transaction confirmations.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConfirmationConfig {
	/// Interval between receipt polls, in milliseconds.
	#[serde(default = "default_poll_interval_ms")]
	pub poll_interval_ms: u64,
	/// Maximum time to wait for a single confirmation phase.
	#[serde(default = "default_timeout_minutes")]
	pub timeout_minutes: u64,
	/// Confirmations that count as first inclusion.
	#[serde(default = "default_base_confirmations")]
	pub base_confirmations: u64,
}

impl Default for ConfirmationConfig {
	fn default() -> Self {
		Self {
			poll_interval_ms: default_poll_interval_ms(),
			timeout_minutes: default_timeout_minutes(),
			base_confirmations: default_base_confirmations(),
		}
	}
}

/// Returns the default poll interval of 3 seconds.
fn default_poll_interval_ms() -> u64 {
	3000
}

/// Returns the default confirmation timeout of 30 minutes.
fn default_timeout_minutes() -> u64 {
	30
}

fn default_base_confirmations() -> u64 {
	1
}

/// Upper bound for a network's extra confirmation depth.
const MAX_EXTRA_CONFIRMATIONS: u64 = 1000;

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024; // 1MB
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut replacements = Vec::new();
	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)));
				}
			},
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply replacements in reverse order to maintain positions
	let mut result = input.to_string();
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Builds the per-chain extra confirmation policy.
	pub fn confirmation_policy(&self) -> ConfirmationPolicy {
		ConfirmationPolicy::from(&self.networks)
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.confirmation.poll_interval_ms)
	}

	pub fn confirmation_timeout(&self) -> Duration {
		Duration::from_secs(self.confirmation.timeout_minutes * 60)
	}

	/// Parses and validates text whose environment variables are already resolved.
	pub(crate) fn from_resolved(resolved: &str) -> Result<Self, ConfigError> {
		let config: Config = toml::from_str(resolved)?;
		config.validate()?;
		Ok(config)
	}

	/// Validates the configuration to ensure all required fields are properly set.
	///
	/// - Ensures the flow ID is not empty
	/// - Requires a label whenever force-loading is enabled
	/// - Bounds the polling interval, timeout and base confirmations
	/// - Bounds each network's extra confirmation depth
	fn validate(&self) -> Result<(), ConfigError> {
		if self.flow.id.trim().is_empty() {
			return Err(ConfigError::Validation("Flow ID cannot be empty".into()));
		}

		if self.flow.force_loading
			&& self
				.flow
				.force_loading_label
				.as_deref()
				.is_none_or(|label| label.trim().is_empty())
		{
			return Err(ConfigError::Validation(
				"force_loading_label is required when force_loading is enabled".into(),
			));
		}

		if self.confirmation.poll_interval_ms == 0 {
			return Err(ConfigError::Validation(
				"Confirmation poll_interval_ms must be greater than 0".into(),
			));
		}
		if self.confirmation.timeout_minutes == 0 || self.confirmation.timeout_minutes > 1440 {
			return Err(ConfigError::Validation(
				"Confirmation timeout_minutes must be between 1 and 1440 (24 hours)".into(),
			));
		}
		if self.confirmation.base_confirmations == 0 {
			return Err(ConfigError::Validation(
				"Confirmation base_confirmations must be at least 1".into(),
			));
		}

		for (chain_id, network) in &self.networks {
			if network.extra_confirmations > MAX_EXTRA_CONFIRMATIONS {
				return Err(ConfigError::Validation(format!(
					"Network {} extra_confirmations cannot exceed {}",
					chain_id, MAX_EXTRA_CONFIRMATIONS
				)));
			}
		}

		Ok(())
	}
}

impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		Self::from_resolved(&resolved)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("TEST_FLOW_HOST", "localhost");
		std::env::set_var("TEST_FLOW_PORT", "8545");

		let input = "host = \"${TEST_FLOW_HOST}:${TEST_FLOW_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "host = \"localhost:8545\"");

		std::env::remove_var("TEST_FLOW_HOST");
		std::env::remove_var("TEST_FLOW_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${MISSING_FLOW_VAR:-default_value}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"default_value\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let input = "value = \"${MISSING_FLOW_VAR}\"";
		let result = resolve_env_vars(input);
		assert!(result.is_err());
		assert!(result.unwrap_err().to_string().contains("MISSING_FLOW_VAR"));
	}

	#[test]
	fn test_minimal_config_uses_defaults() {
		let config: Config = "[flow]\nid = \"swap\"\n".parse().unwrap();

		assert_eq!(config.flow.id, "swap");
		assert!(!config.flow.disabled);
		assert!(!config.flow.force_loading);
		assert_eq!(config.confirmation.poll_interval_ms, 3000);
		assert_eq!(config.confirmation.timeout_minutes, 30);
		assert_eq!(config.confirmation.base_confirmations, 1);
		assert!(config.networks.is_empty());
		assert_eq!(config.confirmation_timeout(), Duration::from_secs(1800));
	}

	#[test]
	fn test_full_config_and_policy() {
		std::env::set_var("TEST_FLOW_POLYGON_DEPTH", "5");

		let config_str = r#"
[flow]
id = "approve-and-swap"
force_loading = true
force_loading_label = "Preparing"

[confirmation]
poll_interval_ms = 500
timeout_minutes = 10

[networks.1]
name = "ethereum"

[networks.137]
name = "polygon"
extra_confirmations = ${TEST_FLOW_POLYGON_DEPTH}
"#;

		let config: Config = config_str.parse().unwrap();
		let policy = config.confirmation_policy();
		assert_eq!(policy.extra_confirmations(1), 0);
		assert_eq!(policy.extra_confirmations(137), 5);
		assert_eq!(config.poll_interval(), Duration::from_millis(500));
		assert_eq!(config.flow.force_loading_label.as_deref(), Some("Preparing"));

		std::env::remove_var("TEST_FLOW_POLYGON_DEPTH");
	}

	#[test]
	fn test_validation_errors() {
		let empty_id = "[flow]\nid = \"\"\n".parse::<Config>();
		assert!(empty_id
			.unwrap_err()
			.to_string()
			.contains("Flow ID cannot be empty"));

		let missing_label = "[flow]\nid = \"x\"\nforce_loading = true\n".parse::<Config>();
		assert!(missing_label
			.unwrap_err()
			.to_string()
			.contains("force_loading_label"));

		let zero_poll =
			"[flow]\nid = \"x\"\n[confirmation]\npoll_interval_ms = 0\n".parse::<Config>();
		assert!(zero_poll.unwrap_err().to_string().contains("poll_interval_ms"));

		let too_deep = "[flow]\nid = \"x\"\n[networks.1]\nextra_confirmations = 5000\n"
			.parse::<Config>();
		assert!(too_deep
			.unwrap_err()
			.to_string()
			.contains("Network 1 extra_confirmations"));
	}

	#[test]
	fn test_invalid_chain_id_key() {
		let result = "[flow]\nid = \"x\"\n[networks.mainnet]\n".parse::<Config>();
		assert!(matches!(result, Err(ConfigError::Parse(_))));
	}
}
