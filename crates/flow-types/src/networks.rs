//! Network configuration types for confirmation-depth policies.
//!
//! Some networks reorganise often enough that a single inclusion is not a
//! safe signal. For those, a step is only marked confirmed after a number of
//! additional confirmations configured per chain.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Configuration for a single blockchain network.
///
/// # Fields
///
/// * `name` - Human readable network name used in logs
/// * `extra_confirmations` - Confirmations required beyond first inclusion
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct NetworkConfig {
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub extra_confirmations: u64,
}

/// Networks configuration mapping chain IDs to their configurations.
///
/// Chain IDs are string keys in TOML and are converted to u64 on load.
pub type NetworksConfig = HashMap<u64, NetworkConfig>;

/// Helper function to deserialize network configurations from TOML.
///
/// TOML doesn't support numeric keys in tables, so chain IDs arrive as
/// strings and are parsed here.
///
/// # Errors
///
/// Returns a deserialization error if a chain ID key cannot be parsed as a u64.
pub fn deserialize_networks<'de, D>(deserializer: D) -> Result<NetworksConfig, D::Error>
where
	D: Deserializer<'de>,
{
	let string_map: HashMap<String, NetworkConfig> = HashMap::deserialize(deserializer)?;
	let mut result = HashMap::new();

	for (key, value) in string_map {
		let chain_id = key
			.parse::<u64>()
			.map_err(|e| serde::de::Error::custom(format!("Invalid chain_id '{}': {}", key, e)))?;
		result.insert(chain_id, value);
	}

	Ok(result)
}

/// Extra confirmation depth keyed by chain ID. Unlisted chains require none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfirmationPolicy {
	depths: HashMap<u64, u64>,
}

impl ConfirmationPolicy {
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the extra depth for a chain, replacing any previous value.
	pub fn with_chain(mut self, chain_id: u64, extra_confirmations: u64) -> Self {
		self.depths.insert(chain_id, extra_confirmations);
		self
	}

	/// Returns the confirmations required beyond first inclusion on `chain_id`.
	pub fn extra_confirmations(&self, chain_id: u64) -> u64 {
		self.depths.get(&chain_id).copied().unwrap_or(0)
	}
}

impl From<&NetworksConfig> for ConfirmationPolicy {
	fn from(networks: &NetworksConfig) -> Self {
		Self {
			depths: networks
				.iter()
				.filter(|(_, network)| network.extra_confirmations > 0)
				.map(|(chain_id, network)| (*chain_id, network.extra_confirmations))
				.collect(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_unlisted_chain_defaults_to_zero() {
		let policy = ConfirmationPolicy::new().with_chain(137, 5);
		assert_eq!(policy.extra_confirmations(137), 5);
		assert_eq!(policy.extra_confirmations(1), 0);
	}

	#[test]
	fn test_policy_from_networks() {
		let mut networks = NetworksConfig::new();
		networks.insert(
			1,
			NetworkConfig {
				name: Some("ethereum".into()),
				extra_confirmations: 0,
			},
		);
		networks.insert(
			137,
			NetworkConfig {
				name: Some("polygon".into()),
				extra_confirmations: 3,
			},
		);

		let policy = ConfirmationPolicy::from(&networks);
		assert_eq!(policy.extra_confirmations(1), 0);
		assert_eq!(policy.extra_confirmations(137), 3);
	}

	#[test]
	fn test_deserialize_networks_rejects_bad_chain_id() {
		#[derive(Deserialize)]
		struct Wrapper {
			#[serde(deserialize_with = "deserialize_networks")]
			networks: NetworksConfig,
		}

		let ok: Wrapper = serde_json::from_str(r#"{"networks":{"10":{"extra_confirmations":2}}}"#)
			.unwrap();
		assert_eq!(ok.networks[&10].extra_confirmations, 2);

		let bad = serde_json::from_str::<Wrapper>(r#"{"networks":{"op":{}}}"#);
		assert!(bad.is_err());
	}
}
