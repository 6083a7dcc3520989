//! Network configuration types for multi-chain solver operations.
//!
//! This module defines the configuration structures for managing network-specific
//! settings: chain family, RPC URLs, portal and multicall addresses, the optional
//! executor module, supported tokens, and the claimant address used when a chain
//! acts as an intent's source.

use crate::chains::{ChainFamily, ChainId};
use crate::Address;
use alloy_primitives::B256;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Configuration for RPC endpoints supporting both HTTP and WebSocket protocols.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcEndpoint {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub http: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub ws: Option<String>,
}

impl RpcEndpoint {
	/// Creates a new RPC endpoint with HTTP URL only.
	pub fn http_only(url: String) -> Self {
		Self {
			http: Some(url),
			ws: None,
		}
	}
}

/// Configuration for a token on a specific network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct TokenConfig {
	pub address: Address,
	pub symbol: String,
	pub decimals: u8,
}

/// Smart-account wallet settings for a network.
///
/// The account address is derived counterfactually from the signer through
/// the factory, so both the factory address and the account init code hash
/// are required wherever the kernel wallet kind is enabled.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KernelConfig {
	/// Account factory the deployment transaction is sent to.
	pub factory_address: Address,
	/// Hash of the account init code used in the CREATE2 derivation.
	pub init_code_hash: B256,
}

/// Configuration for a single blockchain network.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
	/// Chain family this network belongs to.
	pub family: ChainFamily,
	/// RPC endpoints, first usable one wins.
	pub rpc_urls: Vec<RpcEndpoint>,
	/// Portal contract/program receiving fulfillment submissions.
	pub portal_address: Address,
	/// Multicall aggregator used by the basic wallet (EVM only).
	#[serde(default)]
	pub multicall_address: Option<Address>,
	/// Executor module the kernel wallet may delegate to (EVM only, optional).
	#[serde(default)]
	pub executor_module_address: Option<Address>,
	/// Smart-account factory settings (required where kind "kernel" is used).
	#[serde(default)]
	pub kernel: Option<KernelConfig>,
	/// Claimant credited when this network is an intent's source chain.
	#[serde(default)]
	pub claimant_address: Option<Address>,
	/// Tokens the solver will move on this network.
	#[serde(default)]
	pub tokens: Vec<TokenConfig>,
	/// Confirmation depth for fulfillment transactions on this network.
	#[serde(default)]
	pub min_confirmations: Option<u64>,
}

impl NetworkConfig {
	/// Get the first available HTTP URL from the RPC endpoints.
	pub fn get_http_url(&self) -> Option<&str> {
		self.rpc_urls
			.iter()
			.find_map(|endpoint| endpoint.http.as_deref())
	}
}

/// Map of chain identifiers to network configurations.
pub type NetworksConfig = HashMap<ChainId, NetworkConfig>;

/// Deserializes a string-keyed network table into a `NetworksConfig`.
///
/// TOML table keys are strings; numeric keys normalize to `ChainId::Numeric`
/// so lookups by numeric identifier succeed regardless of the written form.
pub fn deserialize_networks<'de, D>(deserializer: D) -> Result<NetworksConfig, D::Error>
where
	D: Deserializer<'de>,
{
	let string_map: HashMap<String, NetworkConfig> = HashMap::deserialize(deserializer)?;
	let mut result = HashMap::new();

	for (key, value) in string_map {
		let chain_id: ChainId = key.parse().expect("ChainId::from_str is infallible");
		result.insert(chain_id, value);
	}

	Ok(result)
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[derive(Deserialize)]
	struct Wrapper {
		#[serde(deserialize_with = "deserialize_networks")]
		networks: NetworksConfig,
	}

	#[test]
	fn test_deserialize_networks_normalizes_keys() {
		let value = json!({
			"networks": {
				"10": {
					"family": "evm",
					"rpc_urls": [{"http": "https://optimism.example"}],
					"portal_address": "0x7d2768dE32b0b80b7a3454c06BdAc94A69DDc7A9",
					"multicall_address": "0xcA11bde05977b3631167028862bE2a173976CA11"
				},
				"solana-mainnet": {
					"family": "svm",
					"rpc_urls": [{"http": "https://api.mainnet-beta.solana.com"}],
					"portal_address": "0x1212121212121212121212121212121212121212121212121212121212121212"
				}
			}
		});

		let wrapper: Wrapper = serde_json::from_value(value).expect("deserialize");
		assert!(wrapper.networks.contains_key(&ChainId::Numeric(10)));
		assert!(wrapper
			.networks
			.contains_key(&ChainId::Named("solana-mainnet".to_string())));

		let optimism = &wrapper.networks[&ChainId::Numeric(10)];
		assert_eq!(optimism.family, ChainFamily::Evm);
		assert!(optimism.multicall_address.is_some());
		assert!(optimism.executor_module_address.is_none());
	}
}
