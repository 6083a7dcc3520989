//! Builder for network configuration test fixtures.

use crate::chains::ChainFamily;
use crate::networks::{KernelConfig, NetworkConfig, RpcEndpoint, TokenConfig};
use crate::Address;
use alloy_primitives::B256;

/// Builds a [`NetworkConfig`] with sensible defaults for tests.
#[derive(Debug, Clone)]
pub struct NetworkConfigBuilder {
	config: NetworkConfig,
}

impl NetworkConfigBuilder {
	pub fn new(family: ChainFamily) -> Self {
		Self {
			config: NetworkConfig {
				family,
				rpc_urls: vec![RpcEndpoint::http_only("http://localhost:8545".to_string())],
				portal_address: Address(vec![0xF0; 20]),
				multicall_address: None,
				executor_module_address: None,
				kernel: None,
				claimant_address: None,
				tokens: vec![],
				min_confirmations: None,
			},
		}
	}

	pub fn evm() -> Self {
		Self::new(ChainFamily::Evm).multicall_address(Address(vec![0xCA; 20]))
	}

	pub fn portal_address(mut self, address: Address) -> Self {
		self.config.portal_address = address;
		self
	}

	pub fn multicall_address(mut self, address: Address) -> Self {
		self.config.multicall_address = Some(address);
		self
	}

	pub fn executor_module_address(mut self, address: Address) -> Self {
		self.config.executor_module_address = Some(address);
		self
	}

	pub fn kernel(mut self, factory_address: Address, init_code_hash: B256) -> Self {
		self.config.kernel = Some(KernelConfig {
			factory_address,
			init_code_hash,
		});
		self
	}

	pub fn claimant_address(mut self, address: Address) -> Self {
		self.config.claimant_address = Some(address);
		self
	}

	pub fn token(mut self, address: Address, symbol: &str, decimals: u8) -> Self {
		self.config.tokens.push(TokenConfig {
			address,
			symbol: symbol.to_string(),
			decimals,
		});
		self
	}

	pub fn build(self) -> NetworkConfig {
		self.config
	}
}
