//! Transaction delivery implementation for EVM-family networks.
//!
//! This module provides a concrete implementation of the DeliveryInterface trait,
//! supporting blockchain transaction submission and monitoring using the Alloy library.

use crate::{DeliveryError, DeliveryInterface};
use alloy_network::EthereumWallet;
use alloy_primitives::{Address as AlloyAddress, FixedBytes, U256};
use alloy_provider::{
	fillers::{ChainIdFiller, GasFiller, NonceFiller, SimpleNonceManager},
	DynProvider, PendingTransactionConfig, PendingTransactionError, Provider, ProviderBuilder,
};
use alloy_rpc_client::RpcClient;
use alloy_rpc_types::TransactionRequest;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_transport::layers::RetryBackoffLayer;
use async_trait::async_trait;
use solver_types::{
	with_0x_prefix, Address, ChainFamily, NetworksConfig, Transaction, TransactionHash,
	TransactionReceipt,
};
use std::collections::HashMap;
use std::time::Duration;

/// Alloy-based EVM delivery implementation.
///
/// This implementation uses the Alloy library to submit and monitor transactions
/// on EVM-compatible blockchains. It handles transaction signing, submission,
/// and confirmation tracking. Supports multiple networks with a single instance.
pub struct AlloyDelivery {
	/// Alloy providers for each supported network.
	providers: HashMap<u64, DynProvider>,
}

impl AlloyDelivery {
	/// Creates a new AlloyDelivery instance.
	///
	/// Configures Alloy providers for every EVM network in the configuration,
	/// with the given signer wired in for transaction submission.
	pub async fn new(
		networks: &NetworksConfig,
		signer: PrivateKeySigner,
	) -> Result<Self, DeliveryError> {
		let mut providers = HashMap::new();

		for (chain_id, network) in networks {
			if network.family != ChainFamily::Evm {
				continue;
			}
			let network_id = chain_id.as_u64().ok_or_else(|| {
				DeliveryError::Network(format!("EVM network {} has no numeric id", chain_id))
			})?;

			let http_url = network.get_http_url().ok_or_else(|| {
				DeliveryError::Network(format!(
					"No HTTP RPC URL configured for network {}",
					network_id
				))
			})?;

			let url = http_url.parse().map_err(|e| {
				DeliveryError::Network(format!("Invalid RPC URL for network {}: {}", network_id, e))
			})?;

			let chain_signer = signer.clone().with_chain_id(Some(network_id));
			let wallet = EthereumWallet::from(chain_signer);

			// Retry layer for transient network errors and rate limits
			let retry_layer = RetryBackoffLayer::new(5, 1000, 10);
			let client = RpcClient::builder().layer(retry_layer).http(url);

			let provider = ProviderBuilder::new()
				.filler(NonceFiller::new(SimpleNonceManager::default()))
				.filler(GasFiller)
				.filler(ChainIdFiller::default())
				.wallet(wallet)
				.connect_client(client);

			providers.insert(network_id, provider.erased());
		}

		if providers.is_empty() {
			return Err(DeliveryError::Network(
				"No EVM networks configured".to_string(),
			));
		}

		Ok(Self { providers })
	}

	/// Gets the provider for a specific chain ID.
	fn get_provider(&self, chain_id: u64) -> Result<&DynProvider, DeliveryError> {
		self.providers.get(&chain_id).ok_or_else(|| {
			DeliveryError::Network(format!("No provider configured for chain ID {}", chain_id))
		})
	}

	/// Converts a solver transaction into an Alloy transaction request.
	fn to_request(tx: &Transaction) -> Result<TransactionRequest, DeliveryError> {
		let to = tx
			.to
			.as_ref()
			.and_then(|addr| addr.as_evm())
			.ok_or_else(|| {
				DeliveryError::Network("Transaction target is not a 20-byte address".to_string())
			})?;

		let mut request = TransactionRequest::default()
			.to(to)
			.value(tx.value)
			.input(tx.data.clone().into());
		request.chain_id = Some(tx.chain_id);
		request.nonce = tx.nonce;
		request.gas = tx.gas_limit;
		request.gas_price = tx.gas_price;
		request.max_fee_per_gas = tx.max_fee_per_gas;
		request.max_priority_fee_per_gas = tx.max_priority_fee_per_gas;
		Ok(request)
	}

	/// Parses an address into its Alloy form.
	fn evm_address(address: &Address) -> Result<AlloyAddress, DeliveryError> {
		address.as_evm().ok_or_else(|| {
			DeliveryError::Network(format!("Not a 20-byte EVM address: {}", address))
		})
	}

	/// Reads a uint256 return value from a bare-selector contract call.
	async fn read_u256(
		&self,
		chain_id: u64,
		token: AlloyAddress,
		call_data: Vec<u8>,
	) -> Result<U256, DeliveryError> {
		let provider = self.get_provider(chain_id)?;
		let result = provider
			.call(
				TransactionRequest::default()
					.to(token)
					.input(call_data.into()),
			)
			.await
			.map_err(|e| DeliveryError::Network(format!("Contract read failed: {}", e)))?;

		if result.len() < 32 {
			return Err(DeliveryError::Network(
				"Invalid uint256 response".to_string(),
			));
		}
		Ok(U256::from_be_slice(&result[..32]))
	}
}

#[async_trait]
impl DeliveryInterface for AlloyDelivery {
	async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError> {
		let chain_id = tx.chain_id;
		let provider = self.get_provider(chain_id)?;
		let request = Self::to_request(&tx)?;

		tracing::debug!(
			chain_id = chain_id,
			to = ?request.to,
			value = ?request.value,
			data_len = tx.data.len(),
			"Sending transaction"
		);

		// The provider's wallet handles signing
		let pending_tx = provider.send_transaction(request).await.map_err(|e| {
			tracing::error!("Transaction submission failed on chain {}: {}", chain_id, e);
			DeliveryError::Network(format!("Failed to send transaction: {}", e))
		})?;

		let tx_hash = *pending_tx.tx_hash();
		tracing::info!(
			tx_hash = %with_0x_prefix(&hex::encode(tx_hash.0)),
			chain_id = chain_id,
			"Transaction submitted"
		);

		Ok(TransactionHash(tx_hash.0.to_vec()))
	}

	async fn wait_for_confirmation(
		&self,
		hash: &TransactionHash,
		chain_id: u64,
		confirmations: u64,
		timeout_seconds: u64,
	) -> Result<TransactionReceipt, DeliveryError> {
		let tx_hash = FixedBytes::<32>::from_slice(&hash.0);
		let provider = self.get_provider(chain_id)?;

		tracing::debug!(
			tx_hash = %hash,
			confirmations = confirmations,
			timeout_seconds = timeout_seconds,
			"Waiting for confirmations"
		);

		let config = PendingTransactionConfig::new(tx_hash)
			.with_required_confirmations(confirmations)
			.with_timeout(Some(Duration::from_secs(timeout_seconds)));

		let pending_tx = provider
			.watch_pending_transaction(config)
			.await
			.map_err(|e| match e {
				PendingTransactionError::TxWatcher(_) => {
					DeliveryError::ConfirmationTimeout(format!("Transaction watch failed: {}", e))
				},
				PendingTransactionError::FailedToRegister => {
					DeliveryError::Network("Failed to register transaction watcher".to_string())
				},
				PendingTransactionError::TransportError(_) => {
					DeliveryError::Network(format!("Transport error: {}", e))
				},
				PendingTransactionError::Recv(_) => {
					DeliveryError::Network(format!("Failed to receive response: {}", e))
				},
			})?;

		let confirmed_hash = pending_tx.await.map_err(|e| {
			DeliveryError::ConfirmationTimeout(format!("Failed to confirm transaction: {}", e))
		})?;

		self.get_receipt(&TransactionHash(confirmed_hash.0.to_vec()), chain_id)
			.await?
			.ok_or_else(|| {
				DeliveryError::Network(format!(
					"Confirmed transaction {} has no receipt on chain {}",
					hash, chain_id
				))
			})
	}

	async fn get_receipt(
		&self,
		hash: &TransactionHash,
		chain_id: u64,
	) -> Result<Option<TransactionReceipt>, DeliveryError> {
		let tx_hash = FixedBytes::<32>::from_slice(&hash.0);
		let provider = self.get_provider(chain_id)?;

		match provider.get_transaction_receipt(tx_hash).await {
			Ok(Some(receipt)) => Ok(Some(TransactionReceipt {
				hash: TransactionHash(receipt.transaction_hash.0.to_vec()),
				block_number: receipt.block_number.unwrap_or(0),
				success: receipt.status(),
			})),
			Ok(None) => Ok(None),
			Err(e) => Err(DeliveryError::Network(format!(
				"Failed to get receipt on chain {}: {}",
				chain_id, e
			))),
		}
	}

	async fn get_balance(&self, address: &Address, chain_id: u64) -> Result<U256, DeliveryError> {
		let address = Self::evm_address(address)?;
		let provider = self.get_provider(chain_id)?;

		provider
			.get_balance(address)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get balance: {}", e)))
	}

	async fn get_allowance(
		&self,
		owner: &Address,
		spender: &Address,
		token: &Address,
		chain_id: u64,
	) -> Result<U256, DeliveryError> {
		let owner = Self::evm_address(owner)?;
		let spender = Self::evm_address(spender)?;
		let token = Self::evm_address(token)?;

		// allowance(address,address) selector is 0xdd62ed3e
		let mut call_data = Vec::with_capacity(4 + 64);
		call_data.extend_from_slice(&[0xdd, 0x62, 0xed, 0x3e]);
		call_data.extend_from_slice(&[0; 12]);
		call_data.extend_from_slice(owner.as_slice());
		call_data.extend_from_slice(&[0; 12]);
		call_data.extend_from_slice(spender.as_slice());

		self.read_u256(chain_id, token, call_data).await
	}

	async fn get_code(&self, address: &Address, chain_id: u64) -> Result<Vec<u8>, DeliveryError> {
		let address = Self::evm_address(address)?;
		let provider = self.get_provider(chain_id)?;

		let code = provider
			.get_code_at(address)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get code: {}", e)))?;

		Ok(code.to_vec())
	}

	async fn call(&self, tx: Transaction) -> Result<Vec<u8>, DeliveryError> {
		let provider = self.get_provider(tx.chain_id)?;
		let request = Self::to_request(&tx)?;

		let result = provider
			.call(request)
			.await
			.map_err(|e| DeliveryError::Network(format!("Contract call failed: {}", e)))?;

		Ok(result.to_vec())
	}
}
