//! Transaction delivery module for the intent execution engine.
//!
//! This module handles the submission and monitoring of blockchain transactions.
//! It provides abstractions for different delivery mechanisms across EVM- and
//! TVM-family networks, managing transaction signing, submission, confirmation,
//! and the read-only contract queries the wallet layer depends on.

use alloy_primitives::U256;
use async_trait::async_trait;
use solver_types::{Address, ChainFamily, Transaction, TransactionHash, TransactionReceipt};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
	pub mod tvm {
		pub mod http;
	}
}

/// Errors that can occur during transaction delivery operations.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// Error that occurs during network communication.
	#[error("Network error: {0}")]
	Network(String),
	/// Error that occurs when a transaction execution fails.
	#[error("Transaction failed: {0}")]
	TransactionFailed(String),
	/// Error that occurs when confirmation waiting exceeds its timeout.
	///
	/// The broadcast transaction may still confirm later; callers retrying
	/// after this error must check for late confirmation first.
	#[error("Transaction confirmation timed out: {0}")]
	ConfirmationTimeout(String),
	/// Error that occurs when no suitable implementation is available for the chain.
	#[error("No delivery implementation for chain {0}")]
	NoImplementationAvailable(u64),
}

/// Trait defining the interface for transaction delivery implementations.
///
/// This trait must be implemented by any delivery implementation that wants to
/// integrate with the solver system. It provides methods for submitting
/// transactions, monitoring their confirmation status, and reading on-chain
/// state.
#[async_trait]
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait DeliveryInterface: Send + Sync {
	/// Signs and submits a transaction to the blockchain.
	///
	/// Takes a transaction, signs it with the appropriate signer for the chain,
	/// then submits it to the network and returns the transaction hash.
	async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError>;

	/// Waits until a transaction reaches the requested confirmation depth.
	///
	/// Exceeding `timeout_seconds` yields [`DeliveryError::ConfirmationTimeout`],
	/// never a silent success.
	async fn wait_for_confirmation(
		&self,
		hash: &TransactionHash,
		chain_id: u64,
		confirmations: u64,
		timeout_seconds: u64,
	) -> Result<TransactionReceipt, DeliveryError>;

	/// Retrieves the receipt for a transaction if it has been mined.
	///
	/// Returns `None` while the transaction is pending or unknown.
	async fn get_receipt(
		&self,
		hash: &TransactionHash,
		chain_id: u64,
	) -> Result<Option<TransactionReceipt>, DeliveryError>;

	/// Gets the native balance for an address.
	async fn get_balance(&self, address: &Address, chain_id: u64) -> Result<U256, DeliveryError>;

	/// Gets the ERC-20/TRC-20 token allowance for an owner-spender pair.
	async fn get_allowance(
		&self,
		owner: &Address,
		spender: &Address,
		token: &Address,
		chain_id: u64,
	) -> Result<U256, DeliveryError>;

	/// Gets the deployed bytecode at an address.
	///
	/// An empty vector means no contract is deployed there.
	async fn get_code(&self, address: &Address, chain_id: u64) -> Result<Vec<u8>, DeliveryError>;

	/// Executes a contract call without sending a transaction.
	///
	/// This performs a read-only call to read data from smart contracts
	/// without submitting to the blockchain.
	async fn call(&self, tx: Transaction) -> Result<Vec<u8>, DeliveryError>;
}

/// Service that routes delivery operations to per-family implementations.
///
/// EVM and TVM chains share the [`Transaction`] model but need different
/// wire-level plumbing; the service holds one implementation per family and
/// routes each call by the chain's configured family.
pub struct DeliveryService {
	/// Delivery implementation per chain, resolved at construction time.
	implementations: HashMap<u64, Arc<dyn DeliveryInterface>>,
	/// Default confirmation depth for networks without an override.
	min_confirmations: u64,
	/// Confirmation wait timeout in seconds.
	transaction_timeout_seconds: u64,
}

impl DeliveryService {
	/// Creates a new DeliveryService.
	///
	/// `by_family` carries at most one implementation per chain family;
	/// `chains` maps every numeric chain id the solver serves to its family.
	/// Chains whose family has no implementation are skipped with a log line,
	/// mirroring how the executor registry treats missing families.
	pub fn new(
		chains: HashMap<u64, ChainFamily>,
		by_family: HashMap<ChainFamily, Arc<dyn DeliveryInterface>>,
		min_confirmations: u64,
		transaction_timeout_seconds: u64,
	) -> Self {
		let mut implementations = HashMap::new();
		for (chain_id, family) in chains {
			match by_family.get(&family) {
				Some(implementation) => {
					implementations.insert(chain_id, implementation.clone());
				},
				None => {
					tracing::warn!(
						chain_id = chain_id,
						family = %family,
						"No delivery implementation for chain family, skipping chain"
					);
				},
			}
		}
		Self {
			implementations,
			min_confirmations,
			transaction_timeout_seconds,
		}
	}

	/// Gets the implementation serving a chain.
	fn implementation(&self, chain_id: u64) -> Result<&Arc<dyn DeliveryInterface>, DeliveryError> {
		self.implementations
			.get(&chain_id)
			.ok_or(DeliveryError::NoImplementationAvailable(chain_id))
	}

	/// Signs and submits a transaction on its chain.
	pub async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError> {
		self.implementation(tx.chain_id)?.submit(tx).await
	}

	/// Waits for a transaction using the configured confirmation depth and timeout.
	pub async fn wait_for_confirmation(
		&self,
		hash: &TransactionHash,
		chain_id: u64,
		confirmations: Option<u64>,
	) -> Result<TransactionReceipt, DeliveryError> {
		self.implementation(chain_id)?
			.wait_for_confirmation(
				hash,
				chain_id,
				confirmations.unwrap_or(self.min_confirmations),
				self.transaction_timeout_seconds,
			)
			.await
	}

	/// Retrieves a transaction receipt if available.
	pub async fn get_receipt(
		&self,
		hash: &TransactionHash,
		chain_id: u64,
	) -> Result<Option<TransactionReceipt>, DeliveryError> {
		self.implementation(chain_id)?.get_receipt(hash, chain_id).await
	}

	/// Gets the native balance for an address.
	pub async fn get_balance(
		&self,
		address: &Address,
		chain_id: u64,
	) -> Result<U256, DeliveryError> {
		self.implementation(chain_id)?
			.get_balance(address, chain_id)
			.await
	}

	/// Gets a token allowance for an owner-spender pair.
	pub async fn get_allowance(
		&self,
		owner: &Address,
		spender: &Address,
		token: &Address,
		chain_id: u64,
	) -> Result<U256, DeliveryError> {
		self.implementation(chain_id)?
			.get_allowance(owner, spender, token, chain_id)
			.await
	}

	/// Gets the deployed bytecode at an address.
	pub async fn get_code(
		&self,
		address: &Address,
		chain_id: u64,
	) -> Result<Vec<u8>, DeliveryError> {
		self.implementation(chain_id)?
			.get_code(address, chain_id)
			.await
	}

	/// Executes a read-only contract call.
	pub async fn call(&self, tx: Transaction) -> Result<Vec<u8>, DeliveryError> {
		self.implementation(tx.chain_id)?.call(tx).await
	}
}
