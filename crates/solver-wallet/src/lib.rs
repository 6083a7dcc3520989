//! Wallet abstraction for the intent execution engine.
//!
//! Executors hand the wallet layer a list of contract calls and get back
//! transaction ids; the wallet decides how those calls reach the chain. Two
//! implementations exist: a basic signer wallet that batches through a
//! multicall aggregator, and an ERC-7579 kernel smart account that routes
//! calls through `execute(mode, payload)`, optionally via an installed
//! executor module.

use alloy_primitives::U256;
use async_trait::async_trait;
use solver_types::{Address, TransactionHash};
use thiserror::Error;

pub mod manager;
pub mod mode;

/// Re-export implementations
pub mod implementations {
	pub mod basic;
	pub mod kernel;
}

pub use manager::WalletManager;

/// Errors that can occur during wallet operations.
#[derive(Debug, Error)]
pub enum WalletError {
	/// Missing or inconsistent wallet configuration for a chain.
	///
	/// Fatal for the job; never retried.
	#[error("Wallet configuration error: {0}")]
	Configuration(String),
	/// A call list that violates the wallet contract.
	///
	/// Programming error, fatal, never retried.
	#[error("Invalid call at index {index}: {reason}")]
	InvalidCall { index: usize, reason: String },
	/// An empty call list passed where at least one call is required.
	#[error("Empty call list")]
	EmptyBatch,
	/// The wallet was used before initialization completed.
	#[error("Wallet not initialized: {0}")]
	NotInitialized(String),
	/// Signing failed in the underlying account.
	#[error("Signing error: {0}")]
	Signing(String),
	/// A transaction was mined but did not succeed.
	#[error("Transaction failed: {0}")]
	TransactionFailed(String),
	/// Error propagated from the delivery layer.
	#[error("Delivery error: {0}")]
	Delivery(#[from] solver_delivery::DeliveryError),
}

/// A single contract call to be executed by a wallet.
#[derive(Debug, Clone)]
pub struct ContractCall {
	/// Call target. Must be a 20-byte address.
	pub target: Address,
	/// Native value attached to the call.
	pub value: U256,
	/// Encoded calldata.
	pub data: Vec<u8>,
}

impl ContractCall {
	pub fn new(target: Address, data: Vec<u8>, value: U256) -> Self {
		Self {
			target,
			value,
			data,
		}
	}
}

/// Options controlling how a batch of calls is submitted.
#[derive(Debug, Clone, Default)]
pub struct WriteContractsOptions {
	/// Overrides the computed total native value of the batch.
	pub value: Option<U256>,
	/// Forces sequential per-call submission from the signer itself.
	///
	/// Only honored by the basic wallet; kernel wallets ignore it.
	pub keep_sender: bool,
}

/// Trait defining the interface for wallet implementations.
///
/// A wallet instance is bound to one chain; the manager hands out one
/// instance per `(chain, kind)` pair.
#[async_trait]
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait WalletInterface: Send + Sync {
	/// The address transactions are executed from.
	///
	/// For the basic wallet this is the signer address; for kernel wallets
	/// it is the smart-account address.
	async fn address(&self) -> Result<Address, WalletError>;

	/// Submits a single contract call.
	async fn write_contract(&self, call: ContractCall) -> Result<TransactionHash, WalletError>;

	/// Submits a batch of contract calls.
	///
	/// Returns one transaction id per submitted transaction: a single id
	/// when the batch is aggregated, one per call when submitted
	/// sequentially, and an empty list for an empty batch.
	async fn write_contracts(
		&self,
		calls: Vec<ContractCall>,
		options: WriteContractsOptions,
	) -> Result<Vec<TransactionHash>, WalletError>;
}

/// Validates that every call in a batch has a 20-byte target, naming the
/// offending index otherwise.
pub(crate) fn validate_targets(calls: &[ContractCall]) -> Result<(), WalletError> {
	for (index, call) in calls.iter().enumerate() {
		if call.target.0.len() != 20 {
			return Err(WalletError::InvalidCall {
				index,
				reason: format!(
					"target must be a 20-byte address, got {} bytes",
					call.target.0.len()
				),
			});
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_validate_targets_names_offending_index() {
		let calls = vec![
			ContractCall::new(Address(vec![0x01; 20]), vec![], U256::ZERO),
			ContractCall::new(Address(vec![0x02; 32]), vec![], U256::ZERO),
		];
		let err = validate_targets(&calls).expect_err("must fail");
		match err {
			WalletError::InvalidCall { index, .. } => assert_eq!(index, 1),
			other => panic!("unexpected error: {other}"),
		}
	}

	#[test]
	fn test_validate_targets_accepts_evm_addresses() {
		let calls = vec![ContractCall::new(Address(vec![0x01; 20]), vec![], U256::ZERO)];
		assert!(validate_targets(&calls).is_ok());
	}
}
