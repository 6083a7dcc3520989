//! Basic signer wallet.
//!
//! Calls are executed directly from the signer address. A batch of more than
//! one call is aggregated into a single multicall-aggregator transaction
//! unless the caller asks for sequential submission.

use crate::{validate_targets, ContractCall, WalletError, WalletInterface, WriteContractsOptions};
use alloy_primitives::{Address as AlloyAddress, U256};
use alloy_sol_types::{sol, SolCall};
use async_trait::async_trait;
use solver_account::AccountInterface;
use solver_delivery::DeliveryService;
use solver_types::{Address, Transaction, TransactionHash};
use std::sync::Arc;

sol! {
	/// Multicall3 value-carrying aggregation entry.
	struct Call3Value {
		address target;
		bool allowFailure;
		uint256 value;
		bytes callData;
	}

	function aggregate3Value(Call3Value[] calldata calls) external payable;
}

/// Wallet that submits calls straight from the solver's signer.
pub struct BasicWallet {
	chain_id: u64,
	/// Multicall aggregator for this chain, when configured.
	multicall_address: Option<AlloyAddress>,
	account: Arc<dyn AccountInterface>,
	delivery: Arc<DeliveryService>,
}

impl BasicWallet {
	pub fn new(
		chain_id: u64,
		multicall_address: Option<AlloyAddress>,
		account: Arc<dyn AccountInterface>,
		delivery: Arc<DeliveryService>,
	) -> Self {
		Self {
			chain_id,
			multicall_address,
			account,
			delivery,
		}
	}

	/// Submits one call as its own transaction.
	async fn submit_call(&self, call: &ContractCall) -> Result<TransactionHash, WalletError> {
		let tx = Transaction::call(
			call.target.clone(),
			call.data.clone(),
			call.value,
			self.chain_id,
		);
		Ok(self.delivery.submit(tx).await?)
	}

	/// Aggregates a batch into one multicall transaction.
	async fn submit_aggregated(
		&self,
		calls: &[ContractCall],
		options: &WriteContractsOptions,
	) -> Result<TransactionHash, WalletError> {
		let multicall = self.multicall_address.ok_or_else(|| {
			WalletError::Configuration(format!(
				"No multicall aggregator configured for chain {}",
				self.chain_id
			))
		})?;

		let entries: Vec<Call3Value> = calls
			.iter()
			.map(|call| Call3Value {
				target: AlloyAddress::from_slice(&call.target.0),
				allowFailure: false,
				value: call.value,
				callData: call.data.clone().into(),
			})
			.collect();

		let total: U256 = calls.iter().map(|call| call.value).sum();
		let value = options.value.unwrap_or(total);
		let data = aggregate3ValueCall { calls: entries }.abi_encode();

		tracing::debug!(
			chain_id = self.chain_id,
			calls = calls.len(),
			value = %value,
			"Aggregating calls through multicall"
		);

		let tx = Transaction::call(
			Address(multicall.to_vec()),
			data,
			value,
			self.chain_id,
		);
		Ok(self.delivery.submit(tx).await?)
	}
}

#[async_trait]
impl WalletInterface for BasicWallet {
	async fn address(&self) -> Result<Address, WalletError> {
		self.account
			.address()
			.await
			.map_err(|e| WalletError::Signing(e.to_string()))
	}

	async fn write_contract(&self, call: ContractCall) -> Result<TransactionHash, WalletError> {
		let mut hashes = self
			.write_contracts(vec![call], WriteContractsOptions::default())
			.await?;
		hashes
			.pop()
			.ok_or_else(|| WalletError::TransactionFailed("No transaction submitted".to_string()))
	}

	async fn write_contracts(
		&self,
		calls: Vec<ContractCall>,
		options: WriteContractsOptions,
	) -> Result<Vec<TransactionHash>, WalletError> {
		if calls.is_empty() {
			return Ok(Vec::new());
		}
		validate_targets(&calls)?;

		if calls.len() == 1 {
			return Ok(vec![self.submit_call(&calls[0]).await?]);
		}

		if options.keep_sender {
			// Sequential path: each call is mined before the next is sent,
			// preserving array order on chains without account-level nonces
			let mut hashes = Vec::with_capacity(calls.len());
			for call in &calls {
				let hash = self.submit_call(call).await?;
				let receipt = self
					.delivery
					.wait_for_confirmation(&hash, self.chain_id, None)
					.await?;
				if !receipt.success {
					return Err(WalletError::TransactionFailed(format!(
						"Sequential call to {} reverted in tx {}",
						call.target, hash
					)));
				}
				hashes.push(hash);
			}
			return Ok(hashes);
		}

		Ok(vec![self.submit_aggregated(&calls, &options).await?])
	}
}
