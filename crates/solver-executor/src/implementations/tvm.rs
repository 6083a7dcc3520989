//! Intent executor for TVM-family (Tron) chains.
//!
//! Tron contracts speak the EVM ABI, so calldata encoding is shared with the
//! EVM executor. What differs is submission: there is no multicall
//! aggregator, so TRC-20 approvals and the fulfill call go out as strictly
//! sequential transactions, each mined before the next.

use crate::{abi, ExecutorError, ExecutorInterface, ProverResolver};
use alloy_primitives::U256;
use async_trait::async_trait;
use solver_delivery::DeliveryService;
use solver_types::{
	truncate_id, with_0x_prefix, Address, ChainId, ExecutionResult, Intent, NetworkConfig,
	NetworksConfig, TransactionHash, WalletKind, WithdrawalRequest,
};
use solver_wallet::{ContractCall, WalletError, WalletManager, WriteContractsOptions};
use std::sync::Arc;

pub struct TvmExecutor {
	networks: NetworksConfig,
	wallets: Arc<WalletManager>,
	delivery: Arc<DeliveryService>,
	provers: Arc<dyn ProverResolver>,
}

impl TvmExecutor {
	pub fn new(
		networks: NetworksConfig,
		wallets: Arc<WalletManager>,
		delivery: Arc<DeliveryService>,
		provers: Arc<dyn ProverResolver>,
	) -> Self {
		Self {
			networks,
			wallets,
			delivery,
			provers,
		}
	}

	fn network(&self, chain_id: &ChainId) -> Result<&NetworkConfig, ExecutorError> {
		self.networks.get(chain_id).ok_or_else(|| {
			ExecutorError::Configuration(format!("No network configured for chain {}", chain_id))
		})
	}

	fn numeric(chain_id: &ChainId) -> Result<u64, ExecutorError> {
		chain_id.as_u64().ok_or_else(|| {
			ExecutorError::Configuration(format!("Chain {} has no numeric id", chain_id))
		})
	}
}

#[async_trait]
impl ExecutorInterface for TvmExecutor {
	async fn fulfill(
		&self,
		intent: &Intent,
		wallet_kind: Option<WalletKind>,
	) -> Result<ExecutionResult, ExecutorError> {
		let source = Self::numeric(&intent.source_chain_id)?;
		let destination = Self::numeric(&intent.destination)?;
		let network = self.network(&intent.destination)?;
		let portal = network.portal_address.as_evm().ok_or_else(|| {
			ExecutorError::Configuration(format!(
				"Portal for chain {} is not a 20-byte address",
				destination
			))
		})?;

		let wallet = self.wallets.wallet(destination, wallet_kind).await?;
		let claimant = match self
			.network(&intent.source_chain_id)
			.ok()
			.and_then(|net| net.claimant_address.clone())
		{
			Some(claimant) => claimant,
			None => wallet.address().await?,
		};

		let prover = self
			.provers
			.prover(&intent.source_chain_id, &intent.reward.prover)
			.ok_or_else(|| ExecutorError::ProverNotFound {
				source_chain: intent.source_chain_id.clone(),
				prover: intent.reward.prover.to_string(),
			})?;
		let prover_contract = prover
			.contract_address(&intent.destination)
			.and_then(|address| address.as_evm())
			.ok_or_else(|| {
				ExecutorError::Configuration(format!(
					"Prover has no contract on chain {}",
					destination
				))
			})?;

		let prover_fee = prover.fee(intent, &claimant).await?;
		let proof = prover.generate_proof(intent).await?;

		let mut calls: Vec<ContractCall> = intent
			.route
			.tokens
			.iter()
			.map(|entry| {
				ContractCall::new(
					entry.token.clone(),
					abi::approve_calldata(portal, entry.amount),
					U256::ZERO,
				)
			})
			.collect();
		calls.push(ContractCall::new(
			network.portal_address.clone(),
			abi::fulfill_calldata(intent, &claimant, prover_contract, source, proof)?,
			prover_fee,
		));

		tracing::debug!(
			intent_hash = %truncate_id(&intent.intent_hash.to_string()),
			chain_id = destination,
			transactions = calls.len(),
			"Submitting sequential fulfillment transactions"
		);

		// No aggregator on Tron; the wallet mines each transaction before
		// sending the next and surfaces the first revert as a failure
		let hashes = match wallet
			.write_contracts(
				calls,
				WriteContractsOptions {
					value: None,
					keep_sender: true,
				},
			)
			.await
		{
			Ok(hashes) => hashes,
			Err(WalletError::TransactionFailed(reason)) => {
				return Ok(ExecutionResult::failure(reason));
			},
			Err(e) => return Err(e.into()),
		};

		let tx_hash = hashes.last().cloned().ok_or_else(|| {
			ExecutorError::Execution("Wallet returned no transaction hash".to_string())
		})?;

		tracing::info!(
			intent_hash = %truncate_id(&intent.intent_hash.to_string()),
			tx_hash = %tx_hash,
			chain_id = destination,
			"Fulfillment confirmed"
		);
		Ok(ExecutionResult::success(tx_hash.to_string()))
	}

	async fn get_balance(
		&self,
		chain_id: &ChainId,
		address: &Address,
	) -> Result<U256, ExecutorError> {
		let chain = Self::numeric(chain_id)?;
		Ok(self.delivery.get_balance(address, chain).await?)
	}

	async fn is_transaction_confirmed(&self, chain_id: &ChainId, tx_hash: &str) -> bool {
		let Ok(chain) = Self::numeric(chain_id) else {
			return false;
		};
		let stripped = tx_hash.strip_prefix("0x").unwrap_or(tx_hash);
		let Ok(bytes) = hex::decode(stripped) else {
			return false;
		};
		// Tron receipts only exist once the transaction is in a block;
		// success reflects the execution result
		match self.delivery.get_receipt(&TransactionHash(bytes), chain).await {
			Ok(Some(receipt)) => receipt.success,
			_ => false,
		}
	}

	async fn execute_batch_withdraw(
		&self,
		chain_id: &ChainId,
		withdrawals: &[WithdrawalRequest],
		wallet_kind: Option<WalletKind>,
	) -> Result<String, ExecutorError> {
		if withdrawals.is_empty() {
			return Err(ExecutorError::Configuration(
				"Empty withdrawal batch".to_string(),
			));
		}
		let chain = Self::numeric(chain_id)?;
		let network = self.network(chain_id)?;
		let wallet = self.wallets.wallet(chain, wallet_kind).await?;

		let hash = wallet
			.write_contract(ContractCall::new(
				network.portal_address.clone(),
				abi::batch_withdraw_calldata(withdrawals)?,
				U256::ZERO,
			))
			.await?;

		tracing::info!(
			chain_id = chain,
			withdrawals = withdrawals.len(),
			tx_hash = %hash,
			"Batch withdraw submitted"
		);
		Ok(with_0x_prefix(&hex::encode(&hash.0)))
	}

	async fn wallet_address(
		&self,
		chain_id: &ChainId,
		wallet_kind: Option<WalletKind>,
	) -> Result<String, ExecutorError> {
		let chain = Self::numeric(chain_id)?;
		let wallet = self.wallets.wallet(chain, wallet_kind).await?;
		Ok(wallet.address().await?.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{MockProverInterface, MockProverResolver, ProverInterface};
	use solver_account::MockAccountInterface;
	use solver_delivery::{DeliveryInterface, MockDeliveryInterface};
	use solver_types::utils::builders::{IntentBuilder, NetworkConfigBuilder};
	use solver_types::{ChainFamily, TransactionReceipt};
	use std::collections::HashMap;
	use std::sync::Mutex;

	const DEST: u64 = 728126428;

	fn networks() -> NetworksConfig {
		let mut networks = NetworksConfig::new();
		networks.insert(
			ChainId::from(DEST),
			NetworkConfigBuilder::new(ChainFamily::Tvm).build(),
		);
		networks.insert(ChainId::from(1u64), NetworkConfigBuilder::evm().build());
		networks
	}

	fn delivery(mock: MockDeliveryInterface) -> Arc<DeliveryService> {
		let mut chains = HashMap::new();
		chains.insert(DEST, ChainFamily::Tvm);
		let mut by_family: HashMap<ChainFamily, Arc<dyn DeliveryInterface>> = HashMap::new();
		by_family.insert(ChainFamily::Tvm, Arc::new(mock));
		Arc::new(DeliveryService::new(chains, by_family, 1, 300))
	}

	fn provers() -> Arc<MockProverResolver> {
		let mut resolver = MockProverResolver::new();
		resolver.expect_prover().returning(|_, _| {
			let mut prover = MockProverInterface::new();
			prover.expect_fee().returning(|_, _| Ok(U256::ZERO));
			prover.expect_generate_proof().returning(|_| Ok(vec![0xAB]));
			prover
				.expect_contract_address()
				.returning(|_| Some(Address(vec![0x44; 20])));
			Some(Arc::new(prover) as Arc<dyn ProverInterface>)
		});
		Arc::new(resolver)
	}

	fn executor(mock: MockDeliveryInterface) -> TvmExecutor {
		let delivery = delivery(mock);
		let mut account = MockAccountInterface::new();
		account
			.expect_address()
			.returning(|| Ok(Address(vec![0x33; 20])));
		let wallets = Arc::new(WalletManager::new(
			networks(),
			Arc::new(account),
			delivery.clone(),
			300,
		));
		TvmExecutor::new(networks(), wallets, delivery, provers())
	}

	#[tokio::test]
	async fn test_sequential_approvals_then_fulfill() {
		let submitted = Arc::new(Mutex::new(Vec::new()));
		let captured = submitted.clone();

		let mut mock = MockDeliveryInterface::new();
		mock.expect_submit().times(2).returning(move |tx| {
			let first = tx.to.as_ref().unwrap().0[0];
			captured.lock().unwrap().push(first);
			Ok(TransactionHash(vec![first; 32]))
		});
		mock.expect_wait_for_confirmation()
			.times(2)
			.returning(|hash, _, _, _| {
				Ok(TransactionReceipt {
					hash: hash.clone(),
					block_number: 7,
					success: true,
				})
			});

		let intent = IntentBuilder::new()
			.destination(DEST)
			.source_chain(1u64)
			.route_token(Address(vec![0xA1; 20]), U256::from(100))
			.build();

		let result = executor(mock).fulfill(&intent, None).await.unwrap();
		assert!(result.success);
		// Approval first, then portal fulfill
		assert_eq!(*submitted.lock().unwrap(), vec![0xA1, 0xF0]);
	}

	#[tokio::test]
	async fn test_sequential_revert_is_structured_failure() {
		let mut mock = MockDeliveryInterface::new();
		mock.expect_submit()
			.times(1)
			.returning(|_| Ok(TransactionHash(vec![0x05; 32])));
		mock.expect_wait_for_confirmation()
			.times(1)
			.returning(|hash, _, _, _| {
				Ok(TransactionReceipt {
					hash: hash.clone(),
					block_number: 7,
					success: false,
				})
			});

		let intent = IntentBuilder::new()
			.destination(DEST)
			.source_chain(1u64)
			.route_token(Address(vec![0xA1; 20]), U256::from(100))
			.build();

		let result = executor(mock).fulfill(&intent, None).await.unwrap();
		assert!(!result.success);
		assert!(result.error.unwrap().contains("reverted"));
	}
}
