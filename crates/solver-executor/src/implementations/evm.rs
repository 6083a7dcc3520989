//! Intent executor for EVM-family chains.
//!
//! Fulfillment is one batched wallet submission: ERC-20 approvals for every
//! route token followed by the portal `fulfillAndProve` call. The wallet
//! layer decides whether that batch lands via the multicall aggregator or a
//! kernel account.

use crate::{abi, ExecutorError, ExecutorInterface, ProverResolver};
use alloy_primitives::U256;
use async_trait::async_trait;
use solver_delivery::{DeliveryError, DeliveryService};
use solver_types::{
	truncate_id, with_0x_prefix, Address, ChainId, ExecutionResult, Intent, NetworkConfig,
	NetworksConfig, TransactionHash, WalletKind, WithdrawalRequest,
};
use solver_wallet::{ContractCall, WalletManager, WriteContractsOptions};
use std::sync::Arc;

pub struct EvmExecutor {
	networks: NetworksConfig,
	wallets: Arc<WalletManager>,
	delivery: Arc<DeliveryService>,
	provers: Arc<dyn ProverResolver>,
}

impl EvmExecutor {
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

	/// Claimant for the reward on the source chain: the configured claimant
	/// address if present, otherwise the executing wallet itself.
	async fn claimant(
		&self,
		source: &ChainId,
		wallet: &Arc<dyn solver_wallet::WalletInterface>,
	) -> Result<Address, ExecutorError> {
		if let Ok(network) = self.network(source) {
			if let Some(claimant) = &network.claimant_address {
				return Ok(claimant.clone());
			}
		}
		Ok(wallet.address().await?)
	}

	fn parse_tx_hash(tx_hash: &str) -> Result<TransactionHash, ExecutorError> {
		let stripped = tx_hash.strip_prefix("0x").unwrap_or(tx_hash);
		hex::decode(stripped)
			.map(TransactionHash)
			.map_err(|e| ExecutorError::Configuration(format!("Invalid tx hash: {}", e)))
	}
}

#[async_trait]
impl ExecutorInterface for EvmExecutor {
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
		let claimant = self.claimant(&intent.source_chain_id, &wallet).await?;

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

		tracing::debug!(
			intent_hash = %truncate_id(&intent.intent_hash.to_string()),
			chain_id = destination,
			approvals = intent.route.tokens.len(),
			prover_fee = %prover_fee,
			"Preparing fulfillment batch"
		);

		// One approval per route token, then the fulfill call, all in one
		// wallet batch
		let mut calls: Vec<ContractCall> = intent
			.route
			.tokens
			.iter()
			.map(|entry| {
				Ok(ContractCall::new(
					entry.token.clone(),
					abi::approve_calldata(portal, entry.amount),
					U256::ZERO,
				))
			})
			.collect::<Result<_, ExecutorError>>()?;
		calls.push(ContractCall::new(
			network.portal_address.clone(),
			abi::fulfill_calldata(intent, &claimant, prover_contract, source, proof)?,
			prover_fee,
		));

		// The signer sends no ETH itself; the prover fee is paid out of the
		// executing wallet's balance
		let hashes = wallet
			.write_contracts(
				calls,
				WriteContractsOptions {
					value: Some(U256::ZERO),
					keep_sender: false,
				},
			)
			.await?;
		let tx_hash = hashes.last().cloned().ok_or_else(|| {
			ExecutorError::Execution("Wallet returned no transaction hash".to_string())
		})?;

		tracing::info!(
			intent_hash = %truncate_id(&intent.intent_hash.to_string()),
			tx_hash = %tx_hash,
			chain_id = destination,
			"Fulfillment submitted, awaiting confirmation"
		);

		let receipt = match self
			.delivery
			.wait_for_confirmation(&tx_hash, destination, network.min_confirmations)
			.await
		{
			Ok(receipt) => receipt,
			Err(DeliveryError::ConfirmationTimeout(message)) => {
				return Err(ExecutorError::ConfirmationTimeout {
					tx_hash: tx_hash.to_string(),
					message,
				});
			},
			Err(e) => return Err(e.into()),
		};

		if !receipt.success {
			return Ok(ExecutionResult::failure(
				"Fulfillment transaction reverted".to_string(),
			));
		}
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
		let Ok(hash) = Self::parse_tx_hash(tx_hash) else {
			return false;
		};
		match self.delivery.get_receipt(&hash, chain).await {
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
	use alloy_sol_types::SolCall;
	use solver_account::MockAccountInterface;
	use solver_delivery::{DeliveryInterface, MockDeliveryInterface};
	use solver_types::utils::builders::{IntentBuilder, NetworkConfigBuilder};
	use solver_types::{ChainFamily, Signature, TransactionReceipt};
	use solver_wallet::implementations::basic::aggregate3ValueCall;
	use std::collections::HashMap;
	use std::sync::Mutex;

	const DEST: u64 = 10;

	fn networks() -> NetworksConfig {
		let mut networks = NetworksConfig::new();
		networks.insert(ChainId::from(DEST), NetworkConfigBuilder::evm().build());
		networks.insert(ChainId::from(1u64), NetworkConfigBuilder::evm().build());
		networks
	}

	fn delivery(mock: MockDeliveryInterface) -> Arc<DeliveryService> {
		let mut chains = HashMap::new();
		chains.insert(DEST, ChainFamily::Evm);
		chains.insert(1u64, ChainFamily::Evm);
		let mut by_family: HashMap<ChainFamily, Arc<dyn DeliveryInterface>> = HashMap::new();
		by_family.insert(ChainFamily::Evm, Arc::new(mock));
		Arc::new(DeliveryService::new(chains, by_family, 2, 300))
	}

	fn account() -> Arc<MockAccountInterface> {
		let mut account = MockAccountInterface::new();
		account
			.expect_address()
			.returning(|| Ok(Address(vec![0x33; 20])));
		account
			.expect_sign_hash()
			.returning(|_| Ok(Signature(vec![0x77; 65])));
		Arc::new(account)
	}

	fn provers() -> Arc<MockProverResolver> {
		let mut resolver = MockProverResolver::new();
		resolver.expect_prover().returning(|_, _| {
			let mut prover = MockProverInterface::new();
			prover.expect_fee().returning(|_, _| Ok(U256::from(42)));
			prover
				.expect_generate_proof()
				.returning(|_| Ok(vec![0xAB, 0xCD]));
			prover
				.expect_contract_address()
				.returning(|_| Some(Address(vec![0x44; 20])));
			Some(Arc::new(prover) as Arc<dyn ProverInterface>)
		});
		Arc::new(resolver)
	}

	fn executor(mock: MockDeliveryInterface) -> EvmExecutor {
		let delivery = delivery(mock);
		let wallets = Arc::new(WalletManager::new(networks(), account(), delivery.clone(), 300));
		EvmExecutor::new(networks(), wallets, delivery, provers())
	}

	fn two_token_intent() -> Intent {
		IntentBuilder::new()
			.destination(DEST)
			.source_chain(1u64)
			.portal(Address(vec![0xF0; 20]))
			.route_token(Address(vec![0xA1; 20]), U256::from(100))
			.route_token(Address(vec![0xA2; 20]), U256::from(200))
			.build()
	}

	#[tokio::test]
	async fn test_two_tokens_one_aggregated_transaction() {
		let submitted = Arc::new(Mutex::new(Vec::new()));
		let captured = submitted.clone();

		let mut mock = MockDeliveryInterface::new();
		mock.expect_submit().times(1).returning(move |tx| {
			captured.lock().unwrap().push(tx);
			Ok(TransactionHash(vec![0x09; 32]))
		});
		mock.expect_wait_for_confirmation()
			.times(1)
			.returning(|hash, _, _, _| {
				Ok(TransactionReceipt {
					hash: hash.clone(),
					block_number: 100,
					success: true,
				})
			});

		let result = executor(mock).fulfill(&two_token_intent(), None).await.unwrap();
		assert!(result.success);
		assert!(result.tx_hash.is_some());

		// 2 approvals + 1 fulfill aggregated into one multicall submission
		let submitted = submitted.lock().unwrap();
		let tx = &submitted[0];
		let batch = aggregate3ValueCall::abi_decode(&tx.data, true).unwrap();
		assert_eq!(batch.calls.len(), 3);
		assert_eq!(batch.calls[0].target.as_slice(), &[0xA1; 20]);
		assert_eq!(batch.calls[1].target.as_slice(), &[0xA2; 20]);
		assert_eq!(batch.calls[2].target.as_slice(), &[0xF0; 20]);
		// Fulfill call carries the prover fee; the outer tx sends none
		assert_eq!(batch.calls[2].value, U256::from(42));
		assert_eq!(tx.value, U256::ZERO);
		assert_eq!(
			&batch.calls[2].callData[..4],
			abi::fulfillAndProveCall::SELECTOR.as_slice()
		);
	}

	#[tokio::test]
	async fn test_revert_is_structured_failure() {
		let mut mock = MockDeliveryInterface::new();
		mock.expect_submit()
			.times(1)
			.returning(|_| Ok(TransactionHash(vec![0x09; 32])));
		mock.expect_wait_for_confirmation()
			.times(1)
			.returning(|hash, _, _, _| {
				Ok(TransactionReceipt {
					hash: hash.clone(),
					block_number: 100,
					success: false,
				})
			});

		let result = executor(mock).fulfill(&two_token_intent(), None).await.unwrap();
		assert!(!result.success);
		assert!(result.error.unwrap().contains("reverted"));
	}

	#[tokio::test]
	async fn test_confirmation_timeout_carries_tx_hash() {
		let mut mock = MockDeliveryInterface::new();
		mock.expect_submit()
			.times(1)
			.returning(|_| Ok(TransactionHash(vec![0x09; 32])));
		mock.expect_wait_for_confirmation().times(1).returning(|_, _, _, _| {
			Err(DeliveryError::ConfirmationTimeout("300s elapsed".to_string()))
		});

		let err = executor(mock)
			.fulfill(&two_token_intent(), None)
			.await
			.expect_err("must fail");
		match err {
			ExecutorError::ConfirmationTimeout { tx_hash, .. } => {
				assert!(tx_hash.contains("0909"));
			},
			other => panic!("unexpected error: {other}"),
		}
	}

	#[tokio::test]
	async fn test_missing_prover_is_prover_not_found() {
		let mock = MockDeliveryInterface::new();
		let delivery = delivery(mock);
		let wallets = Arc::new(WalletManager::new(networks(), account(), delivery.clone(), 300));
		let mut resolver = MockProverResolver::new();
		resolver.expect_prover().returning(|_, _| None);
		let executor = EvmExecutor::new(networks(), wallets, delivery, Arc::new(resolver));

		let err = executor
			.fulfill(&two_token_intent(), None)
			.await
			.expect_err("must fail");
		assert!(matches!(err, ExecutorError::ProverNotFound { .. }));
	}

	#[tokio::test]
	async fn test_is_transaction_confirmed() {
		let mut mock = MockDeliveryInterface::new();
		mock.expect_get_receipt().times(2).returning(|hash, _| {
			if hash.0[0] == 0x01 {
				Ok(Some(TransactionReceipt {
					hash: hash.clone(),
					block_number: 5,
					success: true,
				}))
			} else {
				Ok(None)
			}
		});
		let executor = executor(mock);

		let confirmed = format!("0x{}", hex::encode([0x01; 32]));
		let pending = format!("0x{}", hex::encode([0x02; 32]));
		assert!(executor.is_transaction_confirmed(&ChainId::from(DEST), &confirmed).await);
		assert!(!executor.is_transaction_confirmed(&ChainId::from(DEST), &pending).await);
	}

	#[tokio::test]
	async fn test_batch_withdraw_targets_portal() {
		let submitted = Arc::new(Mutex::new(Vec::new()));
		let captured = submitted.clone();

		let mut mock = MockDeliveryInterface::new();
		mock.expect_submit().times(1).returning(move |tx| {
			captured.lock().unwrap().push(tx);
			Ok(TransactionHash(vec![0x0A; 32]))
		});
		let executor = executor(mock);

		let intent = two_token_intent();
		let withdrawal = WithdrawalRequest {
			destination: ChainId::from(DEST),
			route_hash: intent.intent_hash,
			reward: intent.reward,
		};
		let tx_hash = executor
			.execute_batch_withdraw(&ChainId::from(1u64), &[withdrawal], None)
			.await
			.unwrap();
		assert!(tx_hash.starts_with("0x"));

		let submitted = submitted.lock().unwrap();
		let tx = &submitted[0];
		assert_eq!(tx.to.as_ref().unwrap().0, vec![0xF0; 20]);
		let decoded = abi::batchWithdrawCall::abi_decode(&tx.data, true).unwrap();
		assert_eq!(decoded.destinations, vec![DEST]);
	}
}
