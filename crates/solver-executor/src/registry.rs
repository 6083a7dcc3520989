//! Executor registry and dispatch.
//!
//! Binds every configured chain to its family's executor and wraps
//! `fulfill` with the terminal status bookkeeping the retry layer relies on.

use crate::{ExecutorError, ExecutorInterface, IntentStateInterface};
use alloy_primitives::U256;
use solver_types::{
	truncate_id, Address, ChainFamily, ChainId, ExecutionResult, Intent, IntentStatus,
	NetworksConfig, WalletKind, WithdrawalRequest,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Routes intent execution to per-family chain executors.
pub struct ExecutorRegistry {
	/// Executor per chain, keyed by the chain's normalized key.
	executors: HashMap<String, Arc<dyn ExecutorInterface>>,
	state: Arc<dyn IntentStateInterface>,
}

impl ExecutorRegistry {
	/// Builds the registry from the configured networks.
	///
	/// A chain whose family has no executor is logged and skipped; the
	/// remaining chains still dispatch. This lets a deployment run with a
	/// subset of families enabled.
	pub fn register_all(
		networks: &NetworksConfig,
		executors_by_family: HashMap<ChainFamily, Arc<dyn ExecutorInterface>>,
		state: Arc<dyn IntentStateInterface>,
	) -> Self {
		let mut executors = HashMap::new();
		for (chain_id, network) in networks {
			match executors_by_family.get(&network.family) {
				Some(executor) => {
					executors.insert(chain_id.key(), executor.clone());
				},
				None => {
					tracing::warn!(
						chain_id = %chain_id,
						family = %network.family,
						"No executor for chain family, skipping chain"
					);
				},
			}
		}
		Self { executors, state }
	}

	/// Whether a chain has a bound executor.
	///
	/// Honors numeric equivalence: `10`, `"10"` and big-integer text forms
	/// of the same number match the same binding.
	pub fn is_chain_supported(&self, chain_id: &ChainId) -> bool {
		self.executors.contains_key(&chain_id.key())
	}

	/// Normalized keys of all bound chains.
	pub fn supported_chains(&self) -> Vec<String> {
		self.executors.keys().cloned().collect()
	}

	/// The executor bound to a chain.
	pub fn executor_for_chain(
		&self,
		chain_id: &ChainId,
	) -> Result<&Arc<dyn ExecutorInterface>, ExecutorError> {
		self.executors
			.get(&chain_id.key())
			.ok_or_else(|| ExecutorError::UnsupportedChain(chain_id.to_string()))
	}

	/// Executes an intent and records its terminal status exactly once.
	///
	/// Structured on-chain failures and thrown errors both record `FAILED`
	/// and surface as errors so the retry layer observes them.
	pub async fn execute_intent(
		&self,
		intent: &Intent,
		wallet_kind: Option<WalletKind>,
	) -> Result<ExecutionResult, ExecutorError> {
		let executor = self.executor_for_chain(&intent.destination)?;

		tracing::info!(
			intent_hash = %truncate_id(&intent.intent_hash.to_string()),
			destination = %intent.destination,
			wallet_kind = ?wallet_kind,
			"Executing intent"
		);

		match executor.fulfill(intent, wallet_kind).await {
			Ok(result) if result.success => {
				self.state
					.update_status(&intent.intent_hash, IntentStatus::Fulfilled)
					.await?;
				Ok(result)
			},
			Ok(result) => {
				let reason = result
					.error
					.clone()
					.unwrap_or_else(|| "execution failed".to_string());
				tracing::warn!(
					intent_hash = %truncate_id(&intent.intent_hash.to_string()),
					error = %reason,
					"Intent execution failed on-chain"
				);
				self.state
					.update_status(&intent.intent_hash, IntentStatus::Failed)
					.await?;
				Err(ExecutorError::Execution(reason))
			},
			Err(e) => {
				tracing::error!(
					intent_hash = %truncate_id(&intent.intent_hash.to_string()),
					error = %e,
					"Intent execution errored"
				);
				self.state
					.update_status(&intent.intent_hash, IntentStatus::Failed)
					.await?;
				Err(e)
			},
		}
	}

	/// Native balance on a chain, via its bound executor.
	pub async fn get_balance(
		&self,
		chain_id: &ChainId,
		address: &Address,
	) -> Result<U256, ExecutorError> {
		self.executor_for_chain(chain_id)?
			.get_balance(chain_id, address)
			.await
	}

	/// Whether a transaction confirmed successfully on a chain.
	pub async fn is_transaction_confirmed(&self, chain_id: &ChainId, tx_hash: &str) -> bool {
		match self.executor_for_chain(chain_id) {
			Ok(executor) => executor.is_transaction_confirmed(chain_id, tx_hash).await,
			Err(_) => false,
		}
	}

	/// Withdraws escrowed rewards on a chain, via its bound executor.
	pub async fn execute_batch_withdraw(
		&self,
		chain_id: &ChainId,
		withdrawals: &[WithdrawalRequest],
		wallet_kind: Option<WalletKind>,
	) -> Result<String, ExecutorError> {
		self.executor_for_chain(chain_id)?
			.execute_batch_withdraw(chain_id, withdrawals, wallet_kind)
			.await
	}

	/// The fulfillment address on a chain, via its bound executor.
	pub async fn wallet_address(
		&self,
		chain_id: &ChainId,
		wallet_kind: Option<WalletKind>,
	) -> Result<String, ExecutorError> {
		self.executor_for_chain(chain_id)?
			.wallet_address(chain_id, wallet_kind)
			.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::state::InMemoryIntentState;
	use crate::MockExecutorInterface;
	use solver_types::utils::builders::{IntentBuilder, NetworkConfigBuilder};

	fn networks() -> NetworksConfig {
		let mut networks = NetworksConfig::new();
		networks.insert(ChainId::from(10u64), NetworkConfigBuilder::evm().build());
		networks.insert(
			ChainId::Named("solana-mainnet".to_string()),
			NetworkConfigBuilder::new(ChainFamily::Svm).build(),
		);
		networks.insert(
			ChainId::from(728126428u64),
			NetworkConfigBuilder::new(ChainFamily::Tvm).build(),
		);
		networks
	}

	fn registry_with(
		evm: MockExecutorInterface,
		svm: Option<MockExecutorInterface>,
	) -> (ExecutorRegistry, Arc<InMemoryIntentState>) {
		let state = Arc::new(InMemoryIntentState::new());
		let mut by_family: HashMap<ChainFamily, Arc<dyn ExecutorInterface>> = HashMap::new();
		by_family.insert(ChainFamily::Evm, Arc::new(evm));
		if let Some(svm) = svm {
			by_family.insert(ChainFamily::Svm, Arc::new(svm));
		}
		// TVM family deliberately left without an executor
		let registry = ExecutorRegistry::register_all(&networks(), by_family, state.clone());
		(registry, state)
	}

	#[tokio::test]
	async fn test_dispatch_routes_by_family() {
		let mut evm = MockExecutorInterface::new();
		evm.expect_fulfill()
			.times(1)
			.returning(|_, _| Ok(ExecutionResult::success("0xabc".to_string())));
		let mut svm = MockExecutorInterface::new();
		svm.expect_fulfill().times(0);
		let (registry, _) = registry_with(evm, Some(svm));

		let intent = IntentBuilder::new().destination(10u64).build();
		registry.execute_intent(&intent, None).await.unwrap();
	}

	#[tokio::test]
	async fn test_missing_family_chain_is_skipped() {
		let (registry, _) = registry_with(MockExecutorInterface::new(), None);

		assert!(registry.is_chain_supported(&ChainId::from(10u64)));
		assert!(!registry.is_chain_supported(&ChainId::from(728126428u64)));
		assert!(!registry.is_chain_supported(&ChainId::Named("solana-mainnet".to_string())));
	}

	#[tokio::test]
	async fn test_numeric_equivalence() {
		let (registry, _) = registry_with(MockExecutorInterface::new(), None);

		// String form of the same number matches the numeric binding
		assert!(registry.is_chain_supported(&"10".parse().unwrap()));
		assert!(!registry.is_chain_supported(&"11".parse().unwrap()));
	}

	#[tokio::test]
	async fn test_unknown_chain_is_unsupported() {
		let (registry, _) = registry_with(MockExecutorInterface::new(), None);

		let intent = IntentBuilder::new().destination(999u64).build();
		let err = registry
			.execute_intent(&intent, None)
			.await
			.expect_err("must fail");
		assert!(matches!(err, ExecutorError::UnsupportedChain(_)));
	}

	#[tokio::test]
	async fn test_success_records_fulfilled() {
		let mut evm = MockExecutorInterface::new();
		evm.expect_fulfill()
			.returning(|_, _| Ok(ExecutionResult::success("0xabc".to_string())));
		let (registry, state) = registry_with(evm, None);

		let intent = IntentBuilder::new().destination(10u64).build();
		let result = registry.execute_intent(&intent, None).await.unwrap();
		assert!(result.success);
		assert_eq!(
			state.status(&intent.intent_hash),
			Some(IntentStatus::Fulfilled)
		);
	}

	#[tokio::test]
	async fn test_structured_failure_records_failed_and_raises() {
		let mut evm = MockExecutorInterface::new();
		evm.expect_fulfill().returning(|_, _| {
			Ok(ExecutionResult::failure(
				"Fulfillment transaction reverted.".to_string(),
			))
		});
		let (registry, state) = registry_with(evm, None);

		let intent = IntentBuilder::new().destination(10u64).build();
		let err = registry
			.execute_intent(&intent, None)
			.await
			.expect_err("must fail");
		assert!(matches!(err, ExecutorError::Execution(_)));
		assert!(err.to_string().contains("reverted"));
		assert_eq!(state.status(&intent.intent_hash), Some(IntentStatus::Failed));
	}

	#[tokio::test]
	async fn test_thrown_error_records_failed_and_reraises() {
		let mut evm = MockExecutorInterface::new();
		evm.expect_fulfill()
			.returning(|_, _| Err(ExecutorError::Network("rpc down".to_string())));
		let (registry, state) = registry_with(evm, None);

		let intent = IntentBuilder::new().destination(10u64).build();
		let err = registry
			.execute_intent(&intent, None)
			.await
			.expect_err("must fail");
		assert!(matches!(err, ExecutorError::Network(_)));
		assert_eq!(state.status(&intent.intent_hash), Some(IntentStatus::Failed));
	}
}
