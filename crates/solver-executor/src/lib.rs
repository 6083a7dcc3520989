//! Chain executors for the intent execution engine.
//!
//! An executor knows how to land an intent fulfillment on one chain family.
//! The registry binds configured chains to their family's executor and is
//! the single entry point the scheduler dispatches through. Collaborator
//! contracts (prover service, intent state store) live here as traits so
//! executors stay testable against mocks.

use alloy_primitives::{B256, U256};
use async_trait::async_trait;
use solver_types::{
	Address, ChainId, ExecutionResult, Intent, IntentStatus, WalletKind, WithdrawalRequest,
};
use std::sync::Arc;
use thiserror::Error;

pub mod abi;
pub mod registry;
pub mod state;

/// Re-export implementations
pub mod implementations {
	pub mod evm;
	pub mod svm;
	pub mod tvm;
}

pub use registry::ExecutorRegistry;

/// Errors that can occur during intent execution.
#[derive(Debug, Error)]
pub enum ExecutorError {
	/// No executor is bound to the requested chain.
	#[error("Unsupported chain: {0}")]
	UnsupportedChain(String),
	/// The intent references a prover unknown to the prover service.
	#[error("No prover {prover} registered for source chain {source_chain}")]
	ProverNotFound {
		source_chain: ChainId,
		prover: String,
	},
	/// Missing or inconsistent configuration for the job. Fatal, not retried.
	#[error("Executor configuration error: {0}")]
	Configuration(String),
	/// The fulfillment transaction was mined but reverted.
	#[error("Execution failed: {0}")]
	Execution(String),
	/// Confirmation wait timed out after the transaction was broadcast.
	///
	/// Carries the broadcast hash so the retry layer can check for late
	/// confirmation before resubmitting.
	#[error("Confirmation timed out for tx {tx_hash}: {message}")]
	ConfirmationTimeout { tx_hash: String, message: String },
	/// Network or RPC failure. Retry-eligible.
	#[error("Network error: {0}")]
	Network(String),
	/// Error propagated from the wallet layer.
	#[error("Wallet error: {0}")]
	Wallet(#[from] solver_wallet::WalletError),
	/// Error propagated from the delivery layer.
	#[error("Delivery error: {0}")]
	Delivery(#[from] solver_delivery::DeliveryError),
	/// Failure updating the intent state store.
	#[error("State store error: {0}")]
	State(String),
}

/// Trait defining the interface for chain executors.
///
/// One implementation exists per chain family; a single instance serves all
/// configured chains of that family.
#[async_trait]
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait ExecutorInterface: Send + Sync {
	/// Executes an intent fulfillment on its destination chain.
	///
	/// Returns a structured failure for on-chain reverts; genuine
	/// submission or network failures are errors.
	async fn fulfill(
		&self,
		intent: &Intent,
		wallet_kind: Option<WalletKind>,
	) -> Result<ExecutionResult, ExecutorError>;

	/// Native balance of an address on a chain, used by funding checks.
	async fn get_balance(
		&self,
		chain_id: &ChainId,
		address: &Address,
	) -> Result<U256, ExecutorError>;

	/// Whether a transaction is known-confirmed and successful.
	///
	/// Lookup errors count as not confirmed.
	async fn is_transaction_confirmed(&self, chain_id: &ChainId, tx_hash: &str) -> bool;

	/// Withdraws escrowed rewards for a batch of fulfilled intents.
	async fn execute_batch_withdraw(
		&self,
		chain_id: &ChainId,
		withdrawals: &[WithdrawalRequest],
		wallet_kind: Option<WalletKind>,
	) -> Result<String, ExecutorError>;

	/// Address the executor fulfills from on a chain.
	async fn wallet_address(
		&self,
		chain_id: &ChainId,
		wallet_kind: Option<WalletKind>,
	) -> Result<String, ExecutorError>;
}

/// Prover collaborator bound to one prover contract deployment.
#[async_trait]
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait ProverInterface: Send + Sync {
	/// Fee the prover charges for proving this fulfillment.
	async fn fee(&self, intent: &Intent, claimant: &Address) -> Result<U256, ExecutorError>;

	/// Proof payload passed through to the portal.
	async fn generate_proof(&self, intent: &Intent) -> Result<Vec<u8>, ExecutorError>;

	/// The prover's contract address on a destination chain, if deployed.
	fn contract_address(&self, destination: &ChainId) -> Option<Address>;
}

/// Resolves provers by the address an intent's reward names.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait ProverResolver: Send + Sync {
	fn prover(
		&self,
		source_chain_id: &ChainId,
		prover_address: &Address,
	) -> Option<Arc<dyn ProverInterface>>;
}

/// External intent state store.
///
/// `update_status` is called exactly once per terminal outcome of
/// `execute_intent`.
#[async_trait]
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait IntentStateInterface: Send + Sync {
	async fn update_status(
		&self,
		intent_hash: &B256,
		status: IntentStatus,
	) -> Result<(), ExecutorError>;
}
