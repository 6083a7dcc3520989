//! Execution job types consumed by the scheduler.

use crate::chains::ChainId;
use crate::intent::{Intent, Reward};
use crate::wallet::WalletKind;
use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

/// Unit of work delivered by the inbound job queue.
///
/// Produced by an external collaborator when an intent becomes fulfillable,
/// consumed exactly once per attempt by the scheduler. Serde round-trips
/// preserve 256-bit amounts and chain ids without precision loss.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainExecutionJob {
	/// The intent to fulfill.
	pub intent: Intent,
	/// Execution strategy tag chosen by the producer.
	pub strategy: String,
	/// Destination chain the job is bound to.
	pub destination_chain_id: ChainId,
	/// Wallet kind the executor should use, when the producer cares.
	#[serde(default)]
	pub wallet_kind: Option<WalletKind>,
	/// Attempt counter, starting at 1. Incremented on each retry.
	#[serde(default = "first_attempt")]
	pub attempt: u32,
	/// Transaction hash of the previous attempt, when it got as far as
	/// broadcasting before timing out. Used for the pre-retry idempotency
	/// check against late confirmation.
	#[serde(default)]
	pub last_tx_hash: Option<String>,
}

fn first_attempt() -> u32 {
	1
}

impl ChainExecutionJob {
	/// Creates a first-attempt job for an intent.
	pub fn new(intent: Intent, strategy: impl Into<String>, wallet_kind: Option<WalletKind>) -> Self {
		let destination_chain_id = intent.destination.clone();
		Self {
			intent,
			strategy: strategy.into(),
			destination_chain_id,
			wallet_kind,
			attempt: 1,
			last_tx_hash: None,
		}
	}
}

/// One entry of a batch withdrawal submitted back to a source-chain portal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRequest {
	/// Destination chain the intent was fulfilled on.
	pub destination: ChainId,
	/// Route hash identifying the intent's route.
	pub route_hash: B256,
	/// The reward being withdrawn.
	pub reward: Reward,
}
