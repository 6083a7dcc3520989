//! Intent data model for cross-chain fulfillment requests.
//!
//! An intent pairs a reward escrowed on a source chain with a route of
//! calls/token transfers to execute on a destination chain. Amounts and
//! hashes serialize in hex string form so job payloads survive transport
//! without precision loss.

use crate::chains::ChainId;
use crate::Address;
use alloy_primitives::{B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A token and the amount of it required or offered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAmount {
	/// Token contract address.
	pub token: Address,
	/// Amount in the token's smallest unit.
	pub amount: U256,
}

/// One abstract call the destination route must perform.
///
/// Entries are mutually exclusive between function calls (non-empty data,
/// zero value) and native transfers (empty data, positive value); mixed
/// entries are rejected upstream before reaching this engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
	/// Call target address.
	pub target: Address,
	/// Calldata for the target.
	#[serde(with = "crate::utils::hex_bytes")]
	pub data: Vec<u8>,
	/// Native value attached to the call.
	pub value: U256,
}

/// The destination-side work of an intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
	/// Uniqueness salt chosen by the intent creator.
	pub salt: B256,
	/// Unix deadline after which the route may no longer be fulfilled.
	pub deadline: u64,
	/// Portal contract/program receiving the fulfillment on the destination.
	pub portal: Address,
	/// Native amount the route requires.
	pub native_amount: U256,
	/// Tokens the route requires on the destination chain.
	pub tokens: Vec<TokenAmount>,
	/// Calls to execute on the destination chain.
	pub calls: Vec<Call>,
}

/// The source-side compensation of an intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
	/// Unix deadline after which the reward can be refunded.
	pub deadline: u64,
	/// Intent creator address on the source chain.
	pub creator: Address,
	/// Prover the creator designated for cross-chain proof verification.
	pub prover: Address,
	/// Native reward amount.
	pub native_amount: U256,
	/// Token rewards.
	pub tokens: Vec<TokenAmount>,
}

/// Immutable value describing one cross-chain fulfillment request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
	/// Unique 32-byte identifier.
	pub intent_hash: B256,
	/// Destination chain identifier.
	pub destination: ChainId,
	/// Chain identifier where the reward is escrowed.
	pub source_chain_id: ChainId,
	/// Destination-side work.
	pub route: Route,
	/// Source-side compensation.
	pub reward: Reward,
}

/// Outcome of one fulfillment attempt.
///
/// Exactly one of `tx_hash`/`error` is populated, according to `success`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
	/// Whether the attempt fulfilled the intent.
	pub success: bool,
	/// Transaction identifier of the successful fulfillment.
	pub tx_hash: Option<String>,
	/// Failure description for unsuccessful attempts.
	pub error: Option<String>,
}

impl ExecutionResult {
	/// Creates a successful result carrying the fulfillment transaction id.
	pub fn success(tx_hash: String) -> Self {
		Self {
			success: true,
			tx_hash: Some(tx_hash),
			error: None,
		}
	}

	/// Creates a failed result carrying the failure description.
	pub fn failure(error: String) -> Self {
		Self {
			success: false,
			tx_hash: None,
			error: Some(error),
		}
	}
}

/// Lifecycle status of an intent as recorded by the intent state store.
///
/// This engine only writes the terminal `Fulfilled`/`Failed` states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentStatus {
	/// Discovered but not yet executed.
	Pending,
	/// Fulfillment confirmed on the destination chain.
	Fulfilled,
	/// Fulfillment failed terminally.
	Failed,
}

impl fmt::Display for IntentStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			IntentStatus::Pending => write!(f, "PENDING"),
			IntentStatus::Fulfilled => write!(f, "FULFILLED"),
			IntentStatus::Failed => write!(f, "FAILED"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::utils::builders::IntentBuilder;

	#[test]
	fn test_intent_serde_round_trip_preserves_large_amounts() {
		// Larger than 2^53, where f64 transport would lose precision
		let amount = U256::from(2u64).pow(U256::from(200u64));
		let intent = IntentBuilder::new()
			.destination(10u64)
			.route_token(Address(vec![0x02; 20]), amount)
			.build();

		let json = serde_json::to_string(&intent).expect("serialize");
		let back: Intent = serde_json::from_str(&json).expect("deserialize");
		assert_eq!(back, intent);
		assert_eq!(back.route.tokens[0].amount, amount);
	}

	#[test]
	fn test_execution_result_population() {
		let ok = ExecutionResult::success("0xabc".to_string());
		assert!(ok.success);
		assert!(ok.tx_hash.is_some() && ok.error.is_none());

		let failed = ExecutionResult::failure("reverted".to_string());
		assert!(!failed.success);
		assert!(failed.tx_hash.is_none() && failed.error.is_some());
	}

	#[test]
	fn test_intent_status_display() {
		assert_eq!(IntentStatus::Fulfilled.to_string(), "FULFILLED");
		assert_eq!(IntentStatus::Failed.to_string(), "FAILED");
	}
}
