//! Portal contract ABI shared by the EVM and TVM executors.
//!
//! Tron contracts are EVM-ABI compatible, so both families encode calls
//! against the same definitions.

use crate::ExecutorError;
use alloy_primitives::{keccak256, Address as AlloyAddress, B256, U256};
use alloy_sol_types::{sol, SolCall, SolValue};
use solver_types::{Address, Intent, WithdrawalRequest};

sol! {
	struct TokenAmount {
		address token;
		uint256 amount;
	}

	struct Call {
		address target;
		bytes data;
		uint256 value;
	}

	struct Route {
		bytes32 salt;
		uint64 deadline;
		address portal;
		TokenAmount[] tokens;
		Call[] calls;
	}

	struct Reward {
		uint64 deadline;
		address creator;
		address prover;
		uint256 nativeValue;
		TokenAmount[] tokens;
	}

	function fulfillAndProve(
		bytes32 intentHash,
		Route route,
		bytes32 rewardHash,
		bytes32 claimant,
		address prover,
		uint64 source,
		bytes data
	) external payable returns (bytes[] memory);

	function batchWithdraw(
		uint64[] destinations,
		bytes32[] routeHashes,
		Reward[] rewards
	) external;

	function approve(address spender, uint256 amount) external returns (bool);
}

fn evm_address(address: &Address, what: &str) -> Result<AlloyAddress, ExecutorError> {
	address.as_evm().ok_or_else(|| {
		ExecutorError::Configuration(format!("{} is not a 20-byte address: {}", what, address))
	})
}

fn token_amounts(tokens: &[solver_types::TokenAmount]) -> Result<Vec<TokenAmount>, ExecutorError> {
	tokens
		.iter()
		.map(|entry| {
			Ok(TokenAmount {
				token: evm_address(&entry.token, "token")?,
				amount: entry.amount,
			})
		})
		.collect()
}

/// Converts an intent route into its on-chain tuple form.
pub fn route_to_abi(route: &solver_types::Route) -> Result<Route, ExecutorError> {
	let calls = route
		.calls
		.iter()
		.map(|call| {
			Ok(Call {
				target: evm_address(&call.target, "call target")?,
				data: call.data.clone().into(),
				value: call.value,
			})
		})
		.collect::<Result<Vec<_>, ExecutorError>>()?;

	Ok(Route {
		salt: route.salt,
		deadline: route.deadline,
		portal: evm_address(&route.portal, "portal")?,
		tokens: token_amounts(&route.tokens)?,
		calls,
	})
}

/// Converts an intent reward into its on-chain tuple form.
pub fn reward_to_abi(reward: &solver_types::Reward) -> Result<Reward, ExecutorError> {
	Ok(Reward {
		deadline: reward.deadline,
		creator: evm_address(&reward.creator, "reward creator")?,
		prover: evm_address(&reward.prover, "reward prover")?,
		nativeValue: reward.native_amount,
		tokens: token_amounts(&reward.tokens)?,
	})
}

/// Keccak hash of the ABI-encoded reward, as the portal computes it.
pub fn reward_hash(reward: &solver_types::Reward) -> Result<B256, ExecutorError> {
	Ok(keccak256(reward_to_abi(reward)?.abi_encode()))
}

/// ERC-20 `approve(portal, amount)` calldata.
pub fn approve_calldata(spender: AlloyAddress, amount: U256) -> Vec<u8> {
	approveCall { spender, amount }.abi_encode()
}

/// `fulfillAndProve` calldata for an intent.
///
/// The claimant address is widened to the portal's bytes32 form.
pub fn fulfill_calldata(
	intent: &Intent,
	claimant: &Address,
	prover_contract: AlloyAddress,
	source: u64,
	proof: Vec<u8>,
) -> Result<Vec<u8>, ExecutorError> {
	let claimant = evm_address(claimant, "claimant")?;

	Ok(fulfillAndProveCall {
		intentHash: intent.intent_hash,
		route: route_to_abi(&intent.route)?,
		rewardHash: reward_hash(&intent.reward)?,
		claimant: B256::left_padding_from(claimant.as_slice()),
		prover: prover_contract,
		source,
		data: proof.into(),
	}
	.abi_encode())
}

/// `batchWithdraw` calldata for a batch of fulfilled intents.
pub fn batch_withdraw_calldata(
	withdrawals: &[WithdrawalRequest],
) -> Result<Vec<u8>, ExecutorError> {
	let mut destinations = Vec::with_capacity(withdrawals.len());
	let mut route_hashes = Vec::with_capacity(withdrawals.len());
	let mut rewards = Vec::with_capacity(withdrawals.len());

	for withdrawal in withdrawals {
		destinations.push(withdrawal.destination.as_u64().ok_or_else(|| {
			ExecutorError::Configuration(format!(
				"Withdrawal destination {} has no numeric id",
				withdrawal.destination
			))
		})?);
		route_hashes.push(withdrawal.route_hash);
		rewards.push(reward_to_abi(&withdrawal.reward)?);
	}

	Ok(batchWithdrawCall {
		destinations,
		routeHashes: route_hashes,
		rewards,
	}
	.abi_encode())
}

#[cfg(test)]
mod tests {
	use super::*;
	use solver_types::utils::builders::IntentBuilder;

	#[test]
	fn test_reward_hash_is_stable() {
		let intent = IntentBuilder::new().build();
		let first = reward_hash(&intent.reward).unwrap();
		let second = reward_hash(&intent.reward).unwrap();
		assert_eq!(first, second);

		let mut changed = intent.reward.clone();
		changed.native_amount += U256::from(1);
		assert_ne!(first, reward_hash(&changed).unwrap());
	}

	#[test]
	fn test_fulfill_calldata_has_selector() {
		let intent = IntentBuilder::new().build();
		let data = fulfill_calldata(
			&intent,
			&Address(vec![0x11; 20]),
			AlloyAddress::from_slice(&[0x22; 20]),
			1,
			vec![0xAB],
		)
		.unwrap();
		assert_eq!(&data[..4], fulfillAndProveCall::SELECTOR.as_slice());

		let decoded = fulfillAndProveCall::abi_decode(&data, true).unwrap();
		assert_eq!(decoded.intentHash, intent.intent_hash);
		assert_eq!(decoded.source, 1);
		assert_eq!(&decoded.claimant[12..], &[0x11; 20]);
	}

	#[test]
	fn test_non_evm_address_rejected() {
		let mut intent = IntentBuilder::new().build();
		intent.route.portal = Address(vec![0x11; 32]);
		assert!(matches!(
			route_to_abi(&intent.route),
			Err(ExecutorError::Configuration(_))
		));
	}
}
