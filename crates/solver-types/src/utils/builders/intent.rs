//! Builder for intent test fixtures.

use crate::chains::ChainId;
use crate::intent::{Call, Intent, Reward, Route, TokenAmount};
use crate::Address;
use alloy_primitives::{B256, U256};

/// Builds an [`Intent`] with sensible defaults for tests.
#[derive(Debug, Clone)]
pub struct IntentBuilder {
	intent_hash: B256,
	destination: ChainId,
	source_chain_id: ChainId,
	route: Route,
	reward: Reward,
}

impl IntentBuilder {
	pub fn new() -> Self {
		Self {
			intent_hash: B256::repeat_byte(0x11),
			destination: ChainId::Numeric(10),
			source_chain_id: ChainId::Numeric(1),
			route: Route {
				salt: B256::repeat_byte(0x22),
				deadline: 1_900_000_000,
				portal: Address(vec![0xF0; 20]),
				native_amount: U256::ZERO,
				tokens: vec![],
				calls: vec![],
			},
			reward: Reward {
				deadline: 1_900_000_000,
				creator: Address(vec![0x01; 20]),
				prover: Address(vec![0x02; 20]),
				native_amount: U256::ZERO,
				tokens: vec![],
			},
		}
	}

	pub fn intent_hash(mut self, hash: B256) -> Self {
		self.intent_hash = hash;
		self
	}

	pub fn destination(mut self, destination: impl Into<ChainIdArg>) -> Self {
		self.destination = destination.into().0;
		self
	}

	pub fn source_chain(mut self, source: impl Into<ChainIdArg>) -> Self {
		self.source_chain_id = source.into().0;
		self
	}

	pub fn portal(mut self, portal: Address) -> Self {
		self.route.portal = portal;
		self
	}

	pub fn prover(mut self, prover: Address) -> Self {
		self.reward.prover = prover;
		self
	}

	pub fn route_token(mut self, token: Address, amount: U256) -> Self {
		self.route.tokens.push(TokenAmount { token, amount });
		self
	}

	pub fn route_call(mut self, target: Address, data: Vec<u8>, value: U256) -> Self {
		self.route.calls.push(Call {
			target,
			data,
			value,
		});
		self
	}

	pub fn build(self) -> Intent {
		Intent {
			intent_hash: self.intent_hash,
			destination: self.destination,
			source_chain_id: self.source_chain_id,
			route: self.route,
			reward: self.reward,
		}
	}
}

impl Default for IntentBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// Accepts both numeric and string chain identifiers in builder methods.
pub struct ChainIdArg(ChainId);

impl From<u64> for ChainIdArg {
	fn from(id: u64) -> Self {
		ChainIdArg(ChainId::Numeric(id))
	}
}

impl From<&str> for ChainIdArg {
	fn from(s: &str) -> Self {
		ChainIdArg(s.parse().expect("ChainId::from_str is infallible"))
	}
}
