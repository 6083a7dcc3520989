//! ERC-7579 execution-mode and payload encoding.
//!
//! A mode is a packed 32-byte value describing how a smart account should
//! run a batch: call type, error handling, and a free-form context. The
//! payload carries the calls themselves, packed for a single call and
//! ABI-encoded for a batch.

use crate::ContractCall;
use alloy_primitives::{FixedBytes, B256, U256};
use alloy_sol_types::{sol, SolValue};

sol! {
	/// ERC-7579 batch execution entry.
	#[derive(Debug, PartialEq)]
	struct Execution {
		address target;
		uint256 value;
		bytes callData;
	}
}

/// How the account iterates the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallType {
	/// One packed call.
	Single,
	/// ABI-encoded array of calls.
	Batch,
}

impl CallType {
	fn byte(self) -> u8 {
		match self {
			CallType::Single => 0x00,
			CallType::Batch => 0x01,
		}
	}
}

/// Execution mode, packed into 32 bytes by [`encode_mode`].
///
/// Layout: byte 0 call type, byte 1 revert flag, bytes 2..6 reserved,
/// bytes 6..10 mode selector, bytes 10..32 context.
#[derive(Debug, Clone, Copy)]
pub struct ExecMode {
	pub call_type: CallType,
	pub revert_on_error: bool,
	pub selector: [u8; 4],
	pub context: [u8; 22],
}

impl ExecMode {
	/// Default mode for a batch of `count` calls: batch iteration above one
	/// call, revert on the first failing call.
	pub fn for_calls(count: usize) -> Self {
		Self {
			call_type: if count > 1 {
				CallType::Batch
			} else {
				CallType::Single
			},
			revert_on_error: true,
			selector: [0u8; 4],
			context: [0u8; 22],
		}
	}
}

/// Packs an execution mode into its 32-byte wire form.
pub fn encode_mode(mode: &ExecMode) -> B256 {
	let mut out = [0u8; 32];
	out[0] = mode.call_type.byte();
	out[1] = if mode.revert_on_error { 0x01 } else { 0x00 };
	// bytes 2..6 reserved zero
	out[6..10].copy_from_slice(&mode.selector);
	out[10..32].copy_from_slice(&mode.context);
	B256::from(out)
}

/// Encodes a single call as `target ‖ value(32-byte BE) ‖ data`.
pub fn encode_single(call: &ContractCall) -> Vec<u8> {
	let mut out = Vec::with_capacity(20 + 32 + call.data.len());
	out.extend_from_slice(&call.target.0);
	out.extend_from_slice(&call.value.to_be_bytes::<32>());
	out.extend_from_slice(&call.data);
	out
}

/// Encodes a batch as an ABI-encoded `(address,uint256,bytes)[]`.
pub fn encode_batch(calls: &[ContractCall]) -> Vec<u8> {
	let executions: Vec<Execution> = calls
		.iter()
		.map(|call| Execution {
			target: alloy_primitives::Address::from_slice(&call.target.0),
			value: call.value,
			callData: call.data.clone().into(),
		})
		.collect();
	executions.abi_encode()
}

/// Encodes the payload matching a mode's call type.
pub fn encode_payload(mode: &ExecMode, calls: &[ContractCall]) -> Vec<u8> {
	match mode.call_type {
		CallType::Single => encode_single(&calls[0]),
		CallType::Batch => encode_batch(calls),
	}
}

/// Fixed-bytes form used in ABI positions.
pub type Mode = FixedBytes<32>;
