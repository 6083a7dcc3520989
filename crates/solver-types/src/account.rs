//! Account-related types for the solver system.
//!
//! This module defines types for blockchain addresses, signatures, and transactions
//! that are used throughout the solver for account management and transaction processing.

use crate::with_0x_prefix;
use alloy_primitives::{PrimitiveSignature, U256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Blockchain address representation.
///
/// Stores addresses as raw bytes to support the different formats of the
/// supported chain families: 20 bytes for EVM and TVM, 32 bytes for SVM.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(pub Vec<u8>);

impl Address {
	/// Interprets the address as a 20-byte EVM address.
	///
	/// Returns None when the underlying bytes are not 20 bytes long.
	pub fn as_evm(&self) -> Option<alloy_primitives::Address> {
		if self.0.len() == 20 {
			let mut bytes = [0u8; 20];
			bytes.copy_from_slice(&self.0);
			Some(alloy_primitives::Address::from(bytes))
		} else {
			None
		}
	}
}

impl From<alloy_primitives::Address> for Address {
	fn from(addr: alloy_primitives::Address) -> Self {
		Address(addr.as_slice().to_vec())
	}
}

/// Custom serialization for Address - serializes as hex string
impl Serialize for Address {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&with_0x_prefix(&hex::encode(&self.0)))
	}
}

/// Custom deserialization for Address - accepts hex strings
impl<'de> Deserialize<'de> for Address {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		let hex_str = s.trim_start_matches("0x");
		let bytes = hex::decode(hex_str)
			.map_err(|e| serde::de::Error::custom(format!("Invalid hex address: {}", e)))?;

		// 20 bytes for EVM/TVM addresses, 32 for SVM program/account keys
		if bytes.len() != 20 && bytes.len() != 32 {
			return Err(serde::de::Error::custom(format!(
				"Invalid address length: expected 20 or 32 bytes, got {}",
				bytes.len()
			)));
		}

		Ok(Address(bytes))
	}
}

impl fmt::Display for Address {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "0x{}", hex::encode(&self.0))
	}
}

/// Cryptographic signature representation.
///
/// Stores signatures as raw bytes in the standard Ethereum format (r, s, v).
#[derive(Debug, Clone)]
pub struct Signature(pub Vec<u8>);

impl From<PrimitiveSignature> for Signature {
	fn from(sig: PrimitiveSignature) -> Self {
		// Standard Ethereum signature layout: r || s || v
		let mut bytes = Vec::with_capacity(65);
		bytes.extend_from_slice(&sig.r().to_be_bytes::<32>());
		bytes.extend_from_slice(&sig.s().to_be_bytes::<32>());
		let v = if sig.v() { 28 } else { 27 };
		bytes.push(v);
		Signature(bytes)
	}
}

impl fmt::Display for Signature {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "0x{}", hex::encode(&self.0))
	}
}

/// Blockchain transaction representation.
///
/// Contains all fields necessary for constructing and submitting transactions
/// to EVM- and TVM-family networks through the delivery layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
	/// Recipient address (None for contract creation).
	pub to: Option<Address>,
	/// Transaction data/calldata.
	#[serde(with = "crate::utils::hex_bytes")]
	pub data: Vec<u8>,
	/// Value to transfer in native currency.
	pub value: U256,
	/// Chain ID for replay protection.
	pub chain_id: u64,
	/// Transaction nonce (optional, can be filled by provider).
	pub nonce: Option<u64>,
	/// Gas limit for transaction execution.
	pub gas_limit: Option<u64>,
	/// Legacy gas price (for non-EIP-1559 transactions).
	pub gas_price: Option<u128>,
	/// Maximum fee per gas (EIP-1559).
	pub max_fee_per_gas: Option<u128>,
	/// Maximum priority fee per gas (EIP-1559).
	pub max_priority_fee_per_gas: Option<u128>,
}

impl Transaction {
	/// Creates a contract call transaction with the given target, calldata and value.
	pub fn call(to: Address, data: Vec<u8>, value: U256, chain_id: u64) -> Self {
		Self {
			to: Some(to),
			data,
			value,
			chain_id,
			nonce: None,
			gas_limit: None,
			gas_price: None,
			max_fee_per_gas: None,
			max_priority_fee_per_gas: None,
		}
	}
}

/// Transaction hash representation.
///
/// Stored as raw bytes to support the different hash formats of the
/// supported chain families (32-byte EVM/TVM hashes, base58 SVM signatures
/// carried as their decoded bytes).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionHash(pub Vec<u8>);

impl fmt::Display for TransactionHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "0x{}", hex::encode(&self.0))
	}
}

/// Transaction receipt representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionReceipt {
	/// Hash of the transaction this receipt belongs to.
	pub hash: TransactionHash,
	/// Block number the transaction was included in.
	pub block_number: u64,
	/// Whether the transaction executed successfully.
	pub success: bool,
}
