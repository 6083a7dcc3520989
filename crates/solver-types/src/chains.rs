//! Chain identifier and chain family types.
//!
//! The solver spans three mutually incompatible chain architectures. This
//! module defines the closed set of chain families and a normalized chain
//! identifier that unifies numeric (EVM/TVM) and named (SVM) identifier forms
//! so that equivalent identifiers compare equal regardless of how they were
//! written in configuration or job payloads.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// The supported chain families.
///
/// Each family has its own address format, transaction model, and signing
/// scheme; a chain executor implementation serves exactly one family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainFamily {
	/// Account-based EVM chains (Ethereum, Optimism, Base, ...).
	Evm,
	/// Solana-style chains with the account/program model.
	Svm,
	/// Tron-style chains (TVM).
	Tvm,
}

impl fmt::Display for ChainFamily {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ChainFamily::Evm => write!(f, "evm"),
			ChainFamily::Svm => write!(f, "svm"),
			ChainFamily::Tvm => write!(f, "tvm"),
		}
	}
}

/// Normalized destination/source chain identifier.
///
/// Numeric identifiers (EVM and TVM chains) normalize to `Numeric`; anything
/// that does not parse as an unsigned integer stays `Named` (SVM cluster
/// names such as "solana-mainnet"). Because parsing always prefers the
/// numeric form, `10u64`, `"10"` and big-integer text `"10"` all produce the
/// same value, so derived equality and hashing match numeric equivalence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChainId {
	/// Numeric chain identifier (EVM/TVM).
	Numeric(u64),
	/// Chain-family-native named identifier (SVM).
	Named(String),
}

impl ChainId {
	/// Returns the string-normalized form used as a scheduling key.
	pub fn key(&self) -> String {
		self.to_string()
	}

	/// Returns the numeric identifier when this chain uses one.
	pub fn as_u64(&self) -> Option<u64> {
		match self {
			ChainId::Numeric(id) => Some(*id),
			ChainId::Named(_) => None,
		}
	}
}

impl From<u64> for ChainId {
	fn from(id: u64) -> Self {
		ChainId::Numeric(id)
	}
}

impl FromStr for ChainId {
	type Err = std::convert::Infallible;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		// Numeric forms always normalize to Numeric so equivalence holds
		match s.parse::<u64>() {
			Ok(id) => Ok(ChainId::Numeric(id)),
			Err(_) => Ok(ChainId::Named(s.to_string())),
		}
	}
}

impl fmt::Display for ChainId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ChainId::Numeric(id) => write!(f, "{}", id),
			ChainId::Named(name) => write!(f, "{}", name),
		}
	}
}

/// Serializes numeric identifiers as numbers and named ones as strings.
impl Serialize for ChainId {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		match self {
			ChainId::Numeric(id) => serializer.serialize_u64(*id),
			ChainId::Named(name) => serializer.serialize_str(name),
		}
	}
}

/// Accepts numbers, numeric strings, and named strings, normalizing all
/// numeric forms to `Numeric`.
impl<'de> Deserialize<'de> for ChainId {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		struct ChainIdVisitor;

		impl serde::de::Visitor<'_> for ChainIdVisitor {
			type Value = ChainId;

			fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
				f.write_str("a chain id as a number or string")
			}

			fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<ChainId, E> {
				Ok(ChainId::Numeric(v))
			}

			fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<ChainId, E> {
				u64::try_from(v)
					.map(ChainId::Numeric)
					.map_err(|_| E::custom(format!("negative chain id: {}", v)))
			}

			fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<ChainId, E> {
				// Infallible
				Ok(v.parse().expect("ChainId::from_str is infallible"))
			}
		}

		deserializer.deserialize_any(ChainIdVisitor)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_numeric_equivalence() {
		let from_u64 = ChainId::from(10u64);
		let from_str: ChainId = "10".parse().expect("infallible");
		assert_eq!(from_u64, from_str);
		assert_eq!(from_u64.key(), "10");
	}

	#[test]
	fn test_named_chain_id() {
		let id: ChainId = "solana-mainnet".parse().expect("infallible");
		assert_eq!(id, ChainId::Named("solana-mainnet".to_string()));
		assert_eq!(id.as_u64(), None);
	}

	#[test]
	fn test_deserialize_number_and_string() {
		let from_number: ChainId = serde_json::from_str("10").expect("number form");
		let from_string: ChainId = serde_json::from_str("\"10\"").expect("string form");
		let named: ChainId = serde_json::from_str("\"solana-devnet\"").expect("named form");
		assert_eq!(from_number, from_string);
		assert_eq!(named, ChainId::Named("solana-devnet".to_string()));
	}

	#[test]
	fn test_serialize_round_trip() {
		let numeric = ChainId::Numeric(137);
		let json = serde_json::to_string(&numeric).expect("serialize");
		assert_eq!(json, "137");
		let named = ChainId::Named("solana-mainnet".to_string());
		let json = serde_json::to_string(&named).expect("serialize");
		assert_eq!(json, "\"solana-mainnet\"");
	}
}
