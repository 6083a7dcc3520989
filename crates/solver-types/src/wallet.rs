//! Wallet capability tags.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Enumerated wallet capability tag.
///
/// Chain executors ask the wallet manager for a wallet of a specific kind;
/// not every chain configures every kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletKind {
	/// Plain-signer wallet that aggregates calls via a multicall contract.
	Basic,
	/// Smart-contract-account wallet with ERC-7579-style execution encoding.
	Kernel,
}

impl fmt::Display for WalletKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			WalletKind::Basic => write!(f, "basic"),
			WalletKind::Kernel => write!(f, "kernel"),
		}
	}
}

impl FromStr for WalletKind {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"basic" => Ok(WalletKind::Basic),
			"kernel" => Ok(WalletKind::Kernel),
			other => Err(format!("Unknown wallet kind: {}", other)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_wallet_kind_round_trip() {
		assert_eq!("basic".parse::<WalletKind>(), Ok(WalletKind::Basic));
		assert_eq!("kernel".parse::<WalletKind>(), Ok(WalletKind::Kernel));
		assert!("vault".parse::<WalletKind>().is_err());
		assert_eq!(WalletKind::Kernel.to_string(), "kernel");
	}

	#[test]
	fn test_wallet_kind_serde() {
		let kind: WalletKind = serde_json::from_str("\"kernel\"").expect("deserialize");
		assert_eq!(kind, WalletKind::Kernel);
		assert_eq!(
			serde_json::to_string(&WalletKind::Basic).expect("serialize"),
			"\"basic\""
		);
	}
}
