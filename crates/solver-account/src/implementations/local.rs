//! Account provider implementations for the solver service.
//!
//! This module provides concrete implementations of the AccountInterface trait,
//! currently supporting local private key wallets using the Alloy library.

use crate::{AccountError, AccountInterface};
use alloy_primitives::B256;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use solver_types::{Address, Signature};

/// Local wallet implementation using Alloy's signer.
///
/// This implementation manages a private key locally and uses it to sign
/// messages and digests. It's suitable for development and testing
/// environments where key management simplicity is preferred.
#[derive(Debug)]
pub struct LocalWallet {
	/// The underlying Alloy signer that handles cryptographic operations.
	signer: PrivateKeySigner,
}

impl LocalWallet {
	/// Creates a new LocalWallet from a hex-encoded private key.
	///
	/// The private key should be provided as a hex string (with or without 0x prefix).
	pub fn new(private_key_hex: &str) -> Result<Self, AccountError> {
		let key_without_prefix = private_key_hex.strip_prefix("0x").unwrap_or(private_key_hex);
		if key_without_prefix.len() != 64 {
			return Err(AccountError::InvalidKey(
				"Private key must be 64 hex characters (32 bytes)".to_string(),
			));
		}

		let signer = private_key_hex
			.parse::<PrivateKeySigner>()
			.map_err(|e| AccountError::InvalidKey(format!("Invalid private key: {}", e)))?;

		Ok(Self { signer })
	}
}

#[async_trait]
impl AccountInterface for LocalWallet {
	async fn address(&self) -> Result<Address, AccountError> {
		Ok(self.signer.address().into())
	}

	async fn sign_message(&self, message: &[u8]) -> Result<Signature, AccountError> {
		// Alloy's signer handles EIP-191 prefixing internally
		let signature =
			self.signer.sign_message(message).await.map_err(|e| {
				AccountError::SigningFailed(format!("Failed to sign message: {}", e))
			})?;

		Ok(signature.into())
	}

	async fn sign_hash(&self, hash: &B256) -> Result<Signature, AccountError> {
		let signature = self
			.signer
			.sign_hash(hash)
			.await
			.map_err(|e| AccountError::SigningFailed(format!("Failed to sign digest: {}", e)))?;

		Ok(signature.into())
	}

	fn signer(&self) -> PrivateKeySigner {
		self.signer.clone()
	}
}

/// Factory function to create an account provider from configuration.
///
/// This function reads the account configuration and creates the appropriate
/// AccountInterface implementation. Currently only supports local wallets
/// with a private_key configuration parameter.
///
/// # Errors
///
/// Returns an error if:
/// - `private_key` is not provided in the configuration
/// - The wallet creation fails
pub fn create_account(config: &toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> {
	let private_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.ok_or_else(|| AccountError::InvalidKey("private_key is required".to_string()))?;

	let wallet = LocalWallet::new(private_key)?;
	Ok(Box::new(wallet))
}

#[cfg(test)]
mod tests {
	use super::*;

	// First Anvil dev key
	const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
	const TEST_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

	#[tokio::test]
	async fn test_address_derivation() {
		let wallet = LocalWallet::new(TEST_KEY).expect("valid key");
		let address = wallet.address().await.expect("address");
		assert_eq!(address.to_string(), TEST_ADDRESS);
	}

	#[test]
	fn test_invalid_key_rejected() {
		assert!(LocalWallet::new("0x1234").is_err());
		assert!(LocalWallet::new("not-hex").is_err());
	}

	#[tokio::test]
	async fn test_sign_message_produces_65_bytes() {
		let wallet = LocalWallet::new(TEST_KEY).expect("valid key");
		let signature = wallet.sign_message(b"hello").await.expect("signature");
		assert_eq!(signature.0.len(), 65);
	}

	#[tokio::test]
	async fn test_sign_hash_produces_65_bytes() {
		let wallet = LocalWallet::new(TEST_KEY).expect("valid key");
		let digest = B256::repeat_byte(0x42);
		let signature = wallet.sign_hash(&digest).await.expect("signature");
		assert_eq!(signature.0.len(), 65);
	}

	#[test]
	fn test_create_account_from_config() {
		let config: toml::Value = toml::from_str(&format!("private_key = \"{}\"", TEST_KEY))
			.expect("valid toml");
		assert!(create_account(&config).is_ok());

		let empty: toml::Value = toml::from_str("").expect("valid toml");
		assert!(create_account(&empty).is_err());
	}
}
