//! Account management module for the intent execution engine.
//!
//! This module provides abstractions for managing cryptographic accounts and signing
//! operations. It defines interfaces and services for account operations such as
//! address retrieval, message signing, and raw digest signing used by the
//! smart-account executor path and the TVM transaction flow.

use alloy_primitives::B256;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use solver_types::{Address, Signature};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod local;
}

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
	/// Error that occurs when signing operations fail.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// Error that occurs when a cryptographic key is invalid or malformed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// Error that occurs when interacting with the account implementation.
	#[error("Implementation error: {0}")]
	Implementation(String),
}

/// Trait defining the interface for account implementations.
///
/// This trait must be implemented by any account implementation that wants to
/// integrate with the solver system. It provides methods for retrieving account
/// addresses and producing signatures.
#[async_trait]
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait AccountInterface: Send + Sync {
	/// Retrieves the address associated with this account.
	async fn address(&self) -> Result<Address, AccountError>;

	/// Signs an arbitrary message (EIP-191) using the account's private key.
	async fn sign_message(&self, message: &[u8]) -> Result<Signature, AccountError>;

	/// Signs a raw 32-byte digest without any prefixing.
	///
	/// Used where the digest is defined by an external protocol: the
	/// executor-module execution hash and the TVM transaction id.
	async fn sign_hash(&self, hash: &B256) -> Result<Signature, AccountError>;

	/// Returns the underlying signer for use with Alloy's EthereumWallet.
	///
	/// This is the preferred way to get signing capability for the delivery layer.
	fn signer(&self) -> PrivateKeySigner;
}

/// Factory function type for account implementations.
pub type AccountFactory = fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>;

/// Service that manages account operations.
///
/// This struct provides a high-level interface for account management,
/// wrapping an underlying account implementation.
pub struct AccountService {
	/// The underlying account implementation.
	implementation: Box<dyn AccountInterface>,
}

impl AccountService {
	/// Creates a new AccountService with the specified implementation.
	pub fn new(implementation: Box<dyn AccountInterface>) -> Self {
		Self { implementation }
	}

	/// Retrieves the address associated with the managed account.
	pub async fn get_address(&self) -> Result<Address, AccountError> {
		self.implementation.address().await
	}

	/// Signs a message using the managed account.
	pub async fn sign_message(&self, message: &[u8]) -> Result<Signature, AccountError> {
		self.implementation.sign_message(message).await
	}

	/// Signs a raw 32-byte digest using the managed account.
	pub async fn sign_hash(&self, hash: &B256) -> Result<Signature, AccountError> {
		self.implementation.sign_hash(hash).await
	}

	/// Returns the underlying signer for the delivery layer.
	pub fn signer(&self) -> PrivateKeySigner {
		self.implementation.signer()
	}
}
