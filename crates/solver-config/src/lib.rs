//! Configuration module for the intent execution engine.
//!
//! This module provides structures and utilities for managing solver configuration.
//! It supports loading configuration from TOML files and provides validation to
//! ensure all required configuration values are properly set before any network
//! connection is attempted.

use serde::{Deserialize, Serialize};
use solver_types::networks::deserialize_networks;
use solver_types::{ChainFamily, NetworksConfig};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the solver.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Configuration specific to the solver instance.
	pub solver: SolverConfig,
	/// Network configurations keyed by chain identifier.
	#[serde(deserialize_with = "deserialize_networks")]
	pub networks: NetworksConfig,
	/// Configuration for account management.
	pub account: AccountConfig,
	/// Configuration for transaction delivery.
	#[serde(default)]
	pub delivery: DeliveryConfig,
	/// Configuration for wallet behavior.
	#[serde(default)]
	pub wallet: WalletConfig,
	/// Configuration for the execution scheduler.
	#[serde(default)]
	pub scheduler: SchedulerConfig,
}

/// Configuration specific to the solver instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SolverConfig {
	/// Unique identifier for this solver instance.
	pub id: String,
}

/// Configuration for account management.
///
/// Each implementation carries its own configuration format as raw TOML,
/// validated by the implementation that consumes it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of account implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for transaction delivery.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeliveryConfig {
	/// Minimum number of confirmations required for transactions.
	#[serde(default = "default_confirmations")]
	pub min_confirmations: u64,
	/// Timeout in seconds for waiting on transaction confirmation.
	#[serde(default = "default_transaction_timeout_seconds")]
	pub transaction_timeout_seconds: u64,
}

impl Default for DeliveryConfig {
	fn default() -> Self {
		Self {
			min_confirmations: default_confirmations(),
			transaction_timeout_seconds: default_transaction_timeout_seconds(),
		}
	}
}

/// Configuration for wallet behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WalletConfig {
	/// Validity window in seconds for executor-module execution signatures.
	#[serde(default = "default_executor_signature_expiration_seconds")]
	pub executor_signature_expiration_seconds: u64,
}

impl Default for WalletConfig {
	fn default() -> Self {
		Self {
			executor_signature_expiration_seconds: default_executor_signature_expiration_seconds(),
		}
	}
}

/// Configuration for the execution scheduler.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
	/// Maximum number of concurrently executing jobs across all chains.
	#[serde(default = "default_concurrency")]
	pub concurrency: usize,
	/// Maximum execution attempts per job before terminal failure.
	#[serde(default = "default_max_attempts")]
	pub max_attempts: u32,
	/// Base retry delay in milliseconds.
	#[serde(default = "default_backoff_delay_ms")]
	pub backoff_delay_ms: u64,
	/// Retry delay cap in milliseconds.
	#[serde(default = "default_backoff_max_delay_ms")]
	pub backoff_max_delay_ms: u64,
	/// Jitter fraction in [0, 1]; delays are scaled by a factor drawn
	/// uniformly from [1 - jitter, 1].
	#[serde(default)]
	pub backoff_jitter: f64,
}

impl Default for SchedulerConfig {
	fn default() -> Self {
		Self {
			concurrency: default_concurrency(),
			max_attempts: default_max_attempts(),
			backoff_delay_ms: default_backoff_delay_ms(),
			backoff_max_delay_ms: default_backoff_max_delay_ms(),
			backoff_jitter: 0.0,
		}
	}
}

/// Returns the default number of confirmations required.
fn default_confirmations() -> u64 {
	2
}

/// Returns the default confirmation timeout in seconds.
fn default_transaction_timeout_seconds() -> u64 {
	300
}

/// Returns the default executor signature validity window in seconds.
fn default_executor_signature_expiration_seconds() -> u64 {
	300
}

fn default_concurrency() -> usize {
	10
}

fn default_max_attempts() -> u32 {
	5
}

fn default_backoff_delay_ms() -> u64 {
	1000
}

fn default_backoff_max_delay_ms() -> u64 {
	10000
}

impl Config {
	/// Loads configuration from a TOML file.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let content = tokio::fs::read_to_string(path).await?;
		content.parse()
	}

	/// Validates the configuration to ensure all required fields are properly set.
	///
	/// This method performs validation across all configuration sections:
	/// - Ensures solver ID is not empty
	/// - Validates at least one network is configured, each with an RPC URL
	///   and a portal address
	/// - Verifies an account implementation is configured
	/// - Checks scheduler bounds (non-zero attempts, jitter within [0, 1])
	fn validate(&self) -> Result<(), ConfigError> {
		if self.solver.id.is_empty() {
			return Err(ConfigError::Validation("Solver ID cannot be empty".into()));
		}

		if self.networks.is_empty() {
			return Err(ConfigError::Validation(
				"Networks configuration cannot be empty".into(),
			));
		}
		for (chain_id, network) in &self.networks {
			if network.get_http_url().is_none() {
				return Err(ConfigError::Validation(format!(
					"Network {chain_id} must have an HTTP RPC URL"
				)));
			}
			if network.portal_address.0.is_empty() {
				return Err(ConfigError::Validation(format!(
					"Network {chain_id} must have portal_address"
				)));
			}
			// Named identifiers only make sense for the SVM family
			if network.family != ChainFamily::Svm && chain_id.as_u64().is_none() {
				return Err(ConfigError::Validation(format!(
					"Network {chain_id} is {} but has a non-numeric identifier",
					network.family
				)));
			}
		}

		if self.account.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Account primary implementation cannot be empty".into(),
			));
		}
		if !self
			.account
			.implementations
			.contains_key(&self.account.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary account '{}' not found in implementations",
				self.account.primary
			)));
		}

		if self.scheduler.max_attempts == 0 {
			return Err(ConfigError::Validation(
				"Scheduler max_attempts must be at least 1".into(),
			));
		}
		if self.scheduler.concurrency == 0 {
			return Err(ConfigError::Validation(
				"Scheduler concurrency must be at least 1".into(),
			));
		}
		if !(0.0..=1.0).contains(&self.scheduler.backoff_jitter) {
			return Err(ConfigError::Validation(
				"Scheduler backoff_jitter must be within [0, 1]".into(),
			));
		}
		if self.scheduler.backoff_delay_ms == 0
			|| self.scheduler.backoff_max_delay_ms < self.scheduler.backoff_delay_ms
		{
			return Err(ConfigError::Validation(
				"Scheduler backoff delays must satisfy 0 < delay <= max_delay".into(),
			));
		}

		Ok(())
	}
}

impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let config: Config = toml::from_str(s)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use solver_types::ChainId;

	fn base_config() -> String {
		r#"
			[solver]
			id = "test-solver"

			[networks.10]
			family = "evm"
			rpc_urls = [{ http = "http://localhost:8545" }]
			portal_address = "0xf0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0"
			multicall_address = "0xcA11bde05977b3631167028862bE2a173976CA11"

			[networks.solana-mainnet]
			family = "svm"
			rpc_urls = [{ http = "http://localhost:8899" }]
			portal_address = "0x1212121212121212121212121212121212121212121212121212121212121212"

			[account]
			primary = "local"
			[account.implementations.local]
			private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
		"#
		.to_string()
	}

	#[test]
	fn test_parse_valid_config() {
		let config: Config = base_config().parse().expect("valid config");
		assert_eq!(config.solver.id, "test-solver");
		assert!(config.networks.contains_key(&ChainId::Numeric(10)));
		assert!(config
			.networks
			.contains_key(&ChainId::Named("solana-mainnet".to_string())));
		// Defaults
		assert_eq!(config.scheduler.max_attempts, 5);
		assert_eq!(config.delivery.min_confirmations, 2);
		assert_eq!(config.wallet.executor_signature_expiration_seconds, 300);
	}

	#[test]
	fn test_empty_networks_rejected() {
		let toml = r#"
			[solver]
			id = "test-solver"

			[networks]

			[account]
			primary = "local"
			[account.implementations.local]
			private_key = "0x00"
		"#;
		let err = toml.parse::<Config>().expect_err("must fail");
		assert!(matches!(err, ConfigError::Validation(_)));
	}

	#[test]
	fn test_jitter_out_of_range_rejected() {
		let toml = format!(
			"{}\n[scheduler]\nbackoff_jitter = 1.5\n",
			base_config()
		);
		let err = toml.parse::<Config>().expect_err("must fail");
		assert!(matches!(err, ConfigError::Validation(_)));
	}

	#[test]
	fn test_zero_attempts_rejected() {
		let toml = format!("{}\n[scheduler]\nmax_attempts = 0\n", base_config());
		let err = toml.parse::<Config>().expect_err("must fail");
		assert!(matches!(err, ConfigError::Validation(_)));
	}

	#[test]
	fn test_unknown_primary_account_rejected() {
		let toml = base_config().replace("primary = \"local\"", "primary = \"kms\"");
		let err = toml.parse::<Config>().expect_err("must fail");
		assert!(matches!(err, ConfigError::Validation(_)));
	}
}
