//! Transaction delivery implementation for TVM-family (Tron) networks.
//!
//! Tron full nodes expose an HTTP API instead of JSON-RPC. Contract calls are
//! built server-side via `triggersmartcontract`, signed locally over the
//! transaction ID, and broadcast as a separate step. Confirmation is polled
//! through `gettransactioninfobyid`.

use crate::{DeliveryError, DeliveryInterface};
use alloy_primitives::{B256, U256};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use solver_account::AccountInterface;
use solver_types::{
	ChainFamily, NetworksConfig, Transaction, TransactionHash, TransactionReceipt,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Maximum energy fee per transaction, in SUN.
const DEFAULT_FEE_LIMIT: u64 = 300_000_000;

/// Poll interval while waiting for a transaction to land in a block.
const CONFIRMATION_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Tron address version byte prepended to the 20-byte EVM-style body.
const TRON_ADDRESS_PREFIX: u8 = 0x41;

/// Response wrapper for `triggersmartcontract`.
#[derive(Debug, Deserialize)]
struct TriggerResponse {
	transaction: Option<UnsignedTransaction>,
	result: Option<TriggerResult>,
}

#[derive(Debug, Deserialize)]
struct TriggerResult {
	#[serde(default)]
	result: bool,
	message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UnsignedTransaction {
	#[serde(rename = "txID")]
	tx_id: String,
	raw_data_hex: String,
	raw_data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct BroadcastResponse {
	#[serde(default)]
	result: bool,
	code: Option<String>,
	message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransactionInfo {
	#[serde(rename = "id")]
	_id: Option<String>,
	#[serde(rename = "blockNumber")]
	block_number: Option<u64>,
	receipt: Option<ResourceReceipt>,
}

#[derive(Debug, Deserialize)]
struct ResourceReceipt {
	result: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountInfo {
	#[serde(default)]
	balance: u64,
}

#[derive(Debug, Deserialize)]
struct ConstantCallResponse {
	#[serde(default)]
	constant_result: Vec<String>,
	result: Option<TriggerResult>,
}

/// HTTP-API based delivery implementation for Tron networks.
///
/// Holds one base URL per configured TVM chain and a reference to the solver
/// account for signing transaction IDs.
pub struct TronHttpDelivery {
	client: reqwest::Client,
	endpoints: HashMap<u64, String>,
	account: Arc<dyn AccountInterface>,
}

impl TronHttpDelivery {
	/// Creates a new TronHttpDelivery for the TVM networks in the configuration.
	pub fn new(
		networks: &NetworksConfig,
		account: Arc<dyn AccountInterface>,
	) -> Result<Self, DeliveryError> {
		let mut endpoints = HashMap::new();

		for (chain_id, network) in networks {
			if network.family != ChainFamily::Tvm {
				continue;
			}
			let network_id = chain_id.as_u64().ok_or_else(|| {
				DeliveryError::Network(format!("TVM network {} has no numeric id", chain_id))
			})?;
			let http_url = network.get_http_url().ok_or_else(|| {
				DeliveryError::Network(format!(
					"No HTTP API URL configured for network {}",
					network_id
				))
			})?;
			endpoints.insert(network_id, http_url.trim_end_matches('/').to_string());
		}

		if endpoints.is_empty() {
			return Err(DeliveryError::Network(
				"No TVM networks configured".to_string(),
			));
		}

		Ok(Self {
			client: reqwest::Client::new(),
			endpoints,
			account,
		})
	}

	fn endpoint(&self, chain_id: u64) -> Result<&str, DeliveryError> {
		self.endpoints
			.get(&chain_id)
			.map(String::as_str)
			.ok_or_else(|| {
				DeliveryError::Network(format!("No Tron endpoint for chain ID {}", chain_id))
			})
	}

	async fn post<T: serde::de::DeserializeOwned>(
		&self,
		chain_id: u64,
		path: &str,
		body: serde_json::Value,
	) -> Result<T, DeliveryError> {
		let url = format!("{}/{}", self.endpoint(chain_id)?, path);
		let response = self
			.client
			.post(&url)
			.json(&body)
			.send()
			.await
			.map_err(|e| DeliveryError::Network(format!("Tron API request failed: {}", e)))?;

		if !response.status().is_success() {
			return Err(DeliveryError::Network(format!(
				"Tron API {} returned status {}",
				path,
				response.status()
			)));
		}

		response
			.json::<T>()
			.await
			.map_err(|e| DeliveryError::Network(format!("Invalid Tron API response: {}", e)))
	}

	/// Converts a 20-byte address into the hex form the Tron API expects,
	/// with the 0x41 version byte prepended.
	fn tron_hex_address(address: &solver_types::Address) -> Result<String, DeliveryError> {
		if address.0.len() != 20 {
			return Err(DeliveryError::Network(format!(
				"Not a 20-byte Tron address: {}",
				address
			)));
		}
		let mut bytes = Vec::with_capacity(21);
		bytes.push(TRON_ADDRESS_PREFIX);
		bytes.extend_from_slice(&address.0);
		Ok(hex::encode(bytes))
	}

	/// Builds an unsigned contract-call transaction via the full node.
	async fn build_trigger(
		&self,
		tx: &Transaction,
		owner: &solver_types::Address,
	) -> Result<UnsignedTransaction, DeliveryError> {
		let to = tx.to.as_ref().ok_or_else(|| {
			DeliveryError::Network("Tron transaction is missing a target".to_string())
		})?;

		let call_value: u64 = tx.value.try_into().map_err(|_| {
			DeliveryError::Network("Tron call value exceeds u64 range".to_string())
		})?;

		let body = json!({
			"owner_address": Self::tron_hex_address(owner)?,
			"contract_address": Self::tron_hex_address(to)?,
			"data": hex::encode(&tx.data),
			"call_value": call_value,
			"fee_limit": DEFAULT_FEE_LIMIT,
			"visible": false,
		});

		let response: TriggerResponse = self
			.post(tx.chain_id, "wallet/triggersmartcontract", body)
			.await?;

		if let Some(result) = &response.result {
			if !result.result {
				let message = result
					.message
					.as_deref()
					.map(decode_api_message)
					.unwrap_or_else(|| "unknown error".to_string());
				return Err(DeliveryError::TransactionFailed(format!(
					"triggersmartcontract rejected: {}",
					message
				)));
			}
		}

		response.transaction.ok_or_else(|| {
			DeliveryError::Network("triggersmartcontract returned no transaction".to_string())
		})
	}

	/// Verifies that the node-reported transaction ID matches the raw
	/// transaction payload before signing it.
	fn verify_tx_id(unsigned: &UnsignedTransaction) -> Result<B256, DeliveryError> {
		let raw = hex::decode(&unsigned.raw_data_hex)
			.map_err(|e| DeliveryError::Network(format!("Invalid raw_data_hex: {}", e)))?;
		let digest = Sha256::digest(&raw);
		let claimed = hex::decode(&unsigned.tx_id)
			.map_err(|e| DeliveryError::Network(format!("Invalid txID: {}", e)))?;
		if digest.as_slice() != claimed.as_slice() {
			return Err(DeliveryError::Network(
				"Tron txID does not match hash of raw transaction".to_string(),
			));
		}
		Ok(B256::from_slice(&claimed))
	}
}

#[async_trait]
impl DeliveryInterface for TronHttpDelivery {
	async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError> {
		let owner = self
			.account
			.address()
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get signer address: {}", e)))?;

		let unsigned = self.build_trigger(&tx, &owner).await?;
		let tx_id = Self::verify_tx_id(&unsigned)?;

		// Tron signatures are plain secp256k1 over the transaction ID
		let signature = self
			.account
			.sign_hash(&tx_id)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to sign transaction: {}", e)))?;

		let body = json!({
			"txID": unsigned.tx_id,
			"raw_data": unsigned.raw_data,
			"raw_data_hex": unsigned.raw_data_hex,
			"signature": [hex::encode(&signature.0)],
			"visible": false,
		});

		let response: BroadcastResponse = self
			.post(tx.chain_id, "wallet/broadcasttransaction", body)
			.await?;

		if !response.result {
			let message = response
				.message
				.as_deref()
				.map(decode_api_message)
				.unwrap_or_else(|| response.code.unwrap_or_default());
			return Err(DeliveryError::TransactionFailed(format!(
				"Broadcast rejected: {}",
				message
			)));
		}

		tracing::info!(
			tx_hash = %unsigned.tx_id,
			chain_id = tx.chain_id,
			"Tron transaction broadcast"
		);

		Ok(TransactionHash(tx_id.to_vec()))
	}

	async fn wait_for_confirmation(
		&self,
		hash: &TransactionHash,
		chain_id: u64,
		_confirmations: u64,
		timeout_seconds: u64,
	) -> Result<TransactionReceipt, DeliveryError> {
		let deadline = tokio::time::Instant::now() + Duration::from_secs(timeout_seconds);

		loop {
			if let Some(receipt) = self.get_receipt(hash, chain_id).await? {
				if !receipt.success {
					return Err(DeliveryError::TransactionFailed(format!(
						"Tron transaction {} reverted",
						hash
					)));
				}
				return Ok(receipt);
			}

			if tokio::time::Instant::now() >= deadline {
				return Err(DeliveryError::ConfirmationTimeout(format!(
					"Tron transaction {} not confirmed within {}s",
					hash, timeout_seconds
				)));
			}
			tokio::time::sleep(CONFIRMATION_POLL_INTERVAL).await;
		}
	}

	async fn get_receipt(
		&self,
		hash: &TransactionHash,
		chain_id: u64,
	) -> Result<Option<TransactionReceipt>, DeliveryError> {
		let info: TransactionInfo = self
			.post(
				chain_id,
				"wallet/gettransactioninfobyid",
				json!({ "value": hex::encode(&hash.0) }),
			)
			.await?;

		// Not in a block yet means still pending (or unknown)
		let Some(block_number) = info.block_number else {
			return Ok(None);
		};

		// Pure TRX transfers carry no receipt result; contract calls must
		// report SUCCESS to count as executed
		let success = match info.receipt.and_then(|r| r.result) {
			Some(result) => result == "SUCCESS",
			None => true,
		};

		Ok(Some(TransactionReceipt {
			hash: hash.clone(),
			block_number,
			success,
		}))
	}

	async fn get_balance(
		&self,
		address: &solver_types::Address,
		chain_id: u64,
	) -> Result<U256, DeliveryError> {
		let info: AccountInfo = self
			.post(
				chain_id,
				"wallet/getaccount",
				json!({
					"address": Self::tron_hex_address(address)?,
					"visible": false,
				}),
			)
			.await?;

		Ok(U256::from(info.balance))
	}

	async fn get_allowance(
		&self,
		owner: &solver_types::Address,
		spender: &solver_types::Address,
		token: &solver_types::Address,
		chain_id: u64,
	) -> Result<U256, DeliveryError> {
		// allowance(address,address) selector is 0xdd62ed3e
		let mut call_data = Vec::with_capacity(4 + 64);
		call_data.extend_from_slice(&[0xdd, 0x62, 0xed, 0x3e]);
		call_data.extend_from_slice(&[0; 12]);
		call_data.extend_from_slice(&owner.0);
		call_data.extend_from_slice(&[0; 12]);
		call_data.extend_from_slice(&spender.0);

		let result = self
			.call(Transaction::call(token.clone(), call_data, U256::ZERO, chain_id))
			.await?;

		if result.len() < 32 {
			return Err(DeliveryError::Network(
				"Invalid allowance response".to_string(),
			));
		}
		Ok(U256::from_be_slice(&result[..32]))
	}

	async fn get_code(
		&self,
		address: &solver_types::Address,
		chain_id: u64,
	) -> Result<Vec<u8>, DeliveryError> {
		#[derive(Deserialize)]
		struct ContractInfo {
			bytecode: Option<String>,
		}

		let info: ContractInfo = self
			.post(
				chain_id,
				"wallet/getcontract",
				json!({
					"value": Self::tron_hex_address(address)?,
					"visible": false,
				}),
			)
			.await?;

		match info.bytecode {
			Some(code) => hex::decode(&code)
				.map_err(|e| DeliveryError::Network(format!("Invalid contract bytecode: {}", e))),
			None => Ok(Vec::new()),
		}
	}

	async fn call(&self, tx: Transaction) -> Result<Vec<u8>, DeliveryError> {
		let owner = self
			.account
			.address()
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get signer address: {}", e)))?;
		let to = tx.to.as_ref().ok_or_else(|| {
			DeliveryError::Network("Tron call is missing a target".to_string())
		})?;

		let response: ConstantCallResponse = self
			.post(
				tx.chain_id,
				"wallet/triggerconstantcontract",
				json!({
					"owner_address": Self::tron_hex_address(&owner)?,
					"contract_address": Self::tron_hex_address(to)?,
					"data": hex::encode(&tx.data),
					"visible": false,
				}),
			)
			.await?;

		if let Some(result) = &response.result {
			if !result.result {
				let message = result
					.message
					.as_deref()
					.map(decode_api_message)
					.unwrap_or_else(|| "unknown error".to_string());
				return Err(DeliveryError::Network(format!(
					"Constant call failed: {}",
					message
				)));
			}
		}

		let encoded = response.constant_result.first().ok_or_else(|| {
			DeliveryError::Network("Constant call returned no result".to_string())
		})?;
		hex::decode(encoded)
			.map_err(|e| DeliveryError::Network(format!("Invalid constant_result: {}", e)))
	}
}

/// Tron error messages arrive hex-encoded; decode them for readable logs.
fn decode_api_message(message: &str) -> String {
	hex::decode(message)
		.ok()
		.and_then(|bytes| String::from_utf8(bytes).ok())
		.unwrap_or_else(|| message.to_string())
}

#[cfg(test)]
mod tests {
	use super::*;
	use solver_types::Address;

	#[test]
	fn tron_hex_address_prepends_version_byte() {
		let address = Address(vec![0xAB; 20]);
		let encoded = TronHttpDelivery::tron_hex_address(&address).unwrap();
		assert!(encoded.starts_with("41"));
		assert_eq!(encoded.len(), 42);
	}

	#[test]
	fn tron_hex_address_rejects_wrong_length() {
		let address = Address(vec![0xAB; 32]);
		assert!(TronHttpDelivery::tron_hex_address(&address).is_err());
	}

	#[test]
	fn verify_tx_id_detects_mismatch() {
		let unsigned = UnsignedTransaction {
			tx_id: hex::encode([0u8; 32]),
			raw_data_hex: "deadbeef".to_string(),
			raw_data: serde_json::Value::Null,
		};
		assert!(TronHttpDelivery::verify_tx_id(&unsigned).is_err());
	}

	#[test]
	fn verify_tx_id_accepts_matching_hash() {
		let raw = hex::decode("deadbeef").unwrap();
		let digest = Sha256::digest(&raw);
		let unsigned = UnsignedTransaction {
			tx_id: hex::encode(digest),
			raw_data_hex: "deadbeef".to_string(),
			raw_data: serde_json::Value::Null,
		};
		let tx_id = TronHttpDelivery::verify_tx_id(&unsigned).unwrap();
		assert_eq!(tx_id.as_slice(), digest.as_slice());
	}

	#[test]
	fn decode_api_message_handles_hex_and_plain() {
		assert_eq!(
			decode_api_message(&hex::encode("insufficient energy")),
			"insufficient energy"
		);
		assert_eq!(decode_api_message("not hex!"), "not hex!");
	}
}
