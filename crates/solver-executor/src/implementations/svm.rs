//! Intent executor for SVM-family (Solana) chains.
//!
//! The portal is an on-chain program; fulfillment is one transaction
//! carrying token funding instructions followed by the program's
//! `fulfill_and_prove` instruction against PDAs derived from the intent
//! hash. There is no allowance model here: tokens move directly into the
//! vault's associated token account in the same transaction.

use crate::{abi, ExecutorError, ExecutorInterface, ProverResolver};
use alloy_primitives::U256;
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
	commitment_config::CommitmentConfig,
	instruction::{AccountMeta, Instruction},
	pubkey::Pubkey,
	signature::{Keypair, Signature as SolanaSignature},
	signer::Signer,
	system_program,
	transaction::Transaction,
};
use solver_types::{
	truncate_id, Address, ChainId, ExecutionResult, Intent, Route, WalletKind, WithdrawalRequest,
};
use std::str::FromStr;
use std::sync::Arc;

/// Portal program instruction discriminators.
const FULFILL_AND_PROVE_DISCRIMINATOR: [u8; 8] = [0, 1, 2, 3, 4, 5, 6, 8];
const WITHDRAW_DISCRIMINATOR: [u8; 8] = [0, 1, 2, 3, 4, 5, 6, 9];

/// SPL token program instruction tags.
const SPL_CREATE_ATA_IDEMPOTENT: u8 = 1;
const SPL_TRANSFER: u8 = 3;

const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
const ASSOCIATED_TOKEN_PROGRAM_ID: &str = "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL";

pub struct SvmExecutor {
	client: RpcClient,
	keypair: Keypair,
	portal_program_id: Pubkey,
	provers: Arc<dyn ProverResolver>,
}

impl SvmExecutor {
	/// Creates an executor from a base58 secret key and the configured
	/// portal program address.
	pub fn new(
		rpc_url: &str,
		secret_key: &str,
		portal: &Address,
		provers: Arc<dyn ProverResolver>,
	) -> Result<Self, ExecutorError> {
		let secret = bs58::decode(secret_key)
			.into_vec()
			.map_err(|e| ExecutorError::Configuration(format!("Invalid SVM secret key: {}", e)))?;
		let keypair = Keypair::from_bytes(&secret)
			.map_err(|e| ExecutorError::Configuration(format!("Invalid SVM keypair: {}", e)))?;
		let portal_program_id = Self::pubkey_from_address(portal, "portal program")?;

		Ok(Self {
			client: RpcClient::new_with_commitment(
				rpc_url.to_string(),
				CommitmentConfig::confirmed(),
			),
			keypair,
			portal_program_id,
			provers,
		})
	}

	fn pubkey_from_address(address: &Address, what: &str) -> Result<Pubkey, ExecutorError> {
		let bytes: [u8; 32] = address.0.as_slice().try_into().map_err(|_| {
			ExecutorError::Configuration(format!(
				"{} is not a 32-byte SVM address: {}",
				what, address
			))
		})?;
		Ok(Pubkey::new_from_array(bytes))
	}

	/// Widens a 20- or 32-byte address to the 32-byte form PDAs and
	/// instruction data expect.
	fn padded_32(address: &Address) -> [u8; 32] {
		let mut out = [0u8; 32];
		let offset = 32usize.saturating_sub(address.0.len());
		let take = address.0.len().min(32);
		out[offset..].copy_from_slice(&address.0[address.0.len() - take..]);
		out
	}

	fn amount_u64(amount: U256) -> Result<u64, ExecutorError> {
		amount.try_into().map_err(|_| {
			ExecutorError::Configuration("Token amount exceeds u64 on SVM".to_string())
		})
	}

	fn vault_pda(&self, seed: &[u8; 32]) -> Pubkey {
		Pubkey::find_program_address(&[b"vault", seed], &self.portal_program_id).0
	}

	/// Associated token account derivation. Hand-rolled against the ATA
	/// program seeds so the executor does not pull in the SPL crates.
	fn associated_token_account(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
		let token_program = Pubkey::from_str(TOKEN_PROGRAM_ID).expect("constant program id");
		let ata_program =
			Pubkey::from_str(ASSOCIATED_TOKEN_PROGRAM_ID).expect("constant program id");
		Pubkey::find_program_address(
			&[owner.as_ref(), token_program.as_ref(), mint.as_ref()],
			&ata_program,
		)
		.0
	}

	/// Idempotent create instruction for an owner's associated token account.
	fn create_ata_instruction(&self, owner: &Pubkey, mint: &Pubkey) -> Instruction {
		let token_program = Pubkey::from_str(TOKEN_PROGRAM_ID).expect("constant program id");
		let ata_program =
			Pubkey::from_str(ASSOCIATED_TOKEN_PROGRAM_ID).expect("constant program id");
		let ata = Self::associated_token_account(owner, mint);
		Instruction {
			program_id: ata_program,
			accounts: vec![
				AccountMeta::new(self.keypair.pubkey(), true),
				AccountMeta::new(ata, false),
				AccountMeta::new_readonly(*owner, false),
				AccountMeta::new_readonly(*mint, false),
				AccountMeta::new_readonly(system_program::id(), false),
				AccountMeta::new_readonly(token_program, false),
			],
			data: vec![SPL_CREATE_ATA_IDEMPOTENT],
		}
	}

	/// SPL token transfer from the solver's associated account.
	fn transfer_instruction(
		&self,
		mint: &Pubkey,
		destination_owner: &Pubkey,
		amount: u64,
	) -> Instruction {
		let token_program = Pubkey::from_str(TOKEN_PROGRAM_ID).expect("constant program id");
		let source = Self::associated_token_account(&self.keypair.pubkey(), mint);
		let destination = Self::associated_token_account(destination_owner, mint);
		let mut data = Vec::with_capacity(9);
		data.push(SPL_TRANSFER);
		data.extend_from_slice(&amount.to_le_bytes());
		Instruction {
			program_id: token_program,
			accounts: vec![
				AccountMeta::new(source, false),
				AccountMeta::new(destination, false),
				AccountMeta::new_readonly(self.keypair.pubkey(), true),
			],
			data,
		}
	}

	/// Portal route payload, in the program's packed little-endian layout.
	fn encode_route(route: &Route) -> Result<Vec<u8>, ExecutorError> {
		let mut out = Vec::new();
		out.extend_from_slice(route.salt.as_slice());
		out.extend_from_slice(&route.deadline.to_le_bytes());
		out.extend_from_slice(&Self::padded_32(&route.portal));

		out.extend_from_slice(&(route.tokens.len() as u32).to_le_bytes());
		for entry in &route.tokens {
			out.extend_from_slice(&Self::padded_32(&entry.token));
			out.extend_from_slice(&Self::amount_u64(entry.amount)?.to_le_bytes());
		}

		out.extend_from_slice(&(route.calls.len() as u32).to_le_bytes());
		for call in &route.calls {
			out.extend_from_slice(&Self::padded_32(&call.target));
			out.extend_from_slice(&(call.data.len() as u32).to_le_bytes());
			out.extend_from_slice(&call.data);
			out.extend_from_slice(&Self::amount_u64(call.value)?.to_le_bytes());
		}
		Ok(out)
	}

	fn fulfill_instruction(
		&self,
		intent: &Intent,
		prover_contract: &Address,
		source: u64,
		proof: &[u8],
	) -> Result<Instruction, ExecutorError> {
		let intent_hash: [u8; 32] = intent.intent_hash.0;
		let reward_hash = abi::reward_hash(&intent.reward)?;
		let prover_bytes = Self::padded_32(prover_contract);

		let vault = self.vault_pda(&intent_hash);
		let fulfill_marker = Pubkey::find_program_address(
			&[b"fulfill_marker", &intent_hash],
			&self.portal_program_id,
		)
		.0;
		let prover_pda =
			Pubkey::find_program_address(&[b"prover", &prover_bytes], &self.portal_program_id).0;

		let mut data = Vec::new();
		data.extend_from_slice(&FULFILL_AND_PROVE_DISCRIMINATOR);
		data.extend_from_slice(&intent_hash);
		data.extend_from_slice(reward_hash.as_slice());
		data.extend_from_slice(self.keypair.pubkey().as_ref());
		data.extend_from_slice(&prover_bytes);
		data.extend_from_slice(&source.to_le_bytes());
		data.extend_from_slice(proof);
		data.extend_from_slice(&Self::encode_route(&intent.route)?);

		Ok(Instruction {
			program_id: self.portal_program_id,
			accounts: vec![
				AccountMeta::new(vault, false),
				AccountMeta::new(fulfill_marker, false),
				AccountMeta::new_readonly(prover_pda, false),
				AccountMeta::new_readonly(self.keypair.pubkey(), true),
				AccountMeta::new_readonly(system_program::id(), false),
			],
			data,
		})
	}

	async fn send_transaction(
		&self,
		instructions: Vec<Instruction>,
	) -> Result<SolanaSignature, ExecutorError> {
		let blockhash = self
			.client
			.get_latest_blockhash()
			.await
			.map_err(|e| ExecutorError::Network(format!("Failed to get blockhash: {}", e)))?;
		let transaction = Transaction::new_signed_with_payer(
			&instructions,
			Some(&self.keypair.pubkey()),
			&[&self.keypair],
			blockhash,
		);
		self.client
			.send_and_confirm_transaction(&transaction)
			.await
			.map_err(|e| ExecutorError::Network(format!("Transaction failed: {}", e)))
	}
}

#[async_trait]
impl ExecutorInterface for SvmExecutor {
	async fn fulfill(
		&self,
		intent: &Intent,
		_wallet_kind: Option<WalletKind>,
	) -> Result<ExecutionResult, ExecutorError> {
		let source = intent.source_chain_id.as_u64().ok_or_else(|| {
			ExecutorError::Configuration(format!(
				"Source chain {} has no numeric id",
				intent.source_chain_id
			))
		})?;

		let prover = self
			.provers
			.prover(&intent.source_chain_id, &intent.reward.prover)
			.ok_or_else(|| ExecutorError::ProverNotFound {
				source_chain: intent.source_chain_id.clone(),
				prover: intent.reward.prover.to_string(),
			})?;
		let prover_contract = prover
			.contract_address(&intent.destination)
			.ok_or_else(|| {
				ExecutorError::Configuration(format!(
					"Prover has no contract on chain {}",
					intent.destination
				))
			})?;
		let proof = prover.generate_proof(intent).await?;

		// Fund the vault's token accounts and fulfill in one transaction;
		// no allowance step exists on this family
		let vault = self.vault_pda(&intent.intent_hash.0);
		let mut instructions = Vec::new();
		for entry in &intent.route.tokens {
			let mint = Self::pubkey_from_address(&entry.token, "route token")?;
			instructions.push(self.create_ata_instruction(&vault, &mint));
			instructions.push(self.transfer_instruction(
				&mint,
				&vault,
				Self::amount_u64(entry.amount)?,
			));
		}
		instructions.push(self.fulfill_instruction(intent, &prover_contract, source, &proof)?);

		tracing::debug!(
			intent_hash = %truncate_id(&intent.intent_hash.to_string()),
			instructions = instructions.len(),
			"Submitting fulfillment transaction"
		);

		let signature = self.send_transaction(instructions).await?;
		Ok(ExecutionResult::success(signature.to_string()))
	}

	async fn get_balance(
		&self,
		_chain_id: &ChainId,
		address: &Address,
	) -> Result<U256, ExecutorError> {
		let pubkey = Self::pubkey_from_address(address, "account")?;
		let lamports = self
			.client
			.get_balance(&pubkey)
			.await
			.map_err(|e| ExecutorError::Network(format!("Failed to get balance: {}", e)))?;
		Ok(U256::from(lamports))
	}

	async fn is_transaction_confirmed(&self, _chain_id: &ChainId, tx_hash: &str) -> bool {
		let Ok(signature) = SolanaSignature::from_str(tx_hash) else {
			return false;
		};
		match self.client.get_signature_statuses(&[signature]).await {
			Ok(response) => response
				.value
				.first()
				.and_then(|status| status.as_ref())
				.map(|status| status.satisfies_commitment(CommitmentConfig::confirmed()))
				.unwrap_or(false),
			Err(_) => false,
		}
	}

	async fn execute_batch_withdraw(
		&self,
		_chain_id: &ChainId,
		withdrawals: &[WithdrawalRequest],
		_wallet_kind: Option<WalletKind>,
	) -> Result<String, ExecutorError> {
		if withdrawals.is_empty() {
			return Err(ExecutorError::Configuration(
				"Empty withdrawal batch".to_string(),
			));
		}

		// One withdraw instruction per intent, all in one transaction
		let mut instructions = Vec::with_capacity(withdrawals.len());
		for withdrawal in withdrawals {
			let route_hash: [u8; 32] = withdrawal.route_hash.0;
			let reward_hash = abi::reward_hash(&withdrawal.reward)?;
			let vault = self.vault_pda(&route_hash);

			let mut data = Vec::new();
			data.extend_from_slice(&WITHDRAW_DISCRIMINATOR);
			data.extend_from_slice(&route_hash);
			data.extend_from_slice(reward_hash.as_slice());

			instructions.push(Instruction {
				program_id: self.portal_program_id,
				accounts: vec![
					AccountMeta::new(vault, false),
					AccountMeta::new(self.keypair.pubkey(), true),
					AccountMeta::new_readonly(system_program::id(), false),
				],
				data,
			});
		}

		let signature = self.send_transaction(instructions).await?;
		Ok(signature.to_string())
	}

	async fn wallet_address(
		&self,
		_chain_id: &ChainId,
		_wallet_kind: Option<WalletKind>,
	) -> Result<String, ExecutorError> {
		Ok(self.keypair.pubkey().to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::MockProverResolver;
	use solver_types::utils::builders::IntentBuilder;

	fn executor() -> SvmExecutor {
		let keypair = Keypair::new();
		SvmExecutor {
			client: RpcClient::new_with_commitment(
				"http://localhost:8899".to_string(),
				CommitmentConfig::confirmed(),
			),
			keypair,
			portal_program_id: Pubkey::new_unique(),
			provers: Arc::new(MockProverResolver::new()),
		}
	}

	#[test]
	fn test_route_encoding_layout() {
		let intent = IntentBuilder::new()
			.destination("solana-mainnet")
			.route_token(Address(vec![0xA1; 32]), U256::from(500u64))
			.build();
		let encoded = SvmExecutor::encode_route(&intent.route).unwrap();

		// salt(32) + deadline(8) + portal(32) + token count(4)
		//   + token(32) + amount(8) + call count(4)
		assert_eq!(encoded.len(), 32 + 8 + 32 + 4 + 32 + 8 + 4);
		assert_eq!(&encoded[..32], intent.route.salt.as_slice());
		assert_eq!(
			u32::from_le_bytes(encoded[72..76].try_into().unwrap()),
			1
		);
		assert_eq!(
			u64::from_le_bytes(encoded[108..116].try_into().unwrap()),
			500
		);
	}

	#[test]
	fn test_route_encoding_rejects_oversized_amount() {
		let intent = IntentBuilder::new()
			.route_token(Address(vec![0xA1; 32]), U256::from(u128::MAX))
			.build();
		assert!(matches!(
			SvmExecutor::encode_route(&intent.route),
			Err(ExecutorError::Configuration(_))
		));
	}

	#[test]
	fn test_ata_derivation_is_deterministic() {
		let owner = Pubkey::new_unique();
		let mint = Pubkey::new_unique();
		let first = SvmExecutor::associated_token_account(&owner, &mint);
		let second = SvmExecutor::associated_token_account(&owner, &mint);
		assert_eq!(first, second);
		assert_ne!(
			first,
			SvmExecutor::associated_token_account(&mint, &owner)
		);
	}

	#[test]
	fn test_fulfill_instruction_data_prefix() {
		let executor = executor();
		let intent = IntentBuilder::new()
			.destination("solana-mainnet")
			.source_chain(1u64)
			.build();
		let instruction = executor
			.fulfill_instruction(&intent, &Address(vec![0x44; 32]), 1, &[0xAB])
			.unwrap();

		assert_eq!(&instruction.data[..8], &FULFILL_AND_PROVE_DISCRIMINATOR);
		assert_eq!(&instruction.data[8..40], intent.intent_hash.as_slice());
		assert_eq!(instruction.accounts.len(), 5);
		assert!(instruction.accounts[3].is_signer);
	}

	#[test]
	fn test_padded_32_widens_evm_address() {
		let padded = SvmExecutor::padded_32(&Address(vec![0xEE; 20]));
		assert_eq!(&padded[..12], &[0u8; 12]);
		assert_eq!(&padded[12..], &[0xEE; 20]);
	}
}
