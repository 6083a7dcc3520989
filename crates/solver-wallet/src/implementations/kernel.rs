//! ERC-7579 kernel smart-account wallet.
//!
//! The solver's signer owns a counterfactual kernel account. `init` derives
//! the account address, deploys it through the factory on first use, and
//! optionally installs an executor module. Batches go through the account's
//! `execute(mode, payload)` entry point, either sent by the signer directly
//! or relayed through the executor module with a signed digest.

use crate::{
	implementations::basic::BasicWallet,
	mode::{encode_mode, encode_payload, ExecMode},
	validate_targets, ContractCall, WalletError, WalletInterface, WriteContractsOptions,
};
use alloy_primitives::{aliases::U192, keccak256, Address as AlloyAddress, Bytes, B256, U256};
use alloy_sol_types::{sol, SolCall, SolValue};
use async_trait::async_trait;
use solver_account::AccountInterface;
use solver_delivery::DeliveryService;
use solver_types::{Address, KernelConfig, Transaction, TransactionHash};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::OnceCell;

/// ERC-7579 module type id for executors.
const MODULE_TYPE_EXECUTOR: U256 = U256::from_limbs([2, 0, 0, 0]);

mod account_abi {
	use alloy_sol_types::sol;

	sol! {
		function createAccount(address owner, bytes32 salt) external payable returns (address);
		function execute(bytes32 execMode, bytes calldata executionCalldata) external payable;
		function isModuleInstalled(uint256 moduleTypeId, address module, bytes calldata additionalContext) external view returns (bool);
		function installModule(uint256 moduleTypeId, address module, bytes calldata initData) external payable;
	}
}

mod module_abi {
	use alloy_sol_types::sol;

	sol! {
		function getNonce(address account, uint192 key) external view returns (uint256);
		function execute(address account, bytes32 execMode, bytes calldata executionCalldata, uint256 nonce, uint256 expiration, bytes calldata signature) external payable;
	}
}

/// Resolved account state, filled in once by `init`.
struct KernelState {
	account_address: AlloyAddress,
	executor_installed: bool,
}

/// Smart-account wallet backed by a kernel account.
pub struct KernelWallet {
	chain_id: u64,
	factory: AlloyAddress,
	init_code_hash: B256,
	executor_module: Option<AlloyAddress>,
	signature_expiration_seconds: u64,
	account: Arc<dyn AccountInterface>,
	delivery: Arc<DeliveryService>,
	/// Signer-path submission and deployment transactions go through here.
	basic: Arc<BasicWallet>,
	state: OnceCell<KernelState>,
}

impl KernelWallet {
	pub fn new(
		chain_id: u64,
		config: &KernelConfig,
		executor_module: Option<AlloyAddress>,
		signature_expiration_seconds: u64,
		account: Arc<dyn AccountInterface>,
		delivery: Arc<DeliveryService>,
		basic: Arc<BasicWallet>,
	) -> Result<Self, WalletError> {
		let factory = config.factory_address.as_evm().ok_or_else(|| {
			WalletError::Configuration(format!(
				"Kernel factory for chain {} is not a 20-byte address",
				chain_id
			))
		})?;

		Ok(Self {
			chain_id,
			factory,
			init_code_hash: config.init_code_hash,
			executor_module,
			signature_expiration_seconds,
			account,
			delivery,
			basic,
			state: OnceCell::new(),
		})
	}

	/// Initializes the account handle.
	///
	/// Concurrent first calls are single-flighted; only one deployment
	/// sequence ever runs.
	pub async fn init(&self) -> Result<(), WalletError> {
		self.state
			.get_or_try_init(|| self.build_state())
			.await
			.map(|_| ())
	}

	fn state(&self) -> Result<&KernelState, WalletError> {
		self.state.get().ok_or_else(|| {
			WalletError::NotInitialized(format!(
				"Kernel wallet for chain {} used before init()",
				self.chain_id
			))
		})
	}

	async fn build_state(&self) -> Result<KernelState, WalletError> {
		let owner_address = self
			.account
			.address()
			.await
			.map_err(|e| WalletError::Signing(e.to_string()))?;
		let owner = owner_address.as_evm().ok_or_else(|| {
			WalletError::Configuration("Signer address is not a 20-byte address".to_string())
		})?;

		// Counterfactual address: CREATE2 from the factory with a salt
		// derived from the owner
		let salt = keccak256(owner.as_slice());
		let account_address = self.factory.create2(salt, self.init_code_hash);

		self.ensure_deployed(account_address, owner, salt).await?;

		let executor_installed = match self.executor_module {
			Some(module) => self.ensure_module(account_address, owner, module).await?,
			None => false,
		};

		tracing::info!(
			chain_id = self.chain_id,
			account = %account_address,
			executor_installed = executor_installed,
			"Kernel account ready"
		);

		Ok(KernelState {
			account_address,
			executor_installed,
		})
	}

	/// Deploys the account through the factory if no code exists yet.
	async fn ensure_deployed(
		&self,
		account_address: AlloyAddress,
		owner: AlloyAddress,
		salt: B256,
	) -> Result<(), WalletError> {
		let code = self
			.delivery
			.get_code(&Address(account_address.to_vec()), self.chain_id)
			.await?;
		if !code.is_empty() {
			return Ok(());
		}

		tracing::info!(
			chain_id = self.chain_id,
			account = %account_address,
			"Deploying kernel account"
		);

		let data = account_abi::createAccountCall { owner, salt }.abi_encode();
		let hash = self
			.basic
			.write_contract(ContractCall::new(
				Address(self.factory.to_vec()),
				data,
				U256::ZERO,
			))
			.await?;

		let receipt = self
			.delivery
			.wait_for_confirmation(&hash, self.chain_id, None)
			.await?;
		if !receipt.success {
			return Err(WalletError::TransactionFailed(format!(
				"Kernel account deployment reverted in tx {}",
				hash
			)));
		}
		Ok(())
	}

	/// Installs the executor module unless the account already has it.
	///
	/// Read errors on the install check count as "not installed".
	async fn ensure_module(
		&self,
		account_address: AlloyAddress,
		owner: AlloyAddress,
		module: AlloyAddress,
	) -> Result<bool, WalletError> {
		let check = account_abi::isModuleInstalledCall {
			moduleTypeId: MODULE_TYPE_EXECUTOR,
			module,
			additionalContext: Bytes::new(),
		}
		.abi_encode();

		let installed = match self
			.delivery
			.call(Transaction::call(
				Address(account_address.to_vec()),
				check,
				U256::ZERO,
				self.chain_id,
			))
			.await
		{
			Ok(result) => result.last().copied() == Some(1),
			Err(e) => {
				tracing::debug!(
					chain_id = self.chain_id,
					module = %module,
					error = %e,
					"Module install check failed, treating as not installed"
				);
				false
			},
		};
		if installed {
			return Ok(true);
		}

		tracing::info!(
			chain_id = self.chain_id,
			account = %account_address,
			module = %module,
			"Installing executor module"
		);

		let data = account_abi::installModuleCall {
			moduleTypeId: MODULE_TYPE_EXECUTOR,
			module,
			initData: owner.abi_encode().into(),
		}
		.abi_encode();

		let hash = self
			.basic
			.write_contract(ContractCall::new(
				Address(account_address.to_vec()),
				data,
				U256::ZERO,
			))
			.await?;

		let receipt = self
			.delivery
			.wait_for_confirmation(&hash, self.chain_id, None)
			.await?;
		if !receipt.success {
			return Err(WalletError::TransactionFailed(format!(
				"Executor module install reverted in tx {}",
				hash
			)));
		}
		Ok(true)
	}

	/// Reads the executor module nonce for this account (nonce key 0).
	async fn module_nonce(
		&self,
		module: AlloyAddress,
		account_address: AlloyAddress,
	) -> Result<U256, WalletError> {
		let data = module_abi::getNonceCall {
			account: account_address,
			key: U192::ZERO,
		}
		.abi_encode();

		let result = self
			.delivery
			.call(Transaction::call(
				Address(module.to_vec()),
				data,
				U256::ZERO,
				self.chain_id,
			))
			.await?;
		if result.len() < 32 {
			return Err(WalletError::TransactionFailed(
				"Invalid nonce response from executor module".to_string(),
			));
		}
		Ok(U256::from_be_slice(&result[..32]))
	}

	/// Submits a batch through the executor module with a signed digest.
	async fn submit_via_executor(
		&self,
		state: &KernelState,
		mode: B256,
		payload: Vec<u8>,
		value: U256,
	) -> Result<TransactionHash, WalletError> {
		let module = self.executor_module.ok_or_else(|| {
			WalletError::Configuration("Executor path requires a module address".to_string())
		})?;

		let nonce = self.module_nonce(module, state.account_address).await?;
		let now = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map_err(|e| WalletError::Signing(e.to_string()))?
			.as_secs();
		let expiration = U256::from(now + self.signature_expiration_seconds);

		// The module recomputes this digest on-chain before executing
		let digest = keccak256(
			(
				state.account_address,
				mode,
				Bytes::from(payload.clone()),
				nonce,
				expiration,
				U256::from(self.chain_id),
			)
				.abi_encode(),
		);
		let signature = self
			.account
			.sign_hash(&digest)
			.await
			.map_err(|e| WalletError::Signing(e.to_string()))?;

		let data = module_abi::executeCall {
			account: state.account_address,
			execMode: mode,
			executionCalldata: payload.into(),
			nonce,
			expiration,
			signature: signature.0.into(),
		}
		.abi_encode();

		self.basic
			.write_contract(ContractCall::new(Address(module.to_vec()), data, value))
			.await
	}

	/// Submits a batch from the signer straight to the account.
	async fn submit_via_signer(
		&self,
		state: &KernelState,
		mode: B256,
		payload: Vec<u8>,
		value: U256,
	) -> Result<TransactionHash, WalletError> {
		let data = account_abi::executeCall {
			execMode: mode,
			executionCalldata: payload.into(),
		}
		.abi_encode();

		self.basic
			.write_contract(ContractCall::new(
				Address(state.account_address.to_vec()),
				data,
				value,
			))
			.await
	}
}

#[async_trait]
impl WalletInterface for KernelWallet {
	async fn address(&self) -> Result<Address, WalletError> {
		Ok(Address(self.state()?.account_address.to_vec()))
	}

	async fn write_contract(&self, call: ContractCall) -> Result<TransactionHash, WalletError> {
		let mut hashes = self
			.write_contracts(vec![call], WriteContractsOptions::default())
			.await?;
		hashes
			.pop()
			.ok_or_else(|| WalletError::TransactionFailed("No transaction submitted".to_string()))
	}

	async fn write_contracts(
		&self,
		calls: Vec<ContractCall>,
		options: WriteContractsOptions,
	) -> Result<Vec<TransactionHash>, WalletError> {
		let state = self.state()?;
		if calls.is_empty() {
			return Err(WalletError::EmptyBatch);
		}
		validate_targets(&calls)?;
		if options.keep_sender {
			tracing::debug!(
				chain_id = self.chain_id,
				"keep_sender has no effect on kernel wallets"
			);
		}

		let mode = ExecMode::for_calls(calls.len());
		let packed_mode = encode_mode(&mode);
		let payload = encode_payload(&mode, &calls);
		let total: U256 = calls.iter().map(|call| call.value).sum();
		let value = options.value.unwrap_or(total);

		let hash = if state.executor_installed {
			self.submit_via_executor(state, packed_mode, payload, value)
				.await?
		} else {
			self.submit_via_signer(state, packed_mode, payload, value)
				.await?
		};
		Ok(vec![hash])
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use solver_account::MockAccountInterface;
	use solver_delivery::{DeliveryError, MockDeliveryInterface};
	use solver_types::{ChainFamily, Signature, TransactionReceipt};
	use std::collections::HashMap;
	use std::sync::Mutex;

	const CHAIN: u64 = 10;
	const OWNER: [u8; 20] = [0x11; 20];

	fn kernel_config() -> KernelConfig {
		KernelConfig {
			factory_address: Address(vec![0xFA; 20]),
			init_code_hash: B256::from([0x55; 32]),
		}
	}

	fn service(mock: MockDeliveryInterface) -> Arc<DeliveryService> {
		let mut chains = HashMap::new();
		chains.insert(CHAIN, ChainFamily::Evm);
		let mut by_family: HashMap<ChainFamily, Arc<dyn solver_delivery::DeliveryInterface>> =
			HashMap::new();
		by_family.insert(ChainFamily::Evm, Arc::new(mock));
		Arc::new(DeliveryService::new(chains, by_family, 1, 60))
	}

	fn account() -> Arc<MockAccountInterface> {
		let mut account = MockAccountInterface::new();
		account
			.expect_address()
			.returning(|| Ok(Address(OWNER.to_vec())));
		account
			.expect_sign_hash()
			.returning(|_| Ok(Signature(vec![0x77; 65])));
		Arc::new(account)
	}

	fn wallet(mock: MockDeliveryInterface, module: Option<AlloyAddress>) -> KernelWallet {
		let delivery = service(mock);
		let account = account();
		let basic = Arc::new(BasicWallet::new(
			CHAIN,
			None,
			account.clone(),
			delivery.clone(),
		));
		KernelWallet::new(
			CHAIN,
			&kernel_config(),
			module,
			300,
			account,
			delivery,
			basic,
		)
		.unwrap()
	}

	fn expected_account_address() -> AlloyAddress {
		let owner = AlloyAddress::from_slice(&OWNER);
		let factory = AlloyAddress::from_slice(&[0xFA; 20]);
		factory.create2(keccak256(owner.as_slice()), B256::from([0x55; 32]))
	}

	fn call(target_byte: u8, value: u64) -> ContractCall {
		ContractCall::new(
			Address(vec![target_byte; 20]),
			vec![target_byte],
			U256::from(value),
		)
	}

	#[tokio::test]
	async fn test_write_before_init_fails() {
		let mut mock = MockDeliveryInterface::new();
		mock.expect_submit().times(0);
		let wallet = wallet(mock, None);

		let err = wallet
			.write_contracts(vec![call(0xAA, 0)], WriteContractsOptions::default())
			.await
			.expect_err("must fail");
		assert!(matches!(err, WalletError::NotInitialized(_)));
	}

	#[tokio::test]
	async fn test_init_skips_deploy_when_code_present() {
		let mut mock = MockDeliveryInterface::new();
		mock.expect_get_code().times(1).returning(|_, _| Ok(vec![0x60]));
		mock.expect_submit().times(0);
		let wallet = wallet(mock, None);

		wallet.init().await.unwrap();
		assert_eq!(
			wallet.address().await.unwrap().0,
			expected_account_address().to_vec()
		);
	}

	#[tokio::test]
	async fn test_init_deploys_via_factory() {
		let mut mock = MockDeliveryInterface::new();
		mock.expect_get_code().times(1).returning(|_, _| Ok(vec![]));
		mock.expect_submit()
			.times(1)
			.withf(|tx| tx.to.as_ref().unwrap().0 == vec![0xFA; 20])
			.returning(|_| Ok(TransactionHash(vec![0x01; 32])));
		mock.expect_wait_for_confirmation()
			.times(1)
			.returning(|hash, _, _, _| {
				Ok(TransactionReceipt {
					hash: hash.clone(),
					block_number: 1,
					success: true,
				})
			});
		let wallet = wallet(mock, None);

		wallet.init().await.unwrap();
	}

	#[tokio::test]
	async fn test_failed_deploy_is_fatal() {
		let mut mock = MockDeliveryInterface::new();
		mock.expect_get_code().times(1).returning(|_, _| Ok(vec![]));
		mock.expect_submit()
			.times(1)
			.returning(|_| Ok(TransactionHash(vec![0x01; 32])));
		mock.expect_wait_for_confirmation()
			.times(1)
			.returning(|hash, _, _, _| {
				Ok(TransactionReceipt {
					hash: hash.clone(),
					block_number: 1,
					success: false,
				})
			});
		let wallet = wallet(mock, None);

		let err = wallet.init().await.expect_err("must fail");
		assert!(matches!(err, WalletError::TransactionFailed(_)));
	}

	#[tokio::test]
	async fn test_no_module_uses_signer_path() {
		let submitted = Arc::new(Mutex::new(Vec::new()));
		let captured = submitted.clone();

		let mut mock = MockDeliveryInterface::new();
		mock.expect_get_code().returning(|_, _| Ok(vec![0x60]));
		mock.expect_submit().times(1).returning(move |tx| {
			captured.lock().unwrap().push(tx);
			Ok(TransactionHash(vec![0x02; 32]))
		});
		let wallet = wallet(mock, None);
		wallet.init().await.unwrap();

		wallet
			.write_contracts(
				vec![call(0xAA, 3), call(0xBB, 4)],
				WriteContractsOptions::default(),
			)
			.await
			.unwrap();

		let submitted = submitted.lock().unwrap();
		let tx = &submitted[0];
		// Targets the account itself with execute(mode, payload)
		assert_eq!(tx.to.as_ref().unwrap().0, expected_account_address().to_vec());
		assert_eq!(&tx.data[..4], account_abi::executeCall::SELECTOR.as_slice());
		assert_eq!(tx.value, U256::from(7));

		let decoded = account_abi::executeCall::abi_decode(&tx.data, true).unwrap();
		assert_eq!(decoded.execMode[0], 0x01);
	}

	#[tokio::test]
	async fn test_module_read_error_counts_as_not_installed() {
		let mut mock = MockDeliveryInterface::new();
		mock.expect_get_code().returning(|_, _| Ok(vec![0x60]));
		// isModuleInstalled read fails; install must follow
		mock.expect_call()
			.times(1)
			.returning(|_| Err(DeliveryError::Network("execution reverted".to_string())));
		mock.expect_submit()
			.times(1)
			.withf(|tx| {
				tx.data.starts_with(account_abi::installModuleCall::SELECTOR.as_slice())
			})
			.returning(|_| Ok(TransactionHash(vec![0x03; 32])));
		mock.expect_wait_for_confirmation()
			.times(1)
			.returning(|hash, _, _, _| {
				Ok(TransactionReceipt {
					hash: hash.clone(),
					block_number: 1,
					success: true,
				})
			});
		let wallet = wallet(mock, Some(AlloyAddress::from_slice(&[0xE0; 20])));

		wallet.init().await.unwrap();
	}

	#[tokio::test]
	async fn test_installed_module_uses_executor_path() {
		let submitted = Arc::new(Mutex::new(Vec::new()));
		let captured = submitted.clone();
		let module = AlloyAddress::from_slice(&[0xE0; 20]);

		let mut mock = MockDeliveryInterface::new();
		mock.expect_get_code().returning(|_, _| Ok(vec![0x60]));
		// First read: isModuleInstalled -> true; second: getNonce -> 5
		mock.expect_call()
			.withf(|tx| {
				tx.data
					.starts_with(account_abi::isModuleInstalledCall::SELECTOR.as_slice())
			})
			.times(1)
			.returning(|_| {
				let mut out = vec![0u8; 32];
				out[31] = 1;
				Ok(out)
			});
		mock.expect_call()
			.withf(|tx| tx.data.starts_with(module_abi::getNonceCall::SELECTOR.as_slice()))
			.times(1)
			.returning(|_| Ok(U256::from(5).to_be_bytes::<32>().to_vec()));
		mock.expect_submit().times(1).returning(move |tx| {
			captured.lock().unwrap().push(tx);
			Ok(TransactionHash(vec![0x04; 32]))
		});
		let wallet = wallet(mock, Some(module));
		wallet.init().await.unwrap();

		wallet
			.write_contracts(vec![call(0xAA, 9)], WriteContractsOptions::default())
			.await
			.unwrap();

		let submitted = submitted.lock().unwrap();
		let tx = &submitted[0];
		assert_eq!(tx.to.as_ref().unwrap().0, module.to_vec());
		assert_eq!(&tx.data[..4], module_abi::executeCall::SELECTOR.as_slice());

		let decoded = module_abi::executeCall::abi_decode(&tx.data, true).unwrap();
		assert_eq!(decoded.account, expected_account_address());
		assert_eq!(decoded.nonce, U256::from(5));
		assert_eq!(decoded.signature.as_ref(), &[0x77; 65]);
		assert_eq!(decoded.execMode[0], 0x00);
	}

	#[tokio::test]
	async fn test_empty_batch_is_precondition_violation() {
		let mut mock = MockDeliveryInterface::new();
		mock.expect_get_code().returning(|_, _| Ok(vec![0x60]));
		mock.expect_submit().times(0);
		let wallet = wallet(mock, None);
		wallet.init().await.unwrap();

		let err = wallet
			.write_contracts(Vec::new(), WriteContractsOptions::default())
			.await
			.expect_err("must fail");
		assert!(matches!(err, WalletError::EmptyBatch));
	}
}
