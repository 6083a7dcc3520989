//! Wallet construction and caching.
//!
//! One wallet instance exists per `(chain, kind)` pair. Construction is
//! memoized through an in-flight cell so concurrent first uses share a
//! single initialization, which matters for kernel wallets whose init may
//! deploy a contract.

use crate::{
	implementations::{basic::BasicWallet, kernel::KernelWallet},
	WalletError, WalletInterface,
};
use solver_account::AccountInterface;
use solver_delivery::DeliveryService;
use solver_types::{ChainFamily, ChainId, NetworkConfig, NetworksConfig, WalletKind};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

type WalletCell = Arc<OnceCell<Arc<dyn WalletInterface>>>;

/// Hands out cached per-chain wallet instances.
pub struct WalletManager {
	networks: NetworksConfig,
	account: Arc<dyn AccountInterface>,
	delivery: Arc<DeliveryService>,
	executor_signature_expiration_seconds: u64,
	cells: Mutex<HashMap<(u64, WalletKind), WalletCell>>,
}

impl WalletManager {
	pub fn new(
		networks: NetworksConfig,
		account: Arc<dyn AccountInterface>,
		delivery: Arc<DeliveryService>,
		executor_signature_expiration_seconds: u64,
	) -> Self {
		Self {
			networks,
			account,
			delivery,
			executor_signature_expiration_seconds,
			cells: Mutex::new(HashMap::new()),
		}
	}

	/// Returns the wallet for a chain, constructing it on first use.
	///
	/// `kind` defaults to the basic signer wallet.
	pub async fn wallet(
		&self,
		chain_id: u64,
		kind: Option<WalletKind>,
	) -> Result<Arc<dyn WalletInterface>, WalletError> {
		let kind = kind.unwrap_or(WalletKind::Basic);
		let cell = {
			let mut cells = self.cells.lock().expect("wallet cache poisoned");
			cells.entry((chain_id, kind)).or_default().clone()
		};

		cell.get_or_try_init(|| self.build(chain_id, kind))
			.await
			.cloned()
	}

	fn network(&self, chain_id: u64) -> Result<&NetworkConfig, WalletError> {
		self.networks.get(&ChainId::from(chain_id)).ok_or_else(|| {
			WalletError::Configuration(format!("No network configured for chain {}", chain_id))
		})
	}

	async fn build(
		&self,
		chain_id: u64,
		kind: WalletKind,
	) -> Result<Arc<dyn WalletInterface>, WalletError> {
		let network = self.network(chain_id)?;
		let multicall = match &network.multicall_address {
			Some(address) => Some(address.as_evm().ok_or_else(|| {
				WalletError::Configuration(format!(
					"Multicall address for chain {} is not a 20-byte address",
					chain_id
				))
			})?),
			None => None,
		};

		let basic = Arc::new(BasicWallet::new(
			chain_id,
			multicall,
			self.account.clone(),
			self.delivery.clone(),
		));

		match kind {
			WalletKind::Basic => Ok(basic as Arc<dyn WalletInterface>),
			WalletKind::Kernel => {
				if network.family != ChainFamily::Evm {
					return Err(WalletError::Configuration(format!(
						"Kernel wallets require an EVM chain, chain {} is {}",
						chain_id, network.family
					)));
				}
				let kernel_config = network.kernel.as_ref().ok_or_else(|| {
					WalletError::Configuration(format!(
						"No kernel configuration for chain {}",
						chain_id
					))
				})?;
				let executor_module = match &network.executor_module_address {
					Some(address) => Some(address.as_evm().ok_or_else(|| {
						WalletError::Configuration(format!(
							"Executor module address for chain {} is not a 20-byte address",
							chain_id
						))
					})?),
					None => None,
				};

				let kernel = KernelWallet::new(
					chain_id,
					kernel_config,
					executor_module,
					self.executor_signature_expiration_seconds,
					self.account.clone(),
					self.delivery.clone(),
					basic,
				)?;
				kernel.init().await?;
				Ok(Arc::new(kernel) as Arc<dyn WalletInterface>)
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use solver_account::MockAccountInterface;
	use solver_delivery::MockDeliveryInterface;
	use solver_types::utils::builders::NetworkConfigBuilder;

	fn manager() -> WalletManager {
		let mut networks = NetworksConfig::new();
		networks.insert(ChainId::from(10u64), NetworkConfigBuilder::evm().build());

		let mut chains = HashMap::new();
		chains.insert(10u64, ChainFamily::Evm);
		let mut by_family: HashMap<ChainFamily, Arc<dyn solver_delivery::DeliveryInterface>> =
			HashMap::new();
		by_family.insert(
			ChainFamily::Evm,
			Arc::new(MockDeliveryInterface::new()) as Arc<dyn solver_delivery::DeliveryInterface>,
		);
		let delivery = Arc::new(DeliveryService::new(chains, by_family, 1, 60));

		WalletManager::new(networks, Arc::new(MockAccountInterface::new()), delivery, 300)
	}

	#[tokio::test]
	async fn test_same_key_returns_cached_instance() {
		let manager = manager();
		let first = manager.wallet(10, Some(WalletKind::Basic)).await.unwrap();
		let second = manager.wallet(10, None).await.unwrap();
		assert!(Arc::ptr_eq(&first, &second));
	}

	#[tokio::test]
	async fn test_unknown_chain_is_config_error() {
		let manager = manager();
		let err = manager.wallet(999, None).await.expect_err("must fail");
		assert!(matches!(err, WalletError::Configuration(_)));
	}

	#[tokio::test]
	async fn test_kernel_without_config_is_config_error() {
		let manager = manager();
		let err = manager
			.wallet(10, Some(WalletKind::Kernel))
			.await
			.expect_err("must fail");
		assert!(matches!(err, WalletError::Configuration(_)));
	}
}
