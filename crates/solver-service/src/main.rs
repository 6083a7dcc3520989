//! Main entry point for the intent execution service.
//!
//! This binary wires the execution engine together: account, delivery,
//! wallet manager, chain executors, executor registry, and the scheduler
//! that consumes execution jobs. It runs until interrupted.

use clap::Parser;
use solver_account::implementations::local::create_account;
use solver_account::AccountInterface;
use solver_config::Config;
use solver_delivery::implementations::evm::alloy::AlloyDelivery;
use solver_delivery::implementations::tvm::http::TronHttpDelivery;
use solver_delivery::{DeliveryInterface, DeliveryService};
use solver_executor::implementations::evm::EvmExecutor;
use solver_executor::implementations::svm::SvmExecutor;
use solver_executor::implementations::tvm::TvmExecutor;
use solver_executor::state::InMemoryIntentState;
use solver_executor::{ExecutorInterface, ExecutorRegistry, ProverInterface, ProverResolver};
use solver_scheduler::Scheduler;
use solver_types::{Address, ChainExecutionJob, ChainFamily, ChainId};
use solver_wallet::WalletManager;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Command-line arguments for the execution service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long)]
	config: PathBuf,

	/// Path to a JSON-encoded execution job to enqueue at startup
	///
	/// Intended for demos and smoke tests; production jobs arrive through
	/// the scheduler's intake handle.
	#[arg(long)]
	job: Option<PathBuf>,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Prover lookup used until prover integrations are registered.
///
/// Every lookup misses, so intents whose reward names a prover fail with
/// `ProverNotFound` instead of executing without a proof.
struct NoProvers;

impl ProverResolver for NoProvers {
	fn prover(
		&self,
		_source_chain_id: &ChainId,
		_prover_address: &Address,
	) -> Option<Arc<dyn ProverInterface>> {
		None
	}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started solver");

	let config = Config::from_file(
		args.config
			.to_str()
			.ok_or("Configuration path is not valid UTF-8")?,
	)
	.await?;
	tracing::info!("Loaded configuration [{}]", config.solver.id);

	// Account
	let account_config = config
		.account
		.implementations
		.get(&config.account.primary)
		.ok_or("Primary account implementation missing")?;
	let account: Arc<dyn AccountInterface> = Arc::from(create_account(account_config)?);
	let signer = account.signer();

	// Delivery: one implementation per chain family, routed per chain
	let mut delivery_by_family: HashMap<ChainFamily, Arc<dyn DeliveryInterface>> = HashMap::new();
	let families: Vec<ChainFamily> = config.networks.values().map(|n| n.family).collect();

	if families.contains(&ChainFamily::Evm) {
		let evm = AlloyDelivery::new(&config.networks, signer.clone()).await?;
		delivery_by_family.insert(ChainFamily::Evm, Arc::new(evm));
	}
	if families.contains(&ChainFamily::Tvm) {
		let tvm = TronHttpDelivery::new(&config.networks, account.clone())?;
		delivery_by_family.insert(ChainFamily::Tvm, Arc::new(tvm));
	}

	let chains: HashMap<u64, ChainFamily> = config
		.networks
		.iter()
		.filter_map(|(chain_id, network)| chain_id.as_u64().map(|id| (id, network.family)))
		.collect();
	let delivery = Arc::new(DeliveryService::new(
		chains,
		delivery_by_family,
		config.delivery.min_confirmations,
		config.delivery.transaction_timeout_seconds,
	));

	// Wallets
	let wallets = Arc::new(WalletManager::new(
		config.networks.clone(),
		account.clone(),
		delivery.clone(),
		config.wallet.executor_signature_expiration_seconds,
	));

	// Executors per chain family
	let provers: Arc<dyn ProverResolver> = Arc::new(NoProvers);
	let mut executors_by_family: HashMap<ChainFamily, Arc<dyn ExecutorInterface>> = HashMap::new();

	if families.contains(&ChainFamily::Evm) {
		executors_by_family.insert(
			ChainFamily::Evm,
			Arc::new(EvmExecutor::new(
				config.networks.clone(),
				wallets.clone(),
				delivery.clone(),
				provers.clone(),
			)),
		);
	}
	if families.contains(&ChainFamily::Tvm) {
		executors_by_family.insert(
			ChainFamily::Tvm,
			Arc::new(TvmExecutor::new(
				config.networks.clone(),
				wallets.clone(),
				delivery.clone(),
				provers.clone(),
			)),
		);
	}
	if let Some((chain_id, network)) = config
		.networks
		.iter()
		.find(|(_, network)| network.family == ChainFamily::Svm)
	{
		// The SVM keypair lives in its own account entry; without it the
		// family is skipped, not an error
		match svm_secret_key(&config) {
			Some(secret_key) => {
				let rpc_url = network
					.get_http_url()
					.ok_or_else(|| format!("No RPC URL for SVM network {}", chain_id))?;
				let svm = SvmExecutor::new(
					rpc_url,
					&secret_key,
					&network.portal_address,
					provers.clone(),
				)?;
				executors_by_family.insert(ChainFamily::Svm, Arc::new(svm));
			},
			None => {
				tracing::warn!(
					chain_id = %chain_id,
					"SVM network configured without an svm account entry, skipping family"
				);
			},
		}
	}

	// Registry and scheduler
	let state = Arc::new(InMemoryIntentState::new());
	let registry = Arc::new(ExecutorRegistry::register_all(
		&config.networks,
		executors_by_family,
		state.clone(),
	));
	tracing::info!(chains = ?registry.supported_chains(), "Executor registry ready");

	let scheduler = Scheduler::new(registry, state, config.scheduler.clone());
	let intake = scheduler.handle();

	if let Some(path) = &args.job {
		let payload = tokio::fs::read_to_string(path).await?;
		let job: ChainExecutionJob = serde_json::from_str(&payload)?;
		tracing::info!(destination = %job.destination_chain_id, "Enqueuing job from file");
		intake.enqueue(job)?;
	}

	tokio::select! {
		_ = scheduler.run() => {
			tracing::info!("Scheduler stopped");
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("Received shutdown signal");
		}
	}

	Ok(())
}

/// Base58 secret key from the `svm` account entry, when configured.
fn svm_secret_key(config: &Config) -> Option<String> {
	config
		.account
		.implementations
		.get("svm")
		.and_then(|value| value.get("secret_key"))
		.and_then(|value| value.as_str())
		.map(|value| value.to_string())
}
