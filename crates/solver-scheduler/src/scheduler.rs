//! Job scheduler with per-chain serialization and bounded parallelism.
//!
//! Jobs for the same destination chain must never overlap: they share a
//! wallet and its nonce sequence. Jobs for distinct chains are independent
//! and run concurrently up to a global worker limit. Ordering is enforced
//! with chained completion markers: each dispatched job installs a fresh
//! marker for its chain key and awaits the marker it displaced, which gives
//! strict FIFO per key without holding a lock across the execution.

use crate::backoff;
use crate::SchedulerError;
use solver_config::SchedulerConfig;
use solver_executor::{ExecutorError, ExecutorRegistry, IntentStateInterface};
use solver_types::{truncate_id, ChainExecutionJob, IntentStatus};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Semaphore};

/// In-flight completion marker for one chain key.
///
/// The map entry holds the receiver; the job that installed the marker
/// holds the sender and resolves it when its work completes, success or
/// failure. The `id` lets the owner clean up the entry only when no later
/// job has displaced it.
struct ChainMarker {
	id: u64,
	done: oneshot::Receiver<()>,
}

struct SchedulerInner {
	registry: Arc<ExecutorRegistry>,
	state: Arc<dyn IntentStateInterface>,
	config: SchedulerConfig,
	markers: Mutex<HashMap<String, ChainMarker>>,
	semaphore: Arc<Semaphore>,
	marker_seq: AtomicU64,
	/// Retries re-enter the queue through the same intake channel.
	retry_tx: mpsc::UnboundedSender<ChainExecutionJob>,
}

/// Cloneable intake handle for producers.
#[derive(Clone)]
pub struct SchedulerHandle {
	tx: mpsc::UnboundedSender<ChainExecutionJob>,
}

impl SchedulerHandle {
	/// Enqueues a job for execution.
	pub fn enqueue(&self, job: ChainExecutionJob) -> Result<(), SchedulerError> {
		self.tx.send(job).map_err(|_| SchedulerError::QueueClosed)
	}
}

/// Consumes the inbound job queue and drives intent execution.
pub struct Scheduler {
	inner: Arc<SchedulerInner>,
	intake_rx: mpsc::UnboundedReceiver<ChainExecutionJob>,
	intake_tx: mpsc::UnboundedSender<ChainExecutionJob>,
}

impl Scheduler {
	pub fn new(
		registry: Arc<ExecutorRegistry>,
		state: Arc<dyn IntentStateInterface>,
		config: SchedulerConfig,
	) -> Self {
		let (intake_tx, intake_rx) = mpsc::unbounded_channel();
		let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
		let inner = Arc::new(SchedulerInner {
			registry,
			state,
			config,
			markers: Mutex::new(HashMap::new()),
			semaphore,
			marker_seq: AtomicU64::new(1),
			retry_tx: intake_tx.clone(),
		});
		Self {
			inner,
			intake_rx,
			intake_tx,
		}
	}

	/// Intake handle for job producers.
	pub fn handle(&self) -> SchedulerHandle {
		SchedulerHandle {
			tx: self.intake_tx.clone(),
		}
	}

	/// Runs the dispatch loop until the intake channel closes.
	///
	/// Markers are installed here, in receive order, so same-key jobs run
	/// in enqueue order; the jobs themselves run in spawned tasks.
	pub async fn run(mut self) {
		tracing::info!(
			concurrency = self.inner.config.concurrency,
			max_attempts = self.inner.config.max_attempts,
			"Scheduler running"
		);
		while let Some(job) = self.intake_rx.recv().await {
			let inner = self.inner.clone();
			let key = job.destination_chain_id.key();
			let marker_id = inner.marker_seq.fetch_add(1, Ordering::Relaxed);
			let (done_tx, done_rx) = oneshot::channel();
			let prior = {
				let mut markers = inner.markers.lock().expect("marker map poisoned");
				markers.insert(
					key.clone(),
					ChainMarker {
						id: marker_id,
						done: done_rx,
					},
				)
			};
			tokio::spawn(async move {
				inner.run_job(job, key, marker_id, prior, done_tx).await;
			});
		}
		tracing::info!("Scheduler intake closed, stopping");
	}
}

impl SchedulerInner {
	async fn run_job(
		self: Arc<Self>,
		job: ChainExecutionJob,
		key: String,
		marker_id: u64,
		prior: Option<ChainMarker>,
		done_tx: oneshot::Sender<()>,
	) {
		// FIFO suspension point: wait for the displaced job to finish.
		// A dropped sender counts as finished.
		if let Some(prior) = prior {
			let _ = prior.done.await;
		}

		// Pool permit acquired after marker resolution so a queued job
		// waiting on its chain does not occupy a worker slot
		let retry = match self.semaphore.clone().acquire_owned().await {
			Ok(_permit) => self.attempt(job).await,
			Err(_) => None,
		};

		let _ = done_tx.send(());
		{
			let mut markers = self.markers.lock().expect("marker map poisoned");
			if markers.get(&key).is_some_and(|marker| marker.id == marker_id) {
				markers.remove(&key);
			}
		}

		// The marker is released before the backoff sleep; later jobs on
		// the chain are not blocked behind a waiting retry
		if let Some((job, delay)) = retry {
			let retry_tx = self.retry_tx.clone();
			tokio::spawn(async move {
				tokio::time::sleep(delay).await;
				if retry_tx.send(job).is_err() {
					tracing::warn!("Intake closed, dropping retry");
				}
			});
		}
	}

	/// Runs one attempt; returns the follow-up job and its delay when the
	/// attempt failed retryably and attempts remain.
	async fn attempt(
		&self,
		mut job: ChainExecutionJob,
	) -> Option<(ChainExecutionJob, Duration)> {
		let intent_hash = job.intent.intent_hash;

		// A previous attempt may have confirmed after its wait timed out;
		// resubmitting would double-fulfill
		if job.attempt > 1 {
			if let Some(tx_hash) = job.last_tx_hash.clone() {
				if self
					.registry
					.is_transaction_confirmed(&job.destination_chain_id, &tx_hash)
					.await
				{
					tracing::info!(
						intent_hash = %truncate_id(&intent_hash.to_string()),
						tx_hash = %truncate_id(&tx_hash),
						"Previous attempt confirmed late, skipping resubmission"
					);
					if let Err(e) = self
						.state
						.update_status(&intent_hash, IntentStatus::Fulfilled)
						.await
					{
						tracing::warn!(
							intent_hash = %truncate_id(&intent_hash.to_string()),
							error = %e,
							"Failed to record late-confirmed fulfillment"
						);
					}
					return None;
				}
			}
		}

		match self.registry.execute_intent(&job.intent, job.wallet_kind).await {
			Ok(result) => {
				tracing::info!(
					intent_hash = %truncate_id(&intent_hash.to_string()),
					tx_hash = ?result.tx_hash,
					attempt = job.attempt,
					"Intent fulfilled"
				);
				None
			},
			Err(e) => {
				if let ExecutorError::ConfirmationTimeout { tx_hash, .. } = &e {
					job.last_tx_hash = Some(tx_hash.clone());
				}

				if !is_retryable(&e) {
					tracing::warn!(
						intent_hash = %truncate_id(&intent_hash.to_string()),
						error = %e,
						"Job failed with non-retryable error"
					);
					return None;
				}

				if job.attempt >= self.config.max_attempts {
					tracing::warn!(
						intent_hash = %truncate_id(&intent_hash.to_string()),
						attempts = job.attempt,
						error = %e,
						"Job failed terminally, attempts exhausted"
					);
					return None;
				}

				let delay = backoff::retry_delay(
					job.attempt,
					self.config.backoff_delay_ms,
					self.config.backoff_max_delay_ms,
					self.config.backoff_jitter,
				);
				tracing::warn!(
					intent_hash = %truncate_id(&intent_hash.to_string()),
					attempt = job.attempt,
					delay_ms = delay.as_millis() as u64,
					error = %e,
					"Job attempt failed, scheduling retry"
				);
				job.attempt += 1;
				Some((job, delay))
			},
		}
	}
}

/// Whether a failed attempt is worth retrying.
///
/// Configuration and precondition problems recur on every attempt; network
/// trouble, timeouts and on-chain reverts can clear up.
fn is_retryable(error: &ExecutorError) -> bool {
	use solver_delivery::DeliveryError;
	use solver_wallet::WalletError;

	match error {
		ExecutorError::Network(_)
		| ExecutorError::ConfirmationTimeout { .. }
		| ExecutorError::Execution(_) => true,
		ExecutorError::Delivery(e) => matches!(
			e,
			DeliveryError::Network(_)
				| DeliveryError::TransactionFailed(_)
				| DeliveryError::ConfirmationTimeout(_)
		),
		ExecutorError::Wallet(e) => matches!(
			e,
			WalletError::TransactionFailed(_) | WalletError::Delivery(_)
		),
		_ => false,
	}
}
