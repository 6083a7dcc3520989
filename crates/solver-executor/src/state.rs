//! In-memory intent state store.
//!
//! The production deployment points `IntentStateInterface` at an external
//! store; this implementation backs tests and single-process runs.

use crate::{ExecutorError, IntentStateInterface};
use alloy_primitives::B256;
use async_trait::async_trait;
use solver_types::IntentStatus;
use std::collections::HashMap;
use std::sync::Mutex;

/// Keeps intent statuses in a process-local map.
#[derive(Default)]
pub struct InMemoryIntentState {
	statuses: Mutex<HashMap<B256, IntentStatus>>,
}

impl InMemoryIntentState {
	pub fn new() -> Self {
		Self::default()
	}

	/// Current status of an intent, if any terminal update was recorded.
	pub fn status(&self, intent_hash: &B256) -> Option<IntentStatus> {
		self.statuses
			.lock()
			.expect("intent state poisoned")
			.get(intent_hash)
			.copied()
	}
}

#[async_trait]
impl IntentStateInterface for InMemoryIntentState {
	async fn update_status(
		&self,
		intent_hash: &B256,
		status: IntentStatus,
	) -> Result<(), ExecutorError> {
		tracing::info!(
			intent_hash = %intent_hash,
			status = %status,
			"Intent status updated"
		);
		self.statuses
			.lock()
			.expect("intent state poisoned")
			.insert(*intent_hash, status);
		Ok(())
	}
}
