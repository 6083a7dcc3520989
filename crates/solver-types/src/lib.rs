//! Shared type definitions for the intent execution engine.
//!
//! This crate defines the data model used across all solver crates: blockchain
//! addresses and transactions, chain identifiers spanning the supported chain
//! families, intents with their routes and rewards, execution jobs, and the
//! network configuration tables the rest of the system is wired from.

/// Account-related types (addresses, signatures, transactions).
pub mod account;
/// Chain identifier and chain family types.
pub mod chains;
/// Intent data model (routes, rewards, execution results).
pub mod intent;
/// Execution job types consumed by the scheduler.
pub mod job;
/// Network configuration types.
pub mod networks;
/// Utility functions and test fixture builders.
pub mod utils;
/// Wallet capability tags.
pub mod wallet;

pub use account::{Address, Signature, Transaction, TransactionHash, TransactionReceipt};
pub use chains::{ChainFamily, ChainId};
pub use intent::{Call, ExecutionResult, Intent, IntentStatus, Reward, Route, TokenAmount};
pub use job::{ChainExecutionJob, WithdrawalRequest};
pub use networks::{KernelConfig, NetworkConfig, NetworksConfig, RpcEndpoint, TokenConfig};
pub use utils::{truncate_id, with_0x_prefix};
pub use wallet::WalletKind;
