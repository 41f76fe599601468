//! Transaction confirmation module for the multi-step flow.
//!
//! Once a step's executor has broadcast a transaction, the orchestrator hands
//! the resulting hash to a [`ConfirmationWaiter`]. This module defines that
//! boundary, the lower-level [`ChainClient`] a waiter reads chain state
//! through, and the concrete implementations shipped with the workspace.

use async_trait::async_trait;
use flow_types::{TransactionHash, TransactionReceipt};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod memory;
	pub mod polling;
}

/// Errors that can occur while waiting on a transaction.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// Error that occurs during network communication.
	#[error("Network error: {0}")]
	Network(String),
	/// The transaction was included but reverted.
	#[error("Transaction failed: {0}")]
	TransactionFailed(String),
	/// The transaction did not reach the requested depth in time.
	#[error("Timeout waiting for {confirmations} confirmations after {seconds} seconds")]
	Timeout { confirmations: u64, seconds: u64 },
	/// A previously seen transaction is no longer known to the chain.
	#[error("Transaction not found: {0}")]
	NotFound(String),
}

/// Read access to the chain a flow's transactions are sent to.
#[async_trait]
pub trait ChainClient: Send + Sync {
	/// Returns the receipt if the transaction has been included, `None` while pending.
	async fn get_receipt(
		&self,
		hash: &TransactionHash,
	) -> Result<Option<TransactionReceipt>, DeliveryError>;

	/// Gets the latest block number.
	async fn get_block_number(&self) -> Result<u64, DeliveryError>;

	/// Gets the Unix timestamp (seconds) of a block.
	async fn get_block_timestamp(&self, block_number: u64) -> Result<u64, DeliveryError>;
}

/// Resolves a broadcast transaction to a confirmation or a failure.
///
/// Every call settles exactly once: `Ok` is the confirmation, `Err` the
/// failure. A reverted receipt is reported as
/// [`DeliveryError::TransactionFailed`], never as `Ok`.
#[async_trait]
pub trait ConfirmationWaiter: Send + Sync {
	/// Waits for the transaction's first (base) confirmation.
	async fn wait(&self, hash: &TransactionHash) -> Result<TransactionReceipt, DeliveryError>;

	/// Waits until the transaction has `extra` confirmations beyond its base
	/// confirmation. Returns the receipt as seen at that depth.
	async fn wait_extra_confirmations(
		&self,
		hash: &TransactionHash,
		extra: u64,
	) -> Result<TransactionReceipt, DeliveryError>;

	/// Unix timestamp (seconds) at which the receipt's block was produced.
	async fn confirmed_at(&self, receipt: &TransactionReceipt) -> Result<u64, DeliveryError>;
}
