//! Confirmation monitoring for a single step transaction.
//!
//! The base confirmation comes first. If the active network requires extra
//! depth, that wait happens next, and only then is the block time looked up
//! for `confirmed_at`.

use crate::action::ChainIdSource;
use flow_delivery::{ConfirmationWaiter, DeliveryError};
use flow_types::{truncate_id, ConfirmationPolicy, TransactionHash, TransactionReceipt};
use std::sync::Arc;
use tracing::instrument;

pub struct ConfirmationMonitor {
	waiter: Arc<dyn ConfirmationWaiter>,
	chain: Arc<dyn ChainIdSource>,
	policy: ConfirmationPolicy,
}

impl ConfirmationMonitor {
	pub fn new(
		waiter: Arc<dyn ConfirmationWaiter>,
		chain: Arc<dyn ChainIdSource>,
		policy: ConfirmationPolicy,
	) -> Self {
		Self {
			waiter,
			chain,
			policy,
		}
	}

	/// Chain the wallet is connected to right now.
	pub fn chain_id(&self) -> u64 {
		self.chain.current_chain_id()
	}

	/// Waits for the base confirmation of `tx_hash`.
	#[instrument(skip_all, fields(step = step, tx_hash = %truncate_id(&tx_hash.to_hex())))]
	pub async fn wait_included(
		&self,
		step: usize,
		tx_hash: &TransactionHash,
	) -> Result<TransactionReceipt, DeliveryError> {
		let receipt = self.waiter.wait(tx_hash).await?;
		if !receipt.success {
			return Err(DeliveryError::TransactionFailed(
				"Transaction reverted".to_string(),
			));
		}
		tracing::info!(block = receipt.block_number, "Included");
		Ok(receipt)
	}

	/// Applies the network's extra depth, then resolves the confirmation time.
	///
	/// Returns the receipt as seen at final depth and the block timestamp.
	/// A failed timestamp lookup does not undo the confirmation; the time is
	/// reported as unknown instead.
	#[instrument(skip_all, fields(step = step, tx_hash = %truncate_id(&receipt.hash.to_hex())))]
	pub async fn wait_final(
		&self,
		step: usize,
		receipt: TransactionReceipt,
	) -> Result<(TransactionReceipt, Option<u64>), DeliveryError> {
		let chain_id = self.chain_id();
		let extra = self.policy.extra_confirmations(chain_id);

		let receipt = if extra > 0 {
			tracing::info!(chain_id, extra, "Waiting for extra confirmations");
			let deeper = self
				.waiter
				.wait_extra_confirmations(&receipt.hash, extra)
				.await?;
			if !deeper.success {
				return Err(DeliveryError::TransactionFailed(
					"Transaction reverted".to_string(),
				));
			}
			deeper
		} else {
			receipt
		};

		let confirmed_at = match self.waiter.confirmed_at(&receipt).await {
			Ok(timestamp) => Some(timestamp),
			Err(e) => {
				tracing::warn!(error = %e, "Failed to resolve confirmation time");
				None
			}
		};

		Ok((receipt, confirmed_at))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use std::sync::atomic::{AtomicU64, Ordering};
	use std::sync::Mutex;

	struct StubWaiter {
		success: bool,
		timestamp: Option<u64>,
		extra_requests: Mutex<Vec<u64>>,
	}

	impl StubWaiter {
		fn new(success: bool, timestamp: Option<u64>) -> Arc<Self> {
			Arc::new(Self {
				success,
				timestamp,
				extra_requests: Mutex::new(Vec::new()),
			})
		}
	}

	#[async_trait]
	impl ConfirmationWaiter for StubWaiter {
		async fn wait(&self, hash: &TransactionHash) -> Result<TransactionReceipt, DeliveryError> {
			Ok(TransactionReceipt {
				hash: hash.clone(),
				block_number: 7,
				success: self.success,
			})
		}

		async fn wait_extra_confirmations(
			&self,
			hash: &TransactionHash,
			extra: u64,
		) -> Result<TransactionReceipt, DeliveryError> {
			self.extra_requests.lock().unwrap().push(extra);
			self.wait(hash).await
		}

		async fn confirmed_at(&self, _receipt: &TransactionReceipt) -> Result<u64, DeliveryError> {
			self.timestamp
				.ok_or_else(|| DeliveryError::Network("block unavailable".into()))
		}
	}

	fn hash() -> TransactionHash {
		TransactionHash(vec![0xab; 32])
	}

	#[tokio::test]
	async fn test_reverted_receipt_is_failure() {
		let monitor = ConfirmationMonitor::new(
			StubWaiter::new(false, Some(100)),
			Arc::new(|| 1u64),
			ConfirmationPolicy::new(),
		);
		assert!(matches!(
			monitor.wait_included(0, &hash()).await,
			Err(DeliveryError::TransactionFailed(_))
		));
	}

	#[tokio::test]
	async fn test_extra_depth_follows_current_chain() {
		let chain = Arc::new(AtomicU64::new(1));
		let source = chain.clone();
		let waiter = StubWaiter::new(true, Some(1_700_000_084));
		let monitor = ConfirmationMonitor::new(
			waiter.clone(),
			Arc::new(move || source.load(Ordering::SeqCst)),
			ConfirmationPolicy::new().with_chain(137, 5),
		);

		let receipt = monitor.wait_included(0, &hash()).await.unwrap();
		// Wallet switched networks after the base confirmation.
		chain.store(137, Ordering::SeqCst);

		let (receipt, confirmed_at) = monitor.wait_final(0, receipt).await.unwrap();
		assert_eq!(receipt.block_number, 7);
		assert_eq!(confirmed_at, Some(1_700_000_084));
		assert_eq!(waiter.extra_requests.lock().unwrap().clone(), vec![5]);
	}

	#[tokio::test]
	async fn test_missing_timestamp_still_confirms() {
		let waiter = StubWaiter::new(true, None);
		let monitor = ConfirmationMonitor::new(
			waiter.clone(),
			Arc::new(|| 1u64),
			ConfirmationPolicy::new(),
		);

		let receipt = monitor.wait_included(0, &hash()).await.unwrap();
		let (_, confirmed_at) = monitor.wait_final(0, receipt).await.unwrap();
		assert_eq!(confirmed_at, None);
		assert!(waiter.extra_requests.lock().unwrap().is_empty());
	}
}
