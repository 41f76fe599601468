//! Polling confirmation waiter.
//!
//! Polls a [`ChainClient`] at a fixed interval until the transaction has been
//! included at the requested depth, has reverted, or the timeout elapses.

use crate::{ChainClient, ConfirmationWaiter, DeliveryError};
use async_trait::async_trait;
use flow_types::{truncate_id, TransactionHash, TransactionReceipt};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// [`ConfirmationWaiter`] backed by receipt and block-number polling.
pub struct PollingWaiter<C> {
	client: Arc<C>,
	poll_interval: Duration,
	timeout: Duration,
	/// Depth that counts as the base confirmation. At least 1.
	base_confirmations: u64,
}

impl<C: ChainClient> PollingWaiter<C> {
	pub fn new(
		client: Arc<C>,
		poll_interval: Duration,
		timeout: Duration,
		base_confirmations: u64,
	) -> Self {
		Self {
			client,
			poll_interval,
			timeout,
			base_confirmations: base_confirmations.max(1),
		}
	}

	/// Polls until `hash` is `confirmations` blocks deep.
	///
	/// The including block counts as the first confirmation.
	async fn poll_until_depth(
		&self,
		hash: &TransactionHash,
		confirmations: u64,
	) -> Result<TransactionReceipt, DeliveryError> {
		let start_time = tokio::time::Instant::now();

		tracing::info!(
			"Waiting for {} confirmations (timeout: {}s)",
			confirmations,
			self.timeout.as_secs()
		);

		loop {
			if start_time.elapsed() > self.timeout {
				return Err(DeliveryError::Timeout {
					confirmations,
					seconds: self.timeout.as_secs(),
				});
			}

			match self.client.get_receipt(hash).await {
				Ok(Some(receipt)) if !receipt.success => {
					return Err(DeliveryError::TransactionFailed(format!(
						"Transaction {} reverted in block {}",
						truncate_id(&hash.to_hex()),
						receipt.block_number
					)));
				}
				Ok(Some(receipt)) => match self.client.get_block_number().await {
					Ok(head) => {
						let depth = head.saturating_sub(receipt.block_number) + 1;
						if depth >= confirmations {
							tracing::debug!(block = receipt.block_number, depth, "Reached depth");
							return Ok(receipt);
						}
						tracing::trace!(depth, required = confirmations, "Waiting for more blocks");
					}
					Err(e) => {
						tracing::warn!(error = %e, "Fetching block number failed, retrying");
					}
				},
				Ok(None) | Err(DeliveryError::NotFound(_)) => {
					tracing::trace!(
						elapsed_secs = start_time.elapsed().as_secs(),
						"Waiting for transaction to be mined"
					);
				}
				Err(e) => {
					tracing::warn!(error = %e, "Checking transaction status failed, retrying");
				}
			}

			tokio::time::sleep(self.poll_interval).await;
		}
	}
}

#[async_trait]
impl<C: ChainClient> ConfirmationWaiter for PollingWaiter<C> {
	#[instrument(skip_all, fields(tx_hash = %truncate_id(&hash.to_hex())))]
	async fn wait(&self, hash: &TransactionHash) -> Result<TransactionReceipt, DeliveryError> {
		self.poll_until_depth(hash, self.base_confirmations).await
	}

	#[instrument(skip_all, fields(tx_hash = %truncate_id(&hash.to_hex()), extra = extra))]
	async fn wait_extra_confirmations(
		&self,
		hash: &TransactionHash,
		extra: u64,
	) -> Result<TransactionReceipt, DeliveryError> {
		self.poll_until_depth(hash, self.base_confirmations.saturating_add(extra))
			.await
	}

	async fn confirmed_at(&self, receipt: &TransactionReceipt) -> Result<u64, DeliveryError> {
		self.client.get_block_timestamp(receipt.block_number).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::implementations::memory::SimulatedChain;

	fn waiter(chain: &SimulatedChain) -> PollingWaiter<SimulatedChain> {
		PollingWaiter::new(
			Arc::new(chain.clone()),
			Duration::from_secs(1),
			Duration::from_secs(60),
			1,
		)
	}

	#[tokio::test(start_paused = true)]
	async fn test_wait_resolves_on_inclusion() {
		let chain = SimulatedChain::new(1, 1_000, 12);
		let hash = chain.broadcast().await;

		let miner = chain.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_secs(5)).await;
			miner.mine(1).await;
		});

		let waiter = waiter(&chain);
		let receipt = waiter.wait(&hash).await.unwrap();
		assert_eq!(receipt.block_number, 1);
		assert_eq!(waiter.confirmed_at(&receipt).await.unwrap(), 1_012);
	}

	#[tokio::test(start_paused = true)]
	async fn test_extra_confirmations_wait_for_depth() {
		let chain = SimulatedChain::new(137, 0, 2);
		let hash = chain.broadcast().await;
		chain.mine(1).await;

		let waiter = waiter(&chain);
		waiter.wait(&hash).await.unwrap();

		let handle = {
			let chain = chain.clone();
			let hash = hash.clone();
			tokio::spawn(async move {
				let waiter = PollingWaiter::new(
					Arc::new(chain),
					Duration::from_secs(1),
					Duration::from_secs(60),
					1,
				);
				waiter.wait_extra_confirmations(&hash, 3).await
			})
		};

		// Two more blocks is not enough for three extra confirmations.
		chain.mine(2).await;
		tokio::time::sleep(Duration::from_secs(3)).await;
		assert!(!handle.is_finished());

		chain.mine(1).await;
		let receipt = handle.await.unwrap().unwrap();
		assert_eq!(receipt.block_number, 1);
		assert_eq!(chain.head().await, 4);
	}

	#[tokio::test(start_paused = true)]
	async fn test_reverted_transaction_fails() {
		let chain = SimulatedChain::new(1, 0, 12);
		let hash = chain.broadcast().await;
		chain.revert_on_inclusion(&hash).await;
		chain.mine(1).await;

		let result = waiter(&chain).wait(&hash).await;
		assert!(matches!(result, Err(DeliveryError::TransactionFailed(_))));
	}

	/// Client whose first head lookups fail before delegating to the chain.
	struct FlakyHead {
		chain: SimulatedChain,
		failures: std::sync::atomic::AtomicUsize,
	}

	#[async_trait]
	impl ChainClient for FlakyHead {
		async fn get_receipt(
			&self,
			hash: &TransactionHash,
		) -> Result<Option<TransactionReceipt>, DeliveryError> {
			self.chain.get_receipt(hash).await
		}

		async fn get_block_number(&self) -> Result<u64, DeliveryError> {
			use std::sync::atomic::Ordering;
			if self
				.failures
				.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
				.is_ok()
			{
				return Err(DeliveryError::Network("transient".into()));
			}
			self.chain.get_block_number().await
		}

		async fn get_block_timestamp(&self, block_number: u64) -> Result<u64, DeliveryError> {
			self.chain.get_block_timestamp(block_number).await
		}
	}

	#[tokio::test(start_paused = true)]
	async fn test_head_lookup_error_is_retried() {
		let chain = SimulatedChain::new(1, 0, 12);
		let hash = chain.broadcast().await;
		chain.mine(1).await;

		let waiter = PollingWaiter::new(
			Arc::new(FlakyHead {
				chain,
				failures: std::sync::atomic::AtomicUsize::new(2),
			}),
			Duration::from_secs(1),
			Duration::from_secs(60),
			1,
		);
		let receipt = waiter.wait(&hash).await.unwrap();
		assert_eq!(receipt.block_number, 1);
	}

	#[tokio::test(start_paused = true)]
	async fn test_huge_extra_depth_times_out() {
		let chain = SimulatedChain::new(1, 0, 12);
		let hash = chain.broadcast().await;
		chain.mine(1).await;

		let result = waiter(&chain)
			.wait_extra_confirmations(&hash, u64::MAX)
			.await;
		assert!(matches!(
			result,
			Err(DeliveryError::Timeout {
				confirmations: u64::MAX,
				seconds: 60
			})
		));
	}

	#[tokio::test(start_paused = true)]
	async fn test_times_out_when_never_mined() {
		let chain = SimulatedChain::new(1, 0, 12);
		let hash = chain.broadcast().await;

		let result = waiter(&chain).wait(&hash).await;
		assert!(matches!(
			result,
			Err(DeliveryError::Timeout {
				confirmations: 1,
				seconds: 60
			})
		));
	}
}
