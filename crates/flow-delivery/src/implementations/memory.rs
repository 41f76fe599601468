//! In-memory chain implementation for development and testing.
//!
//! `SimulatedChain` keeps a block counter and a set of transactions in
//! memory. Transactions are broadcast into a mempool and included by an
//! explicit call to [`SimulatedChain::mine`], so callers control exactly when
//! confirmations happen.

use crate::{ChainClient, DeliveryError};
use async_trait::async_trait;
use flow_types::{TransactionHash, TransactionReceipt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct ChainState {
	head: u64,
	next_nonce: u64,
	mempool: Vec<TransactionHash>,
	included: HashMap<TransactionHash, TransactionReceipt>,
	/// Transactions that will revert when mined.
	doomed: HashSet<TransactionHash>,
}

/// Simulated chain with deterministic block timestamps.
#[derive(Clone)]
pub struct SimulatedChain {
	chain_id: u64,
	genesis_timestamp: u64,
	block_time_secs: u64,
	state: Arc<RwLock<ChainState>>,
}

impl SimulatedChain {
	/// Creates a chain whose block `n` has timestamp `genesis_timestamp + n * block_time_secs`.
	pub fn new(chain_id: u64, genesis_timestamp: u64, block_time_secs: u64) -> Self {
		Self {
			chain_id,
			genesis_timestamp,
			block_time_secs,
			state: Arc::new(RwLock::new(ChainState::default())),
		}
	}

	pub fn chain_id(&self) -> u64 {
		self.chain_id
	}

	/// Places a new transaction in the mempool and returns its hash.
	pub async fn broadcast(&self) -> TransactionHash {
		let mut state = self.state.write().await;
		state.next_nonce += 1;

		let mut bytes = vec![0u8; 24];
		bytes.extend_from_slice(&state.next_nonce.to_be_bytes());
		bytes[..8].copy_from_slice(&self.chain_id.to_be_bytes());
		let hash = TransactionHash(bytes);

		state.mempool.push(hash.clone());
		tracing::debug!(tx_hash = %hash, chain_id = self.chain_id, "Broadcast simulated transaction");
		hash
	}

	/// Marks a pending transaction to revert when it is mined.
	pub async fn revert_on_inclusion(&self, hash: &TransactionHash) {
		self.state.write().await.doomed.insert(hash.clone());
	}

	/// Removes a transaction from the mempool, or un-includes it if already
	/// mined, as a reorg would.
	pub async fn drop_transaction(&self, hash: &TransactionHash) {
		let mut state = self.state.write().await;
		state.mempool.retain(|pending| pending != hash);
		state.included.remove(hash);
	}

	/// Produces `blocks` new blocks. The first one includes the whole mempool.
	pub async fn mine(&self, blocks: u64) {
		let mut state = self.state.write().await;
		for _ in 0..blocks {
			state.head += 1;
			let block_number = state.head;
			let pending = std::mem::take(&mut state.mempool);
			for hash in pending {
				let success = !state.doomed.remove(&hash);
				state.included.insert(
					hash.clone(),
					TransactionReceipt {
						hash,
						block_number,
						success,
					},
				);
			}
		}
	}

	pub async fn head(&self) -> u64 {
		self.state.read().await.head
	}
}

#[async_trait]
impl ChainClient for SimulatedChain {
	async fn get_receipt(
		&self,
		hash: &TransactionHash,
	) -> Result<Option<TransactionReceipt>, DeliveryError> {
		let state = self.state.read().await;
		if let Some(receipt) = state.included.get(hash) {
			return Ok(Some(receipt.clone()));
		}
		if state.mempool.contains(hash) {
			return Ok(None);
		}
		Err(DeliveryError::NotFound(hash.to_string()))
	}

	async fn get_block_number(&self) -> Result<u64, DeliveryError> {
		Ok(self.state.read().await.head)
	}

	async fn get_block_timestamp(&self, block_number: u64) -> Result<u64, DeliveryError> {
		let head = self.state.read().await.head;
		if block_number > head {
			return Err(DeliveryError::Network(format!(
				"Block {} not found (head is {})",
				block_number, head
			)));
		}
		Ok(self.genesis_timestamp + block_number * self.block_time_secs)
	}
}
