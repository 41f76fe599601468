//! Transaction delivery types for the flow system.
//!
//! This module defines the handle a step executor returns once a transaction
//! has been broadcast, and the receipt the confirmation waiter produces once
//! that transaction is included in a block.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Blockchain transaction hash representation.
///
/// Stores transaction hashes as raw bytes to support different blockchain formats.
/// This is the "transaction handle" handed from an executor to the waiter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionHash(pub Vec<u8>);

impl TransactionHash {
	/// Returns the lowercase hex form without prefix.
	pub fn to_hex(&self) -> String {
		hex::encode(&self.0)
	}
}

impl fmt::Display for TransactionHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "0x{}", self.to_hex())
	}
}

/// Transaction receipt containing execution details.
///
/// Provides information about a transaction after it has been included in a block,
/// including its success status and block number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
	/// The hash of the transaction.
	pub hash: TransactionHash,
	/// The block number where the transaction was included.
	pub block_number: u64,
	/// Whether the transaction executed successfully.
	pub success: bool,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_hash_display_is_prefixed_hex() {
		let hash = TransactionHash(vec![0xab, 0xcd, 0x01]);
		assert_eq!(hash.to_string(), "0xabcd01");
		assert_eq!(hash.to_hex(), "abcd01");
	}
}
