//! Failures raised by step executors.
//!
//! An executor prompts a wallet for a signature and, for on-chain steps,
//! broadcasts the signed transaction. Anything that goes wrong before a
//! transaction handle exists is reported as an [`ExecutionError`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw failure produced by a step executor, before classification.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ExecutionError {
	/// The user declined the signature request in their wallet.
	#[error("User rejected the request: {0}")]
	UserRejected(String),
	/// The account cannot cover value plus fees.
	#[error("Insufficient funds: {0}")]
	InsufficientFunds(String),
	/// JSON-RPC error returned by the wallet or node.
	#[error("RPC error {code}: {message}")]
	Rpc { code: i64, message: String },
	/// Transport-level failure talking to the provider.
	#[error("Network error: {0}")]
	Network(String),
	/// Gas estimation or simulation showed the call would revert.
	#[error("Execution reverted: {0}")]
	Reverted(String),
	/// The transaction was replaced by another with the same nonce.
	#[error("Transaction replaced (cancelled: {cancelled})")]
	Replaced { cancelled: bool },
	/// Anything the executor could not describe more precisely.
	#[error("{0}")]
	Other(String),
}
