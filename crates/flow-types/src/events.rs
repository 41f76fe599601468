//! Event types for observers of a flow.
//!
//! The orchestrator publishes these on its event bus so that a UI layer, a
//! progress reporter or a test can react to state changes without polling.

use crate::{StructuredError, TransactionHash, TransactionReceipt};
use serde::{Deserialize, Serialize};

/// Main event type encompassing everything a flow reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowEvent {
	/// The cursor moved, including its initial value.
	CursorChanged { index: usize },
	/// A step left idle and is waiting on the wallet.
	StepSubmitted { index: usize },
	/// A step's transaction was broadcast and is awaiting confirmation.
	TransactionPending {
		index: usize,
		tx_hash: TransactionHash,
		chain_id: u64,
	},
	/// A step reached its terminal success state.
	StepConfirmed {
		index: usize,
		confirmed_at: Option<u64>,
	},
	/// A step returned to a re-submittable state.
	StepFailed {
		index: usize,
		kind: FailureKind,
		error: Option<StructuredError>,
	},
	/// The last step was confirmed. Published exactly once per run.
	Completed(Completion),
}

/// Payload of the single completion event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
	/// Receipt of the last step; `None` when it was a sign-only step.
	pub receipt: Option<TransactionReceipt>,
	pub confirmed_at: Option<u64>,
}

/// Why a step returned to idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
	/// Signature declined in the wallet.
	UserRejected,
	/// The executor failed before a transaction was broadcast.
	ExecutionFailed,
	/// The waiter reported failure after broadcast.
	ConfirmationFailed,
}
