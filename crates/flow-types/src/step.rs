//! Per-step lifecycle record and its visible state.
//!
//! A [`StepRecord`] tracks one step of a flow from the moment the user
//! triggers it until it is confirmed on-chain. The four phases are mutually
//! exclusive, so they are held as a single [`StepPhase`] value rather than as
//! independent flags.

use crate::TransactionReceipt;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classified, user-presentable failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredError {
	pub title: String,
	pub description: String,
}

impl StructuredError {
	pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
		Self {
			title: title.into(),
			description: description.into(),
		}
	}
}

impl fmt::Display for StructuredError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}: {}", self.title, self.description)
	}
}

/// Lifecycle phase of a single step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepPhase {
	/// Not started, or returned to a re-submittable state after a failure.
	#[default]
	Idle,
	/// Awaiting wallet signature and broadcast.
	Init,
	/// Awaiting on-chain confirmation.
	Confirming,
	/// Terminal success.
	Confirmed,
}

/// Mutable lifecycle record for one step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
	pub phase: StepPhase,
	/// Unix timestamp (seconds) of the block that confirmed the step.
	pub confirmed_at: Option<u64>,
	pub error: Option<StructuredError>,
	pub receipt: Option<TransactionReceipt>,
}

impl StepRecord {
	/// True while awaiting wallet signature or broadcast.
	pub fn init(&self) -> bool {
		self.phase == StepPhase::Init
	}

	/// True while awaiting on-chain confirmation.
	pub fn confirming(&self) -> bool {
		self.phase == StepPhase::Confirming
	}

	pub fn confirmed(&self) -> bool {
		self.phase == StepPhase::Confirmed
	}

	/// Never touched: idle phase, nothing recorded.
	pub fn is_idle(&self) -> bool {
		self.phase == StepPhase::Idle
			&& self.error.is_none()
			&& self.receipt.is_none()
			&& self.confirmed_at.is_none()
	}
}

/// State of a step as presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisibleState {
	/// Queued behind the cursor.
	Todo,
	/// Broadcast, waiting for confirmation.
	Pending,
	/// Wallet prompt open.
	WalletOpen,
	Success,
	/// At the cursor, waiting for the user to trigger it.
	Active,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_record_is_idle() {
		let record = StepRecord::default();
		assert!(record.is_idle());
		assert!(!record.init());
		assert!(!record.confirming());
		assert!(!record.confirmed());
	}

	#[test]
	fn test_errored_record_is_not_idle() {
		let record = StepRecord {
			error: Some(StructuredError::new("Rejected", "You rejected the request")),
			..Default::default()
		};
		assert_eq!(record.phase, StepPhase::Idle);
		assert!(!record.is_idle());
	}
}
