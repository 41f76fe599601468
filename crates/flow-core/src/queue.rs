//! Ordered step specifications and their lifecycle records.
//!
//! The queue owns one [`StepRecord`] per [`ActionSpec`], matched by index.
//! Records outlive spec updates: [`ActionQueue::reconcile`] swaps the specs
//! but never resets an existing record, so a step that is mid-confirmation
//! or already confirmed keeps its state.

use crate::action::ActionSpec;
use crate::state::is_valid_transition;
use flow_types::{StepPhase, StepRecord};
use thiserror::Error;

/// Errors raised when a record cannot be changed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
	#[error("Step {0} does not exist")]
	OutOfRange(usize),
	#[error("Invalid transition of step {index} from {from:?} to {to:?}")]
	InvalidTransition {
		index: usize,
		from: StepPhase,
		to: StepPhase,
	},
}

/// Specs and records, index-aligned.
#[derive(Debug, Default)]
pub struct ActionQueue {
	specs: Vec<ActionSpec>,
	records: Vec<StepRecord>,
}

impl ActionQueue {
	pub fn new(specs: Vec<ActionSpec>) -> Self {
		let mut queue = Self::default();
		queue.reconcile(specs);
		queue
	}

	/// Replaces the specs positionally.
	///
	/// Indices that already had a record keep it untouched; new indices get
	/// a fresh idle record. Records past the end of the new list are dropped.
	pub fn reconcile(&mut self, specs: Vec<ActionSpec>) {
		let len = specs.len();
		self.specs = specs;
		self.records.truncate(len);
		self.records.resize_with(len, StepRecord::default);
	}

	pub fn len(&self) -> usize {
		self.specs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.specs.is_empty()
	}

	pub fn spec(&self, index: usize) -> Option<&ActionSpec> {
		self.specs.get(index)
	}

	pub fn specs(&self) -> &[ActionSpec] {
		&self.specs
	}

	pub fn record(&self, index: usize) -> Option<&StepRecord> {
		self.records.get(index)
	}

	pub fn record_mut(&mut self, index: usize) -> Option<&mut StepRecord> {
		self.records.get_mut(index)
	}

	pub fn records(&self) -> &[StepRecord] {
		&self.records
	}

	/// Moves the record at `index` to `to` if the transition table allows it.
	///
	/// Returns the previous phase. A rejected change leaves the record untouched.
	pub fn transition(&mut self, index: usize, to: StepPhase) -> Result<StepPhase, QueueError> {
		let record = self
			.records
			.get_mut(index)
			.ok_or(QueueError::OutOfRange(index))?;
		let from = record.phase;
		if !is_valid_transition(from, to) {
			return Err(QueueError::InvalidTransition { index, from, to });
		}
		record.phase = to;
		Ok(from)
	}
}
