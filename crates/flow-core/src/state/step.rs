//! Step state machine.
//!
//! `visible_state` is a pure priority chain over a record and its position
//! relative to the cursor. Phase changes made by the orchestrator are checked
//! against a static transition table: Idle -> Init -> Confirming -> Confirmed,
//! with Init and Confirming able to fall back to Idle on failure, and Init
//! able to jump straight to Confirmed for sign-only steps.

use crate::action::ActionSpec;
use crate::engine::QueueOptions;
use flow_types::{StepPhase, StepRecord, StructuredError, VisibleState};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

/// Derives the state shown for the step at `index`.
///
/// Evaluated in priority order (cursor position, confirming, init,
/// confirmed) so a record never reports two states.
pub fn visible_state(record: &StepRecord, index: usize, current_index: usize) -> VisibleState {
	if index > current_index {
		VisibleState::Todo
	} else if record.confirming() {
		VisibleState::Pending
	} else if record.init() {
		VisibleState::WalletOpen
	} else if record.confirmed() {
		VisibleState::Success
	} else {
		VisibleState::Active
	}
}

/// Checks if a phase transition is valid
pub fn is_valid_transition(from: StepPhase, to: StepPhase) -> bool {
	// Static transition table - each phase maps to allowed next phases
	static TRANSITIONS: Lazy<HashMap<StepPhase, HashSet<StepPhase>>> = Lazy::new(|| {
		let mut m = HashMap::new();
		m.insert(StepPhase::Idle, HashSet::from([StepPhase::Init]));
		m.insert(
			StepPhase::Init,
			HashSet::from([StepPhase::Idle, StepPhase::Confirming, StepPhase::Confirmed]),
		);
		m.insert(
			StepPhase::Confirming,
			HashSet::from([StepPhase::Idle, StepPhase::Confirmed]),
		);
		m.insert(StepPhase::Confirmed, HashSet::new()); // terminal
		m
	});

	TRANSITIONS
		.get(&from)
		.is_some_and(|allowed| allowed.contains(&to))
}

/// Everything a renderer needs for one step indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepView {
	pub index: usize,
	pub state: VisibleState,
	pub label: String,
	pub tooltip: String,
	/// Only the cursor step carries its error.
	pub error: Option<StructuredError>,
}

/// Builds the view of one step, applying the force-loading override.
pub fn step_view(
	spec: &ActionSpec,
	record: &StepRecord,
	index: usize,
	current_index: usize,
	options: &QueueOptions,
) -> StepView {
	let state = visible_state(record, index, current_index);

	let label = match (options.force_loading, state) {
		(true, _) => options
			.force_loading_label
			.clone()
			.unwrap_or_else(|| spec.loading_label.clone()),
		(false, VisibleState::WalletOpen) => spec.loading_label.clone(),
		(false, VisibleState::Pending) => spec.confirming_label.clone(),
		(false, _) => spec.label.clone(),
	};

	StepView {
		index,
		state,
		label,
		tooltip: spec.step_tooltip.clone(),
		error: if index == current_index {
			record.error.clone()
		} else {
			None
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use flow_types::{ExecutionError, TransactionHash};

	fn record(phase: StepPhase) -> StepRecord {
		StepRecord {
			phase,
			..Default::default()
		}
	}

	#[test]
	fn test_visible_state_priority_chain() {
		assert_eq!(visible_state(&record(StepPhase::Idle), 2, 1), VisibleState::Todo);
		assert_eq!(
			visible_state(&record(StepPhase::Confirming), 1, 1),
			VisibleState::Pending
		);
		assert_eq!(
			visible_state(&record(StepPhase::Init), 1, 1),
			VisibleState::WalletOpen
		);
		assert_eq!(
			visible_state(&record(StepPhase::Confirmed), 0, 1),
			VisibleState::Success
		);
		assert_eq!(visible_state(&record(StepPhase::Idle), 1, 1), VisibleState::Active);
	}

	#[test]
	fn test_errored_step_at_cursor_is_active() {
		let errored = StepRecord {
			error: Some(StructuredError::new("Rejected", "declined")),
			..Default::default()
		};
		assert_eq!(visible_state(&errored, 0, 0), VisibleState::Active);
	}

	#[test]
	fn test_transition_table() {
		assert!(is_valid_transition(StepPhase::Idle, StepPhase::Init));
		assert!(is_valid_transition(StepPhase::Init, StepPhase::Confirmed));
		assert!(is_valid_transition(StepPhase::Confirming, StepPhase::Idle));
		assert!(!is_valid_transition(StepPhase::Idle, StepPhase::Confirmed));
		assert!(!is_valid_transition(StepPhase::Confirmed, StepPhase::Idle));
		assert!(!is_valid_transition(StepPhase::Confirming, StepPhase::Init));
	}

	#[test]
	fn test_step_view_labels() {
		let spec = ActionSpec::transaction("Swap", || async {
			Ok::<_, ExecutionError>(Some(TransactionHash(vec![1])))
		})
		.with_loading_label("Confirm swap in wallet")
		.with_confirming_label("Swapping")
		.with_tooltip("Executes the swap");
		let options = QueueOptions::default();

		let view = step_view(&spec, &record(StepPhase::Init), 0, 0, &options);
		assert_eq!(view.state, VisibleState::WalletOpen);
		assert_eq!(view.label, "Confirm swap in wallet");

		let view = step_view(&spec, &record(StepPhase::Confirming), 0, 0, &options);
		assert_eq!(view.label, "Swapping");
		assert_eq!(view.tooltip, "Executes the swap");

		let forced = QueueOptions {
			force_loading: true,
			force_loading_label: Some("Loading".into()),
			..Default::default()
		};
		let view = step_view(&spec, &record(StepPhase::Idle), 1, 0, &forced);
		assert_eq!(view.state, VisibleState::Todo);
		assert_eq!(view.label, "Loading");
	}

	#[test]
	fn test_error_only_shown_at_cursor() {
		let spec = ActionSpec::signature("Sign", || async {
			Ok::<Option<TransactionHash>, ExecutionError>(None)
		});
		let errored = StepRecord {
			error: Some(StructuredError::new("Rejected", "declined")),
			..Default::default()
		};
		let options = QueueOptions::default();

		assert!(step_view(&spec, &errored, 0, 0, &options).error.is_some());
		assert!(step_view(&spec, &errored, 0, 1, &options).error.is_none());
	}
}
