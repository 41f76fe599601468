//! Orchestrator that drives a flow's steps one at a time.
//!
//! The orchestrator owns the [`ActionQueue`] and the cursor. `submit` runs the
//! current step's executor, waits on confirmation for on-chain steps, and
//! either advances the cursor or, on the last step, publishes the single
//! completion event. Failures leave the step re-submittable and never move
//! the cursor.
//!
//! State lives behind a mutex that is never held across an `.await`, so every
//! mutation between suspension points is atomic from an observer's view. A
//! separate in-flight flag, set before the executor runs and cleared when the
//! submission ends (or its future is dropped), rejects overlapping submits.

pub mod event_bus;
pub mod lifecycle;

use crate::action::ActionSpec;
use crate::classifier::{failure_kind, ErrorClassifier, ErrorReporter};
use crate::monitoring::ConfirmationMonitor;
use crate::queue::{ActionQueue, QueueError};
use crate::state::{step_view, visible_state, StepView};
use event_bus::EventBus;
use flow_delivery::DeliveryError;
use flow_types::{
	truncate_id, Completion, ExecutionError, FailureKind, FlowEvent, StepPhase, StepRecord,
	StructuredError, TransactionHash, TransactionReceipt, VisibleState,
};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::instrument;

/// Errors returned when a request is rejected or an invariant is violated.
///
/// None of these move the cursor or mark a step confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestratorError {
	#[error("Submission is disabled")]
	Disabled,
	#[error("Step {current} is already in flight")]
	InFlight { current: usize },
	#[error("Step {index} is not the current step ({current})")]
	NotCurrent { index: usize, current: usize },
	#[error("Step {index} is out of range (flow has {len} steps)")]
	OutOfRange { index: usize, len: usize },
	#[error("Step {0} is already confirmed")]
	AlreadyConfirmed(usize),
	/// A non-sign step's executor resolved without a transaction.
	#[error("Step {0} resolved without a transaction")]
	MissingTransaction(usize),
	#[error("Flow has no steps")]
	EmptyQueue,
	#[error("Update would remove the current step {current} (new length {len})")]
	CursorDropped { current: usize, len: usize },
	#[error(transparent)]
	Queue(#[from] QueueError),
}

/// Global overrides supplied with the step list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueOptions {
	/// Blocks all submission.
	pub disabled: bool,
	/// Display-only: render every step as loading.
	pub force_loading: bool,
	pub force_loading_label: Option<String>,
}

/// Result of a submission that was accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
	/// The step confirmed and the cursor moved to `next_index`.
	Advanced { next_index: usize },
	/// The last step confirmed.
	Completed(Completion),
	/// The step returned to idle and can be submitted again.
	Failed {
		kind: FailureKind,
		error: Option<StructuredError>,
	},
}

/// Point-in-time copy of the flow's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowSnapshot {
	pub current_index: usize,
	pub records: Vec<StepRecord>,
	pub completed: bool,
	pub in_flight: bool,
}

struct FlowState {
	queue: ActionQueue,
	current_index: usize,
	in_flight: bool,
	completed: bool,
	options: QueueOptions,
}

fn lock(state: &Mutex<FlowState>) -> MutexGuard<'_, FlowState> {
	state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Clears the in-flight flag when a submission ends, however it ends.
///
/// If the submit future is dropped mid-wait, the step is put back to idle so
/// it can be triggered again.
struct InFlightGuard {
	state: Arc<Mutex<FlowState>>,
	index: usize,
}

impl Drop for InFlightGuard {
	fn drop(&mut self) {
		let mut state = lock(&self.state);
		state.in_flight = false;
		if let Some(record) = state.queue.record_mut(self.index) {
			if record.init() || record.confirming() {
				record.phase = StepPhase::Idle;
				record.receipt = None;
			}
		}
	}
}

/// Drives an ordered sequence of user-authorized steps.
#[derive(Clone)]
pub struct Orchestrator {
	pub(crate) id: Arc<str>,
	state: Arc<Mutex<FlowState>>,
	monitor: Arc<ConfirmationMonitor>,
	classifier: Arc<dyn ErrorClassifier>,
	reporter: Arc<dyn ErrorReporter>,
	pub(crate) event_bus: EventBus,
}

impl Orchestrator {
	/// Creates an orchestrator with the cursor on the first step.
	pub fn new(
		id: impl Into<String>,
		specs: Vec<ActionSpec>,
		monitor: ConfirmationMonitor,
		classifier: Arc<dyn ErrorClassifier>,
		reporter: Arc<dyn ErrorReporter>,
		options: QueueOptions,
		event_bus: EventBus,
	) -> Result<Self, OrchestratorError> {
		if specs.is_empty() {
			return Err(OrchestratorError::EmptyQueue);
		}

		let state = FlowState {
			queue: ActionQueue::new(specs),
			current_index: 0,
			in_flight: false,
			completed: false,
			options,
		};

		Ok(Self {
			id: Arc::from(id.into()),
			state: Arc::new(Mutex::new(state)),
			monitor: Arc::new(monitor),
			classifier,
			reporter,
			event_bus,
		})
	}

	fn lock(&self) -> MutexGuard<'_, FlowState> {
		lock(&self.state)
	}

	/// Submits the step at `index`, which must be the current step.
	///
	/// Resolves once the step is confirmed or has returned to idle.
	#[instrument(skip_all, fields(flow = %self.id, step = index))]
	pub async fn submit(&self, index: usize) -> Result<StepOutcome, OrchestratorError> {
		let (spec, _guard) = self.begin(index)?;
		self.event_bus
			.publish(FlowEvent::StepSubmitted { index })
			.ok();
		tracing::info!(label = %spec.label, sign_only = spec.is_sign_action, "Submitting step");

		let handle = match spec.executor.execute().await {
			Ok(handle) => handle,
			Err(e) => return self.fail_execution(index, e),
		};

		if spec.is_sign_action {
			if handle.is_some() {
				tracing::debug!("Sign-only step returned a transaction; not waiting on it");
			}
			return self.confirm(index, None, None);
		}

		let Some(tx_hash) = handle else {
			self.lock().queue.transition(index, StepPhase::Idle)?;
			tracing::error!("Executor resolved without a transaction for an on-chain step");
			return Err(OrchestratorError::MissingTransaction(index));
		};

		self.await_confirmation(index, tx_hash).await
	}

	/// Validates a submission and moves the step to `Init`.
	fn begin(&self, index: usize) -> Result<(ActionSpec, InFlightGuard), OrchestratorError> {
		let mut state = self.lock();

		if state.options.disabled {
			return Err(OrchestratorError::Disabled);
		}
		if state.in_flight {
			return Err(OrchestratorError::InFlight {
				current: state.current_index,
			});
		}
		let len = state.queue.len();
		let spec = state
			.queue
			.spec(index)
			.cloned()
			.ok_or(OrchestratorError::OutOfRange { index, len })?;
		if index != state.current_index {
			return Err(OrchestratorError::NotCurrent {
				index,
				current: state.current_index,
			});
		}
		if state.queue.record(index).is_some_and(StepRecord::confirmed) {
			return Err(OrchestratorError::AlreadyConfirmed(index));
		}

		state.queue.transition(index, StepPhase::Init)?;
		if let Some(record) = state.queue.record_mut(index) {
			record.error = None;
		}
		state.in_flight = true;

		Ok((
			spec,
			InFlightGuard {
				state: self.state.clone(),
				index,
			},
		))
	}

	/// Records a classified executor failure and returns the step to idle.
	fn fail_execution(
		&self,
		index: usize,
		error: ExecutionError,
	) -> Result<StepOutcome, OrchestratorError> {
		let kind = failure_kind(&error);
		let classified = self.classifier.classify(&error);
		if let Some(structured) = &classified {
			self.reporter.report(index, &error, structured);
		}

		{
			let mut state = self.lock();
			state.queue.transition(index, StepPhase::Idle)?;
			if let Some(record) = state.queue.record_mut(index) {
				record.error = classified.clone();
			}
		}

		tracing::warn!(error = %error, kind = ?kind, "Step execution failed");
		self.event_bus
			.publish(FlowEvent::StepFailed {
				index,
				kind,
				error: classified.clone(),
			})
			.ok();

		Ok(StepOutcome::Failed {
			kind,
			error: classified,
		})
	}

	/// Waits for base and extra confirmations of a broadcast step.
	async fn await_confirmation(
		&self,
		index: usize,
		tx_hash: TransactionHash,
	) -> Result<StepOutcome, OrchestratorError> {
		self.lock().queue.transition(index, StepPhase::Confirming)?;

		let chain_id = self.monitor.chain_id();
		tracing::info!(tx_hash = %truncate_id(&tx_hash.to_hex()), chain_id, "Transaction pending");
		self.event_bus
			.publish(FlowEvent::TransactionPending {
				index,
				tx_hash: tx_hash.clone(),
				chain_id,
			})
			.ok();

		let receipt = match self.monitor.wait_included(index, &tx_hash).await {
			Ok(receipt) => receipt,
			Err(e) => return self.fail_confirmation(index, e),
		};

		if let Some(record) = self.lock().queue.record_mut(index) {
			record.receipt = Some(receipt.clone());
		}

		match self.monitor.wait_final(index, receipt).await {
			Ok((receipt, confirmed_at)) => self.confirm(index, Some(receipt), confirmed_at),
			Err(e) => self.fail_confirmation(index, e),
		}
	}

	/// Returns a step to idle after a post-broadcast failure.
	///
	/// No structured error is attached: confirmation failures are silently
	/// retryable. A receipt stored at base confirmation is discarded.
	fn fail_confirmation(
		&self,
		index: usize,
		error: DeliveryError,
	) -> Result<StepOutcome, OrchestratorError> {
		{
			let mut state = self.lock();
			state.queue.transition(index, StepPhase::Idle)?;
			if let Some(record) = state.queue.record_mut(index) {
				record.receipt = None;
			}
		}

		tracing::warn!(error = %error, "Transaction confirmation failed");
		self.event_bus
			.publish(FlowEvent::StepFailed {
				index,
				kind: FailureKind::ConfirmationFailed,
				error: None,
			})
			.ok();

		Ok(StepOutcome::Failed {
			kind: FailureKind::ConfirmationFailed,
			error: None,
		})
	}

	/// Marks the step confirmed and advances the cursor.
	fn confirm(
		&self,
		index: usize,
		receipt: Option<TransactionReceipt>,
		confirmed_at: Option<u64>,
	) -> Result<StepOutcome, OrchestratorError> {
		let mut state = self.lock();
		state.queue.transition(index, StepPhase::Confirmed)?;
		if let Some(record) = state.queue.record_mut(index) {
			record.confirmed_at = confirmed_at;
			record.error = None;
			if receipt.is_some() {
				record.receipt = receipt.clone();
			}
		}

		tracing::info!(confirmed_at = ?confirmed_at, "Step confirmed");
		self.event_bus
			.publish(FlowEvent::StepConfirmed {
				index,
				confirmed_at,
			})
			.ok();

		Ok(self.advance(&mut state, index, receipt, confirmed_at))
	}

	/// Moves the cursor past a confirmed step, or completes the flow.
	fn advance(
		&self,
		state: &mut FlowState,
		index: usize,
		receipt: Option<TransactionReceipt>,
		confirmed_at: Option<u64>,
	) -> StepOutcome {
		if index + 1 < state.queue.len() {
			state.current_index = index + 1;
			self.event_bus
				.publish(FlowEvent::CursorChanged { index: index + 1 })
				.ok();
			return StepOutcome::Advanced {
				next_index: index + 1,
			};
		}

		let completion = Completion {
			receipt,
			confirmed_at,
		};
		if !state.completed {
			state.completed = true;
			tracing::info!("Flow completed");
			self.event_bus
				.publish(FlowEvent::Completed(completion.clone()))
				.ok();
		}
		StepOutcome::Completed(completion)
	}

	/// Replaces the step list, preserving every existing record by index.
	///
	/// Safe to call while a step is in flight. The new list must still
	/// contain the current step. If the flow had completed and the list now
	/// extends past it, the cursor moves onto the first new step and a new
	/// run begins.
	pub fn reconcile(&self, specs: Vec<ActionSpec>) -> Result<(), OrchestratorError> {
		if specs.is_empty() {
			return Err(OrchestratorError::EmptyQueue);
		}

		let mut state = self.lock();
		let current = state.current_index;
		if specs.len() <= current {
			return Err(OrchestratorError::CursorDropped {
				current,
				len: specs.len(),
			});
		}

		state.queue.reconcile(specs);
		tracing::debug!(steps = state.queue.len(), "Reconciled step list");

		if state.completed && current + 1 < state.queue.len() {
			state.completed = false;
			state.current_index = current + 1;
			self.event_bus
				.publish(FlowEvent::CursorChanged { index: current + 1 })
				.ok();
		}

		Ok(())
	}

	pub fn set_options(&self, options: QueueOptions) {
		self.lock().options = options;
	}

	pub fn set_disabled(&self, disabled: bool) {
		self.lock().options.disabled = disabled;
	}

	pub fn options(&self) -> QueueOptions {
		self.lock().options.clone()
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	pub fn len(&self) -> usize {
		self.lock().queue.len()
	}

	pub fn current_index(&self) -> usize {
		self.lock().current_index
	}

	pub fn is_completed(&self) -> bool {
		self.lock().completed
	}

	pub fn record(&self, index: usize) -> Option<StepRecord> {
		self.lock().queue.record(index).cloned()
	}

	pub fn snapshot(&self) -> FlowSnapshot {
		let state = self.lock();
		FlowSnapshot {
			current_index: state.current_index,
			records: state.queue.records().to_vec(),
			completed: state.completed,
			in_flight: state.in_flight,
		}
	}

	/// Error of the current step, the only one shown in the banner.
	pub fn current_error(&self) -> Option<StructuredError> {
		let state = self.lock();
		state
			.queue
			.record(state.current_index)
			.and_then(|record| record.error.clone())
	}

	pub fn visible_states(&self) -> Vec<VisibleState> {
		let state = self.lock();
		state
			.queue
			.records()
			.iter()
			.enumerate()
			.map(|(index, record)| visible_state(record, index, state.current_index))
			.collect()
	}

	pub fn step_views(&self) -> Vec<StepView> {
		let state = self.lock();
		state
			.queue
			.specs()
			.iter()
			.zip(state.queue.records())
			.enumerate()
			.map(|(index, (spec, record))| {
				step_view(spec, record, index, state.current_index, &state.options)
			})
			.collect()
	}

	pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
		self.event_bus.subscribe()
	}

	/// Returns a reference to the event bus.
	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}
}
