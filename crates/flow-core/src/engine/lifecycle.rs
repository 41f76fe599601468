//! Lifecycle management for the orchestrator.
//!
//! Subscribers attach to the event bus first; `initialize` then publishes the
//! starting cursor so they see it like any later change.

use super::{Orchestrator, OrchestratorError};
use flow_types::FlowEvent;

impl Orchestrator {
	/// Publishes the initial cursor position.
	pub async fn initialize(&self) -> Result<(), OrchestratorError> {
		let index = self.current_index();
		tracing::info!(flow = %self.id, steps = self.len(), cursor = index, "Initializing flow");
		self.event_bus
			.publish(FlowEvent::CursorChanged { index })
			.ok();
		Ok(())
	}

	/// Performs cleanup operations
	pub async fn shutdown(&self) -> Result<(), OrchestratorError> {
		let snapshot = self.snapshot();
		if !snapshot.completed && snapshot.records.iter().any(|r| r.init() || r.confirming()) {
			tracing::warn!(
				flow = %self.id,
				cursor = snapshot.current_index,
				"Shutting down with a step in flight"
			);
		} else {
			tracing::info!(flow = %self.id, completed = snapshot.completed, "Shutting down flow");
		}
		Ok(())
	}
}
