//! Step specifications and the collaborators they call out to.
//!
//! An [`ActionSpec`] is immutable and supplied by the caller. Its executor is
//! the only piece of code that talks to the wallet: it prompts for a
//! signature and, for on-chain steps, broadcasts the signed transaction.

use async_trait::async_trait;
use flow_types::{ExecutionError, TransactionHash};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Performs the user-authorized operation behind one step.
///
/// Returns the broadcast transaction's hash, or `None` for sign-only steps.
#[async_trait]
pub trait StepExecutor: Send + Sync {
	async fn execute(&self) -> Result<Option<TransactionHash>, ExecutionError>;
}

#[async_trait]
impl<F, Fut> StepExecutor for F
where
	F: Fn() -> Fut + Send + Sync,
	Fut: Future<Output = Result<Option<TransactionHash>, ExecutionError>> + Send,
{
	async fn execute(&self) -> Result<Option<TransactionHash>, ExecutionError> {
		(self)().await
	}
}

/// Reports the chain the wallet is currently connected to.
///
/// Consulted only to pick the extra confirmation depth for that network.
pub trait ChainIdSource: Send + Sync {
	fn current_chain_id(&self) -> u64;
}

impl<F> ChainIdSource for F
where
	F: Fn() -> u64 + Send + Sync,
{
	fn current_chain_id(&self) -> u64 {
		(self)()
	}
}

/// One authorized operation the user must perform.
#[derive(Clone)]
pub struct ActionSpec {
	pub label: String,
	/// Shown while the wallet prompt is open.
	pub loading_label: String,
	/// Shown while waiting for on-chain confirmation.
	pub confirming_label: String,
	pub step_tooltip: String,
	/// Pure signature: no broadcast, no confirmation wait.
	pub is_sign_action: bool,
	pub executor: Arc<dyn StepExecutor>,
}

impl ActionSpec {
	/// A step that broadcasts a transaction and waits for its confirmation.
	pub fn transaction(label: impl Into<String>, executor: impl StepExecutor + 'static) -> Self {
		Self::new(label.into(), false, Arc::new(executor))
	}

	/// A step that only collects a signature.
	pub fn signature(label: impl Into<String>, executor: impl StepExecutor + 'static) -> Self {
		Self::new(label.into(), true, Arc::new(executor))
	}

	fn new(label: String, is_sign_action: bool, executor: Arc<dyn StepExecutor>) -> Self {
		Self {
			loading_label: label.clone(),
			confirming_label: label.clone(),
			label,
			step_tooltip: String::new(),
			is_sign_action,
			executor,
		}
	}

	pub fn with_loading_label(mut self, label: impl Into<String>) -> Self {
		self.loading_label = label.into();
		self
	}

	pub fn with_confirming_label(mut self, label: impl Into<String>) -> Self {
		self.confirming_label = label.into();
		self
	}

	pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
		self.step_tooltip = tooltip.into();
		self
	}
}

impl fmt::Debug for ActionSpec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ActionSpec")
			.field("label", &self.label)
			.field("loading_label", &self.loading_label)
			.field("confirming_label", &self.confirming_label)
			.field("step_tooltip", &self.step_tooltip)
			.field("is_sign_action", &self.is_sign_action)
			.finish_non_exhaustive()
	}
}
