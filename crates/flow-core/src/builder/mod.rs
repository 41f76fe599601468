//! Builder pattern for constructing orchestrators.
//!
//! Composes an [`Orchestrator`] from a loaded [`Config`], the step list, and
//! pluggable confirmation, chain-id, classification and reporting
//! components. Classification and reporting fall back to the defaults when
//! not supplied; the waiter, the chain-id source and at least one step are
//! required.

use crate::action::{ActionSpec, ChainIdSource};
use crate::classifier::{DefaultErrorClassifier, ErrorClassifier, ErrorReporter, TracingReporter};
use crate::engine::{event_bus::EventBus, Orchestrator, QueueOptions};
use crate::monitoring::ConfirmationMonitor;
use flow_config::Config;
use flow_delivery::implementations::polling::PollingWaiter;
use flow_delivery::{ChainClient, ConfirmationWaiter};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during orchestrator construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Builder for an [`Orchestrator`] with pluggable components.
pub struct OrchestratorBuilder {
	config: Config,
	actions: Vec<ActionSpec>,
	waiter: Option<Arc<dyn ConfirmationWaiter>>,
	chain: Option<Arc<dyn ChainIdSource>>,
	classifier: Option<Arc<dyn ErrorClassifier>>,
	reporter: Option<Arc<dyn ErrorReporter>>,
	event_capacity: usize,
}

impl OrchestratorBuilder {
	/// Creates a new builder with the given configuration.
	pub fn new(config: Config) -> Self {
		Self {
			config,
			actions: Vec::new(),
			waiter: None,
			chain: None,
			classifier: None,
			reporter: None,
			event_capacity: 1000,
		}
	}

	pub fn with_actions(mut self, actions: Vec<ActionSpec>) -> Self {
		self.actions = actions;
		self
	}

	pub fn with_waiter(mut self, waiter: Arc<dyn ConfirmationWaiter>) -> Self {
		self.waiter = Some(waiter);
		self
	}

	/// Source of the wallet's active chain, read when extra depth is resolved.
	pub fn with_chain_source(mut self, chain: Arc<dyn ChainIdSource>) -> Self {
		self.chain = Some(chain);
		self
	}

	pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
		self.classifier = Some(classifier);
		self
	}

	pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
		self.reporter = Some(reporter);
		self
	}

	pub fn with_event_capacity(mut self, capacity: usize) -> Self {
		self.event_capacity = capacity;
		self
	}

	/// Builds the orchestrator.
	pub fn build(self) -> Result<Orchestrator, BuilderError> {
		if self.actions.is_empty() {
			return Err(BuilderError::Config("Flow has no steps".into()));
		}
		if self.event_capacity == 0 {
			return Err(BuilderError::Config(
				"Event capacity must be greater than 0".into(),
			));
		}

		let waiter = self
			.waiter
			.ok_or_else(|| BuilderError::MissingComponent("confirmation waiter".into()))?;
		let chain = self
			.chain
			.ok_or_else(|| BuilderError::MissingComponent("chain id source".into()))?;
		let classifier = self
			.classifier
			.unwrap_or_else(|| Arc::new(DefaultErrorClassifier));
		let reporter = self.reporter.unwrap_or_else(|| Arc::new(TracingReporter));

		let policy = self.config.confirmation_policy();
		for (chain_id, network) in &self.config.networks {
			if network.extra_confirmations > 0 {
				tracing::info!(
					chain_id,
					network = network.name.as_deref().unwrap_or("unnamed"),
					extra = network.extra_confirmations,
					"Extra confirmations required"
				);
			}
		}

		let options = QueueOptions {
			disabled: self.config.flow.disabled,
			force_loading: self.config.flow.force_loading,
			force_loading_label: self.config.flow.force_loading_label.clone(),
		};

		let orchestrator = Orchestrator::new(
			self.config.flow.id.clone(),
			self.actions,
			ConfirmationMonitor::new(waiter, chain, policy),
			classifier,
			reporter,
			options,
			EventBus::new(self.event_capacity),
		)
		.map_err(|e| BuilderError::Config(e.to_string()))?;

		tracing::info!(
			component = "orchestrator",
			flow = %self.config.flow.id,
			steps = orchestrator.len(),
			"Loaded"
		);
		Ok(orchestrator)
	}
}

/// Creates a polling waiter from the `[confirmation]` section.
pub fn create_polling_waiter<C>(config: &Config, client: Arc<C>) -> Arc<dyn ConfirmationWaiter>
where
	C: ChainClient + 'static,
{
	Arc::new(PollingWaiter::new(
		client,
		config.poll_interval(),
		config.confirmation_timeout(),
		config.confirmation.base_confirmations,
	))
}
