//! Core orchestration for multi-step transaction flows.
//!
//! A flow is an ordered list of user-authorized operations, for example
//! "approve token" followed by "execute swap". The [`Orchestrator`] drives
//! them strictly one at a time: it invokes the current step's executor,
//! waits for on-chain confirmation (plus any network-specific extra depth),
//! advances the cursor, and publishes a single completion event once the
//! final step is confirmed.

pub mod action;
pub mod builder;
pub mod classifier;
pub mod engine;
pub mod monitoring;
pub mod queue;
pub mod state;

pub use action::{ActionSpec, ChainIdSource, StepExecutor};
pub use builder::{create_polling_waiter, BuilderError, OrchestratorBuilder};
pub use classifier::{DefaultErrorClassifier, ErrorClassifier, ErrorReporter, TracingReporter};
pub use engine::event_bus::EventBus;
pub use engine::{FlowSnapshot, Orchestrator, OrchestratorError, QueueOptions, StepOutcome};
pub use monitoring::ConfirmationMonitor;
pub use queue::{ActionQueue, QueueError};
pub use state::{step_view, visible_state, StepView};
