//! Approve-then-swap flow against a simulated chain.

use flow_config::Config;
use flow_core::{
	create_polling_waiter, ActionSpec, BuilderError, Orchestrator, OrchestratorBuilder,
	OrchestratorError, StepOutcome,
};
use flow_delivery::implementations::memory::SimulatedChain;
use flow_types::{
	current_timestamp, truncate_id, Completion, ExecutionError, FlowEvent, TransactionHash,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;

#[derive(Debug, Error)]
pub enum SimulationError {
	#[error("Build error: {0}")]
	Build(#[from] BuilderError),
	#[error("Flow error: {0}")]
	Flow(#[from] OrchestratorError),
	#[error("Step {index} still failing after {attempts} attempts")]
	Exhausted { index: usize, attempts: usize },
}

#[derive(Debug, Clone)]
pub struct SimulationOptions {
	pub chain_id: u64,
	pub block_time: Duration,
	/// Approval prompts the wallet declines before accepting one.
	pub rejections: usize,
	pub max_attempts: usize,
}

/// Runs the flow to completion.
pub async fn run(
	config: Config,
	options: SimulationOptions,
) -> Result<Completion, SimulationError> {
	let block_time = options.block_time.max(Duration::from_millis(1));
	let chain = Arc::new(SimulatedChain::new(
		options.chain_id,
		current_timestamp(),
		block_time.as_secs().max(1),
	));

	let chain_id = options.chain_id;
	let orchestrator = OrchestratorBuilder::new(config.clone())
		.with_actions(vec![
			approve_step(chain.clone(), options.rejections),
			swap_step(chain.clone()),
		])
		.with_waiter(create_polling_waiter(&config, chain.clone()))
		.with_chain_source(Arc::new(move || chain_id))
		.build()?;

	let mut events = orchestrator.subscribe();
	let logger = tokio::spawn(async move {
		loop {
			match events.recv().await {
				Ok(event) => log_event(&event),
				Err(RecvError::Lagged(skipped)) => {
					tracing::warn!(skipped, "Event logger lagged");
				}
				Err(RecvError::Closed) => break,
			}
		}
	});

	let miner = {
		let chain = chain.clone();
		tokio::spawn(async move {
			let mut ticker = tokio::time::interval(block_time);
			loop {
				ticker.tick().await;
				chain.mine(1).await;
			}
		})
	};

	orchestrator.initialize().await?;
	let result = drive(&orchestrator, options.max_attempts.max(1)).await;
	orchestrator.shutdown().await?;

	miner.abort();
	// Dropping the last handle closes the bus, letting the logger drain.
	drop(orchestrator);
	if let Err(e) = logger.await {
		tracing::warn!(error = %e, "Event logger stopped abnormally");
	}

	result
}

/// Submits the current step until the flow completes, retrying failed steps.
async fn drive(
	orchestrator: &Orchestrator,
	max_attempts: usize,
) -> Result<Completion, SimulationError> {
	let mut attempts = 0;
	loop {
		let index = orchestrator.current_index();
		attempts += 1;

		match orchestrator.submit(index).await? {
			StepOutcome::Advanced { .. } => attempts = 0,
			StepOutcome::Completed(completion) => return Ok(completion),
			StepOutcome::Failed { kind, error } => {
				if attempts >= max_attempts {
					return Err(SimulationError::Exhausted { index, attempts });
				}
				tracing::warn!(
					step = index,
					kind = ?kind,
					error = error.as_ref().map(|e| e.title.as_str()).unwrap_or("none"),
					"Retrying step"
				);
			}
		}
	}
}

fn approve_step(chain: Arc<SimulatedChain>, rejections: usize) -> ActionSpec {
	let prompts = Arc::new(AtomicUsize::new(0));
	ActionSpec::transaction("Approve USDC", move || {
		let chain = chain.clone();
		let prompt = prompts.fetch_add(1, Ordering::SeqCst);
		async move {
			if prompt < rejections {
				return Err(ExecutionError::UserRejected(
					"User rejected the request.".into(),
				));
			}
			Ok(Some(chain.broadcast().await))
		}
	})
	.with_loading_label("Approve in wallet")
	.with_confirming_label("Approving USDC")
	.with_tooltip("Allow the router to spend your USDC")
}

fn swap_step(chain: Arc<SimulatedChain>) -> ActionSpec {
	ActionSpec::transaction("Swap", move || {
		let chain = chain.clone();
		async move { Ok::<_, ExecutionError>(Some(chain.broadcast().await)) }
	})
	.with_loading_label("Confirm swap in wallet")
	.with_confirming_label("Swapping")
}

fn short_hash(hash: &TransactionHash) -> String {
	truncate_id(&hash.to_string())
}

fn log_event(event: &FlowEvent) {
	match event {
		FlowEvent::CursorChanged { index } => tracing::info!(step = index, "Cursor moved"),
		FlowEvent::StepSubmitted { index } => tracing::info!(step = index, "Waiting on wallet"),
		FlowEvent::TransactionPending {
			index,
			tx_hash,
			chain_id,
		} => tracing::info!(
			step = index,
			tx_hash = %short_hash(tx_hash),
			chain_id,
			"Transaction pending"
		),
		FlowEvent::StepConfirmed {
			index,
			confirmed_at,
		} => tracing::info!(step = index, confirmed_at = ?confirmed_at, "Step confirmed"),
		FlowEvent::StepFailed { index, kind, error } => match error {
			Some(error) => tracing::warn!(step = index, kind = ?kind, error = %error, "Step failed"),
			None => tracing::warn!(step = index, kind = ?kind, "Step failed"),
		},
		FlowEvent::Completed(completion) => tracing::info!(
			tx_hash = ?completion
				.receipt
				.as_ref()
				.map(|r| r.hash.to_string()),
			confirmed_at = ?completion.confirmed_at,
			"Flow completed"
		),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tempfile::NamedTempFile;

	const CONFIG: &str = r#"
[flow]
id = "approve-and-swap"

[confirmation]
poll_interval_ms = 200
timeout_minutes = 5

[networks.10]
name = "optimism"
extra_confirmations = 2
"#;

	fn options(rejections: usize, max_attempts: usize) -> SimulationOptions {
		SimulationOptions {
			chain_id: 10,
			block_time: Duration::from_secs(1),
			rejections,
			max_attempts,
		}
	}

	#[tokio::test(start_paused = true)]
	async fn test_runs_flow_from_config_file() {
		let mut file = NamedTempFile::new().unwrap();
		file.write_all(CONFIG.as_bytes()).unwrap();
		let config = Config::from_file(file.path().to_str().unwrap())
			.await
			.unwrap();

		let completion = run(config, options(0, 3)).await.unwrap();
		assert!(completion.receipt.is_some_and(|r| r.success));
		assert!(completion.confirmed_at.is_some());
	}

	#[tokio::test(start_paused = true)]
	async fn test_retries_after_rejection() {
		let config: Config = CONFIG.parse().unwrap();
		let completion = run(config, options(2, 3)).await.unwrap();
		assert!(completion.receipt.is_some());
	}

	#[tokio::test(start_paused = true)]
	async fn test_gives_up_after_max_attempts() {
		let config: Config = CONFIG.parse().unwrap();
		let result = run(config, options(5, 2)).await;
		assert!(matches!(
			result,
			Err(SimulationError::Exhausted {
				index: 0,
				attempts: 2
			})
		));
	}

	#[test]
	fn test_short_hash_has_single_prefix() {
		let hash = TransactionHash(vec![0xab; 32]);
		assert_eq!(short_hash(&hash), "0xababab..");
	}

	#[tokio::test]
	async fn test_disabled_flow_is_rejected() {
		let config: Config = format!("{}\n", CONFIG)
			.replace("id = \"approve-and-swap\"", "id = \"approve-and-swap\"\ndisabled = true")
			.parse()
			.unwrap();
		let result = run(config, options(0, 3)).await;
		assert!(matches!(
			result,
			Err(SimulationError::Flow(OrchestratorError::Disabled))
		));
	}
}
