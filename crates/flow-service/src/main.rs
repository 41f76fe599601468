//! Main entry point for the flow simulator.
//!
//! Loads a flow configuration, wires the orchestrator to an in-memory chain
//! that mines blocks at a fixed interval, and drives an approve-then-swap
//! flow to completion while logging every event it publishes.

use clap::Parser;
use flow_config::Config;
use std::path::PathBuf;
use std::time::Duration;

mod simulation;

use simulation::SimulationOptions;

/// Command-line arguments for the flow simulator.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	/// Chain the simulated wallet is connected to
	#[arg(long, default_value_t = 1)]
	chain_id: u64,

	/// Simulated block time in milliseconds
	#[arg(long, default_value_t = 1000)]
	block_time_ms: u64,

	/// Number of times the wallet declines the approval prompt
	#[arg(long, default_value_t = 0)]
	rejections: usize,

	/// Submissions allowed per step before giving up
	#[arg(long, default_value_t = 3)]
	max_attempts: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started flow simulator");

	let path = args.config.to_str().ok_or("Config path is not valid UTF-8")?;
	let config = Config::from_file(path).await?;
	tracing::info!("Loaded configuration [{}]", config.flow.id);

	let options = SimulationOptions {
		chain_id: args.chain_id,
		block_time: Duration::from_millis(args.block_time_ms),
		rejections: args.rejections,
		max_attempts: args.max_attempts,
	};
	let completion = simulation::run(config, options).await?;

	tracing::info!(
		block = ?completion.receipt.as_ref().map(|r| r.block_number),
		confirmed_at = ?completion.confirmed_at,
		"Stopped flow simulator"
	);
	Ok(())
}
