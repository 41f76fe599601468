//! Common types module for the multi-step transaction flow.
//!
//! This module defines the data types shared by every crate in the workspace:
//! transaction handles and receipts, per-step lifecycle records, classified
//! errors, events and network confirmation policies.

/// Transaction handle and receipt types.
pub mod delivery;
/// Event types emitted while a flow progresses.
pub mod events;
/// Failures raised by step executors.
pub mod execution;
/// Network confirmation-depth configuration types.
pub mod networks;
/// Per-step lifecycle record and visible state.
pub mod step;
/// Utility functions for formatting and time.
pub mod utils;

// Re-export all types for convenient access
pub use delivery::*;
pub use events::*;
pub use execution::*;
pub use networks::{ConfirmationPolicy, NetworkConfig, NetworksConfig};
pub use step::*;
pub use utils::{current_timestamp, truncate_id};
