//! Confirmation monitoring for broadcast step transactions.
//!
//! This module wraps the confirmation waiter with the per-network depth
//! policy, so the orchestrator only sees "included", "final" or "failed".

pub mod confirmation;

pub use confirmation::ConfirmationMonitor;
