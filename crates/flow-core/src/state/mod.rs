//! Step state derivation and transition rules.
//!
//! This module maps a step's lifecycle record to what the user sees, and
//! holds the table of phase changes the orchestrator is allowed to make.

pub mod step;

pub use step::{is_valid_transition, step_view, visible_state, StepView};
