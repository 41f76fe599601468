//! Classification of executor failures into user-presentable errors.
//!
//! Wallets and providers fail in many library-specific ways. The classifier
//! turns each of them into a short title and description, or suppresses it
//! entirely when there is nothing useful to show.

use flow_types::{ExecutionError, FailureKind, StructuredError};

/// JSON-RPC code a wallet returns when the user declines a request (EIP-1193).
const RPC_USER_REJECTED: i64 = 4001;
/// The requested account or method has not been authorized (EIP-1193).
const RPC_UNAUTHORIZED: i64 = 4100;
/// The wallet does not know the requested chain.
const RPC_UNRECOGNIZED_CHAIN: i64 = 4902;
/// Generic server error, also used by nodes for balance failures.
const RPC_SERVER_ERROR: i64 = -32000;

/// Maps a raw executor failure to a structured error.
///
/// `None` suppresses the error banner: the step still returns to idle, but
/// nothing is shown and nothing is reported.
pub trait ErrorClassifier: Send + Sync {
	fn classify(&self, error: &ExecutionError) -> Option<StructuredError>;
}

/// Receives classified failures for telemetry.
///
/// Only called when classification produced a structured error.
pub trait ErrorReporter: Send + Sync {
	fn report(&self, step: usize, raw: &ExecutionError, classified: &StructuredError);
}

/// Classifier covering common EIP-1193 wallet and node failures.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultErrorClassifier;

impl ErrorClassifier for DefaultErrorClassifier {
	fn classify(&self, error: &ExecutionError) -> Option<StructuredError> {
		match error {
			ExecutionError::UserRejected(_)
			| ExecutionError::Rpc {
				code: RPC_USER_REJECTED,
				..
			} => Some(rejected()),
			ExecutionError::Other(message) if is_rejection_message(message) => Some(rejected()),
			ExecutionError::InsufficientFunds(_) => Some(insufficient_funds()),
			ExecutionError::Rpc { code, message }
				if *code == RPC_SERVER_ERROR
					&& message.to_lowercase().contains("insufficient funds") =>
			{
				Some(insufficient_funds())
			}
			ExecutionError::Rpc {
				code: RPC_UNAUTHORIZED,
				..
			} => Some(StructuredError::new(
				"Account not authorized",
				"Connect this account in your wallet and try again.",
			)),
			ExecutionError::Rpc {
				code: RPC_UNRECOGNIZED_CHAIN,
				..
			} => Some(StructuredError::new(
				"Unsupported network",
				"Add this network to your wallet and try again.",
			)),
			ExecutionError::Rpc { code, message } => Some(StructuredError::new(
				"RPC error",
				format!("The network node returned an error ({}): {}", code, message),
			)),
			ExecutionError::Network(_) => Some(StructuredError::new(
				"Network unavailable",
				"Could not reach the network provider. Check your connection and try again.",
			)),
			ExecutionError::Reverted(reason) if reason.trim().is_empty() => Some(
				StructuredError::new("Transaction would fail", "The transaction would revert."),
			),
			ExecutionError::Reverted(reason) => Some(StructuredError::new(
				"Transaction would fail",
				reason.clone(),
			)),
			// A sped-up replacement still executes; nothing to show.
			ExecutionError::Replaced { cancelled: false } => None,
			ExecutionError::Replaced { cancelled: true } => Some(StructuredError::new(
				"Transaction cancelled",
				"The transaction was replaced and cancelled in your wallet.",
			)),
			ExecutionError::Other(message) if message.trim().is_empty() => None,
			ExecutionError::Other(message) => {
				Some(StructuredError::new("Something went wrong", message.clone()))
			}
		}
	}
}

fn rejected() -> StructuredError {
	StructuredError::new(
		"Transaction rejected",
		"You rejected the request in your wallet.",
	)
}

fn insufficient_funds() -> StructuredError {
	StructuredError::new(
		"Insufficient funds",
		"Your balance does not cover the amount plus network fees.",
	)
}

fn is_rejection_message(message: &str) -> bool {
	let message = message.to_lowercase();
	message.contains("user rejected") || message.contains("user denied")
}

/// True when the failure means the user declined the wallet prompt.
pub fn is_user_rejection(error: &ExecutionError) -> bool {
	match error {
		ExecutionError::UserRejected(_) => true,
		ExecutionError::Rpc { code, .. } => *code == RPC_USER_REJECTED,
		ExecutionError::Other(message) => is_rejection_message(message),
		_ => false,
	}
}

/// Taxonomy bucket for an executor failure.
pub fn failure_kind(error: &ExecutionError) -> FailureKind {
	if is_user_rejection(error) {
		FailureKind::UserRejected
	} else {
		FailureKind::ExecutionFailed
	}
}

/// Reporter that forwards classified failures to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
	fn report(&self, step: usize, raw: &ExecutionError, classified: &StructuredError) {
		tracing::error!(
			step,
			error = %raw,
			title = %classified.title,
			"Step execution failed"
		);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_user_rejection_variants() {
		let classifier = DefaultErrorClassifier;
		for error in [
			ExecutionError::UserRejected("declined".into()),
			ExecutionError::Rpc {
				code: 4001,
				message: "User rejected the request.".into(),
			},
			ExecutionError::Other("MetaMask Tx Signature: User denied transaction signature.".into()),
		] {
			let classified = classifier.classify(&error).unwrap();
			assert_eq!(classified.title, "Transaction rejected");
			assert_eq!(failure_kind(&error), FailureKind::UserRejected);
		}
	}

	#[test]
	fn test_insufficient_funds_from_node() {
		let error = ExecutionError::Rpc {
			code: -32000,
			message: "Insufficient funds for gas * price + value".into(),
		};
		let classified = DefaultErrorClassifier.classify(&error).unwrap();
		assert_eq!(classified.title, "Insufficient funds");
		assert_eq!(failure_kind(&error), FailureKind::ExecutionFailed);
	}

	#[test]
	fn test_rpc_codes() {
		let classifier = DefaultErrorClassifier;
		let unauthorized = classifier
			.classify(&ExecutionError::Rpc {
				code: 4100,
				message: String::new(),
			})
			.unwrap();
		assert_eq!(unauthorized.title, "Account not authorized");

		let generic = classifier
			.classify(&ExecutionError::Rpc {
				code: -32603,
				message: "internal error".into(),
			})
			.unwrap();
		assert_eq!(generic.title, "RPC error");
		assert!(generic.description.contains("-32603"));
	}

	#[test]
	fn test_suppressed_failures() {
		let classifier = DefaultErrorClassifier;
		assert_eq!(
			classifier.classify(&ExecutionError::Replaced { cancelled: false }),
			None
		);
		assert_eq!(classifier.classify(&ExecutionError::Other("  ".into())), None);
		assert!(classifier
			.classify(&ExecutionError::Replaced { cancelled: true })
			.is_some());
	}

	#[test]
	fn test_revert_reason_is_kept() {
		let classified = DefaultErrorClassifier
			.classify(&ExecutionError::Reverted("STF".into()))
			.unwrap();
		assert_eq!(classified.description, "STF");
	}
}
