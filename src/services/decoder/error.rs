//! Decoding error types.
//!
//! Decode failures are expected on a live chain (unknown payloads, malformed attributes), so
//! they are built without logging; the block decoder logs each one once when it skips the
//! offending item.

use crate::utils::logging::error::{ErrorContext, TraceableError};
use std::collections::HashMap;
use thiserror::Error as ThisError;

/// Errors raised while decoding chain data
#[derive(ThisError, Debug)]
pub enum DecodeError {
	/// Amount string could not be split into a number and a denomination
	#[error("Invalid amount: {0}")]
	InvalidAmount(ErrorContext),

	/// Address bytes could not be rendered
	#[error("Invalid address: {0}")]
	InvalidAddress(ErrorContext),

	/// Event attribute could not be decoded
	#[error("Invalid event: {0}")]
	InvalidEvent(ErrorContext),

	/// Transaction message did not match its registered shape
	#[error("Invalid message: {0}")]
	InvalidMessage(ErrorContext),

	/// Transaction envelope could not be decoded
	#[error("Invalid transaction: {0}")]
	InvalidTransaction(ErrorContext),
}

type Source = Option<Box<dyn std::error::Error + Send + Sync + 'static>>;

impl DecodeError {
	pub fn invalid_amount(
		msg: impl Into<String>,
		source: Source,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::InvalidAmount(ErrorContext::new(msg, source, metadata))
	}

	pub fn invalid_address(
		msg: impl Into<String>,
		source: Source,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::InvalidAddress(ErrorContext::new(msg, source, metadata))
	}

	pub fn invalid_event(
		msg: impl Into<String>,
		source: Source,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::InvalidEvent(ErrorContext::new(msg, source, metadata))
	}

	pub fn invalid_message(
		msg: impl Into<String>,
		source: Source,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::InvalidMessage(ErrorContext::new(msg, source, metadata))
	}

	pub fn invalid_transaction(
		msg: impl Into<String>,
		source: Source,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::InvalidTransaction(ErrorContext::new(msg, source, metadata))
	}

	fn context(&self) -> &ErrorContext {
		match self {
			Self::InvalidAmount(ctx)
			| Self::InvalidAddress(ctx)
			| Self::InvalidEvent(ctx)
			| Self::InvalidMessage(ctx)
			| Self::InvalidTransaction(ctx) => ctx,
		}
	}
}

impl TraceableError for DecodeError {
	fn trace_id(&self) -> String {
		self.context().trace_id.clone()
	}
}
