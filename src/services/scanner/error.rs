//! Block scanner error types.

use crate::utils::logging::error::{ErrorContext, TraceableError};
use std::collections::HashMap;
use thiserror::Error as ThisError;
use uuid::Uuid;

/// Errors raised by the scanner service outside the per-block loop
#[derive(ThisError, Debug)]
pub enum ScannerServiceError {
	/// The starting height could not be determined
	#[error("Initialization error: {0}")]
	InitializationError(ErrorContext),

	/// The persisted scanner state could not be read or written
	#[error("State error: {0}")]
	StateError(ErrorContext),

	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

impl ScannerServiceError {
	pub fn initialization_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::InitializationError(ErrorContext::new_with_log(msg, source, metadata))
	}

	pub fn state_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::StateError(ErrorContext::new_with_log(msg, source, metadata))
	}
}

impl TraceableError for ScannerServiceError {
	fn trace_id(&self) -> String {
		match self {
			Self::InitializationError(ctx) | Self::StateError(ctx) => ctx.trace_id.clone(),
			Self::Other(_) => Uuid::new_v4().to_string(),
		}
	}
}
