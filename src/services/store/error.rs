//! Key-value store error types.

use crate::utils::logging::error::{ErrorContext, TraceableError};
use std::collections::HashMap;
use thiserror::Error as ThisError;
use uuid::Uuid;

/// Errors raised by a [`KeyValueStore`](super::KeyValueStore) implementation
#[derive(ThisError, Debug)]
pub enum StoreError {
	/// The store could not be reached
	#[error("Connection error: {0}")]
	ConnectionError(ErrorContext),

	/// The store rejected or failed a command
	#[error("Command error: {0}")]
	CommandError(ErrorContext),

	/// A stored value could not be encoded or decoded
	#[error("Serialization error: {0}")]
	SerializationError(ErrorContext),

	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

impl StoreError {
	pub fn connection_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::ConnectionError(ErrorContext::new_with_log(msg, source, metadata))
	}

	pub fn command_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::CommandError(ErrorContext::new_with_log(msg, source, metadata))
	}

	pub fn serialization_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::SerializationError(ErrorContext::new_with_log(msg, source, metadata))
	}
}

impl TraceableError for StoreError {
	fn trace_id(&self) -> String {
		match self {
			Self::ConnectionError(ctx) | Self::CommandError(ctx) | Self::SerializationError(ctx) => {
				ctx.trace_id.clone()
			}
			Self::Other(_) => Uuid::new_v4().to_string(),
		}
	}
}
