//! Pipeline error types.

use crate::utils::logging::error::{ErrorContext, TraceableError};
use std::collections::HashMap;
use thiserror::Error as ThisError;

/// Errors raised while wiring or running a pipeline
#[derive(ThisError, Debug)]
pub enum PipelineError {
	/// A subscriber cannot be registered
	#[error("Registration error: {0}")]
	RegistrationError(ErrorContext),

	/// A subscriber failed while handling data
	#[error("Subscriber error: {0}")]
	SubscriberError(ErrorContext),
}

impl PipelineError {
	pub fn registration_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::RegistrationError(ErrorContext::new_with_log(msg, source, metadata))
	}

	pub fn subscriber_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::SubscriberError(ErrorContext::new_with_log(msg, source, metadata))
	}
}

impl TraceableError for PipelineError {
	fn trace_id(&self) -> String {
		match self {
			Self::RegistrationError(ctx) | Self::SubscriberError(ctx) => ctx.trace_id.clone(),
		}
	}
}
