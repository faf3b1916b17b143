//! Churn detection error types.

use crate::utils::logging::error::{ErrorContext, TraceableError};
use std::collections::HashMap;
use thiserror::Error as ThisError;
use uuid::Uuid;

/// Errors raised while scheduling or running churn detection
#[derive(ThisError, Debug)]
pub enum ChurnError {
	/// The cron job could not be created, added or started
	#[error("Scheduler error: {0}")]
	SchedulerError(ErrorContext),

	/// The previous snapshot could not be read or written
	#[error("State error: {0}")]
	StateError(ErrorContext),

	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

impl ChurnError {
	pub fn scheduler_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::SchedulerError(ErrorContext::new_with_log(msg, source, metadata))
	}

	pub fn state_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::StateError(ErrorContext::new_with_log(msg, source, metadata))
	}
}

impl TraceableError for ChurnError {
	fn trace_id(&self) -> String {
		match self {
			Self::SchedulerError(ctx) | Self::StateError(ctx) => ctx.trace_id.clone(),
			Self::Other(_) => Uuid::new_v4().to_string(),
		}
	}
}
