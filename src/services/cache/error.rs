//! Cache error types.

use crate::utils::logging::error::{ErrorContext, TraceableError};
use std::collections::HashMap;
use thiserror::Error as ThisError;

/// Errors raised by a cached data source
#[derive(ThisError, Debug)]
pub enum CacheError {
	/// Every load attempt failed
	#[error("Load failed: {0}")]
	LoadFailed(ErrorContext),

	/// The last good value is older than the allowed stale age
	#[error("Value expired: {0}")]
	Expired(ErrorContext),
}

impl CacheError {
	pub fn load_failed(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::LoadFailed(ErrorContext::new_with_log(msg, source, metadata))
	}

	pub fn expired(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::Expired(ErrorContext::new_with_log(msg, source, metadata))
	}
}

impl TraceableError for CacheError {
	fn trace_id(&self) -> String {
		match self {
			Self::LoadFailed(ctx) | Self::Expired(ctx) => ctx.trace_id.clone(),
		}
	}
}
